use crate::handlers::is_htmx;
use crate::models::user::SESSION_USER_ID;
use crate::utils::url::encode_component;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

/// Gate for `/dashboard` routes: anonymous visitors are sent to `/login`.
///
/// Page loads carry the requested path as `callbackUrl` so login can return
/// there.
pub async fn auth_middleware(session: Session, request: Request<Body>, next: Next) -> Response {
    let user_id: Option<String> = session.get(SESSION_USER_ID).await.unwrap_or(None);

    if user_id.is_some() {
        return next.run(request).await;
    }

    let login = if request.method() == Method::GET {
        let callback = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/dashboard");
        format!("/login?callbackUrl={}", encode_component(callback))
    } else {
        "/login".to_string()
    };

    if is_htmx(request.headers()) {
        return (StatusCode::OK, [("HX-Redirect", login)]).into_response();
    }
    Redirect::to(&login).into_response()
}
