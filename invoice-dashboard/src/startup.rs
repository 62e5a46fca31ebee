use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::handlers::{
    app::{health_check, index},
    auth::{login_handler, login_page, logout_handler},
    customers::list_customers,
    dashboard::overview,
    invoices::{
        create_handler, create_page, delete_handler, edit_handler, edit_page, list_invoices,
    },
    metrics::metrics,
};
use crate::middleware::auth::auth_middleware;
use crate::AppState;

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(overview))
        .route("/dashboard/invoices", get(list_invoices))
        .route(
            "/dashboard/invoices/create",
            get(create_page).post(create_handler),
        )
        .route(
            "/dashboard/invoices/:id/edit",
            get(edit_page).post(edit_handler),
        )
        .route("/dashboard/invoices/:id/delete", post(delete_handler))
        .route("/dashboard/customers", get(list_customers))
        .route_layer(from_fn(auth_middleware))
}

pub fn build_router(state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            state.session_inactivity_hours,
        )));

    let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/login", get(login_page).post(login_handler))
        .route("/logout", post(logout_handler))
        .merge(dashboard_routes())
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(session_layer)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .with_state(state)
}
