use crate::actions::auth::{authenticate, AuthOutcome};
use crate::actions::Navigation;
use crate::handlers::error::{render_page, DashboardError};
use crate::handlers::{is_htmx, navigate, redirect};
use crate::models::user::{SESSION_EMAIL, SESSION_NAME, SESSION_USER_ID};
use crate::services::{CredentialsForm, SignedInUser};
use crate::AppState;
use askama::Template;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use service_core::error::AppError;
use tower_sessions::Session;

const DEFAULT_LANDING: &str = "/dashboard";

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub error_message: &'a str,
    pub email: &'a str,
    pub redirect_to: &'a str,
}

#[derive(Template)]
#[template(path = "login_error.html")]
struct LoginErrorFragment<'a> {
    error_message: &'a str,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

pub async fn login_page(
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Response, DashboardError> {
    let redirect_to = landing_path(query.callback_url.as_deref());

    let signed_in: Option<String> = session.get(SESSION_USER_ID).await.unwrap_or(None);
    if signed_in.is_some() {
        return Ok(axum::response::Redirect::to(redirect_to).into_response());
    }

    let html = render_page(&LoginTemplate {
        error_message: "",
        email: "",
        redirect_to,
    })
    .map_err(DashboardError::at("/login"))?;
    Ok(Html(html).into_response())
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, DashboardError> {
    let outcome = authenticate(state.credentials.as_ref(), &form)
        .await
        .map_err(DashboardError::at("/login"))?;

    match outcome {
        AuthOutcome::SignedIn(user) => {
            start_session(&session, &user)
                .await
                .map_err(DashboardError::at("/login"))?;
            Ok(redirect(&headers, landing_path(form.redirect_to.as_deref())))
        }
        AuthOutcome::Rejected(message) => {
            if is_htmx(&headers) {
                let html = render_page(&LoginErrorFragment {
                    error_message: message,
                })
                .map_err(DashboardError::at("/login"))?;
                return Ok(Html(html).into_response());
            }

            let html = render_page(&LoginTemplate {
                error_message: message,
                email: form.email.as_deref().unwrap_or_default(),
                redirect_to: landing_path(form.redirect_to.as_deref()),
            })
            .map_err(DashboardError::at("/login"))?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response())
        }
    }
}

pub async fn logout_handler(
    session: Session,
    headers: HeaderMap,
) -> Result<Response, DashboardError> {
    let user_id: Option<String> = session.get(SESSION_USER_ID).await.unwrap_or(None);

    session
        .flush()
        .await
        .map_err(|e| DashboardError::new(session_error(e), "/dashboard"))?;

    if let Some(user_id) = user_id {
        tracing::info!(user_id = %user_id, "User signed out");
    }

    Ok(navigate(&headers, Navigation::Redirect("/")))
}

async fn start_session(session: &Session, user: &SignedInUser) -> Result<(), AppError> {
    // Fresh id on privilege change.
    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(SESSION_USER_ID, &user.user_id)
        .await
        .map_err(session_error)?;
    session
        .insert(SESSION_EMAIL, &user.email)
        .await
        .map_err(session_error)?;
    session
        .insert(SESSION_NAME, &user.name)
        .await
        .map_err(session_error)?;
    Ok(())
}

fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::InternalError(anyhow::anyhow!("Session store error: {}", err))
}

/// Only same-site dashboard paths are accepted as post-login destinations.
///
/// The result ends up in a `Location` or `HX-Redirect` header, so it must be
/// a visible-ASCII relative URI.
fn landing_path(requested: Option<&str>) -> &str {
    match requested {
        Some(path)
            if path.starts_with(DEFAULT_LANDING)
                && !path.contains("//")
                && !path.contains('\\')
                && path.bytes().all(|b| b.is_ascii_graphic())
                && HeaderValue::from_str(path).is_ok()
                && path.parse::<Uri>().is_ok() =>
        {
            path
        }
        _ => DEFAULT_LANDING,
    }
}
