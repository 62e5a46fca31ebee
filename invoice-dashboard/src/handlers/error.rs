//! Error boundary for the HTML routes.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use service_core::error::AppError;

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    retry_path: &'a str,
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate<'a> {
    message: &'a str,
}

/// Failure of a dashboard page. Renders the error page instead of the JSON
/// body `AppError` produces for API routes.
///
/// `retry_path` is where the page's "Try Again" control sends the user.
#[derive(Debug)]
pub struct DashboardError {
    error: AppError,
    retry_path: String,
}

impl DashboardError {
    pub fn new(error: impl Into<AppError>, retry_path: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            retry_path: retry_path.into(),
        }
    }

    /// Adapter for `map_err`: `store.call().await.map_err(DashboardError::at(path))?`.
    pub fn at<E: Into<AppError>>(retry_path: &str) -> impl FnOnce(E) -> DashboardError + '_ {
        move |error| DashboardError::new(error, retry_path)
    }
}

/// Render a page template to a string, reporting failures as internal errors.
pub fn render_page(template: &impl Template) -> Result<String, AppError> {
    template
        .render()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Template rendering failed: {}", e)))
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();

        if let AppError::NotFound(err) = &self.error {
            let message = err.to_string();
            tracing::info!(message = %message, "Dashboard page not found");
            return render(status, NotFoundTemplate { message: &message });
        }

        if status.is_server_error() {
            tracing::error!(error = %self.error, retry_path = %self.retry_path, "Dashboard page failed");
        } else {
            tracing::warn!(error = %self.error, retry_path = %self.retry_path, "Dashboard request rejected");
        }

        render(
            status,
            ErrorTemplate {
                retry_path: &self.retry_path,
            },
        )
    }
}

fn render(status: StatusCode, template: impl Template) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render error page");
            (status, "Something went wrong!").into_response()
        }
    }
}
