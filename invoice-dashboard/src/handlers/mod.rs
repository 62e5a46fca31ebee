pub mod app;
pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod error;
pub mod invoices;
pub mod metrics;

use crate::actions::Navigation;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};

/// True when the request was issued by HTMX rather than a plain browser navigation.
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == "true")
}

/// Turn an action's navigation into a response: `HX-Redirect` for HTMX,
/// `303 See Other` otherwise.
pub fn navigate(headers: &HeaderMap, navigation: Navigation) -> Response {
    redirect(headers, navigation.path())
}

pub fn redirect(headers: &HeaderMap, path: &str) -> Response {
    if is_htmx(headers) {
        (StatusCode::OK, [("HX-Redirect", path.to_string())]).into_response()
    } else {
        Redirect::to(path).into_response()
    }
}
