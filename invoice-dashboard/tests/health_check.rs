mod common;

use axum::http::StatusCode;
use common::{body_text, spawn_app};

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app();

    let response = app.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn health_check_reports_unavailable_store() {
    let app = spawn_app();
    app.store.set_unavailable(true);

    let response = app.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_are_exposed_as_prometheus_text() {
    let app = spawn_app();
    // Touch a domain counter so it shows up in the registry.
    app.get("/dashboard/invoices", Some(&app.login().await)).await;

    let response = app.get("/metrics", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let body = body_text(response).await;
    assert!(body.contains("dashboard_view_cache_lookups_total"));
}

#[tokio::test]
async fn pages_carry_security_headers() {
    let app = spawn_app();

    let response = app.get("/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("https://unpkg.com"));
    assert!(headers.contains_key("x-request-id"));
}
