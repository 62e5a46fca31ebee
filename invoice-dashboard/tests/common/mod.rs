//! Common test utilities for invoice-dashboard integration tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use invoice_dashboard::services::{MockStore, PasswordCredentialsProvider, ViewCache};
use invoice_dashboard::startup::build_router;
use invoice_dashboard::utils::password::{hash_password, Password};
use invoice_dashboard::AppState;
use std::sync::{Arc, Once};
use tower::util::ServiceExt;

static INIT: Once = Once::new();

pub const USER_EMAIL: &str = "user@nextmail.com";
pub const USER_PASSWORD: &str = "123456";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,invoice_dashboard=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MockStore>,
    pub view_cache: Arc<ViewCache>,
    /// Id of a customer seeded for every app.
    pub customer_id: String,
}

/// Build the full router over an in-memory store seeded with one customer and
/// one user.
pub fn spawn_app() -> TestApp {
    init_tracing();

    let store = Arc::new(MockStore::new());
    let customer_id = store
        .add_customer("Evil Rabbit", "evil@rabbit.com")
        .expect("Failed to seed customer");
    let password_hash = hash_password(&Password::new(USER_PASSWORD.to_string()))
        .expect("Failed to hash password");
    store
        .add_user("User", USER_EMAIL, &password_hash)
        .expect("Failed to seed user");

    let view_cache = Arc::new(ViewCache::new());
    let credentials = Arc::new(PasswordCredentialsProvider::new(store.clone()));
    let state = AppState::new(store.clone(), credentials, view_cache.clone());

    TestApp {
        router: build_router(state),
        store,
        view_cache,
        customer_id,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(
        &self,
        uri: &str,
        body: &str,
        cookie: Option<&str>,
        htmx: bool,
    ) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        if htmx {
            request = request.header("HX-Request", "true");
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Sign in the seeded user and return the session cookie pair.
    pub async fn login(&self) -> String {
        let body = format!(
            "email={}&password={}",
            USER_EMAIL.replace('@', "%40"),
            USER_PASSWORD
        );
        let response = self.post_form("/login", &body, None, false).await;
        assert_eq!(response.status(), 303, "login should redirect");
        session_cookie(&response).expect("login should set a session cookie")
    }
}

/// `name=value` part of the response's `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}
