pub mod actions;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;
pub mod validation;

use services::{CredentialsProvider, InvoiceStore, ViewCache};
use std::sync::Arc;

/// Shared application state. Built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub invoices: Arc<dyn InvoiceStore>,
    pub credentials: Arc<dyn CredentialsProvider>,
    pub view_cache: Arc<ViewCache>,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub secure_cookies: bool,
    pub session_inactivity_hours: i64,
}

impl AppState {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        credentials: Arc<dyn CredentialsProvider>,
        view_cache: Arc<ViewCache>,
    ) -> Self {
        Self {
            invoices,
            credentials,
            view_cache,
            secure_cookies: false,
            session_inactivity_hours: 24,
        }
    }

    pub fn with_session(mut self, secure_cookies: bool, inactivity_hours: i64) -> Self {
        self.secure_cookies = secure_cookies;
        self.session_inactivity_hours = inactivity_hours;
        self
    }
}
