//! Server-side form actions.
//!
//! Actions take injected services and raw form input, and return either a
//! navigation instruction or a value the page renders back to the user. They
//! know nothing about HTTP.

pub mod auth;
pub mod invoices;

use crate::validation::FieldErrors;
use serde::Serialize;

/// Route of the invoice listing.
pub const INVOICES_PATH: &str = "/dashboard/invoices";

/// Where the caller should go after a successful action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Redirect(&'static str),
}

impl Navigation {
    pub fn path(&self) -> &'static str {
        match self {
            Navigation::Redirect(path) => path,
        }
    }
}

/// Failure value of the invoice form actions.
///
/// Validation failures fill `errors`; persistence failures leave `errors`
/// empty and only set `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormState {
    pub errors: FieldErrors,
    pub message: Option<String>,
}

impl FormState {
    pub fn invalid(errors: FieldErrors, message: &str) -> Self {
        Self {
            errors,
            message: Some(message.to_string()),
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            errors: FieldErrors::default(),
            message: Some(message.to_string()),
        }
    }

    pub fn errors_for(&self, field: &str) -> &[String] {
        self.errors.get(field)
    }

    pub fn has_message(&self) -> bool {
        self.message.is_some()
    }

    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}
