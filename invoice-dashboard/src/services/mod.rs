//! Services module for invoice-dashboard.

pub mod credentials;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod view_cache;

pub use credentials::{
    AuthError, AuthErrorKind, CredentialsForm, CredentialsProvider, PasswordCredentialsProvider,
    SignInError, SignedInUser, CREDENTIALS_STRATEGY,
};
pub use database::{Database, InvoiceStore, UserStore};
pub use memory::MockStore;
pub use metrics::{get_metrics, init_metrics};
pub use view_cache::ViewCache;
