use crate::services::metrics::record_sign_in;
use crate::services::{
    AuthErrorKind, CredentialsForm, CredentialsProvider, SignInError, SignedInUser,
    CREDENTIALS_STRATEGY,
};
use tracing::{info, warn};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong.";

/// Result of a handled sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    SignedIn(SignedInUser),
    Rejected(&'static str),
}

impl AuthOutcome {
    /// Message to show next to the login form; `None` after a successful sign-in.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            AuthOutcome::SignedIn(_) => None,
            AuthOutcome::Rejected(message) => Some(*message),
        }
    }
}

/// Sign in with the credentials strategy and translate auth failures into
/// user-facing messages.
///
/// Failures that are not authentication errors are returned as `Err` for the
/// caller to handle.
pub async fn authenticate(
    provider: &dyn CredentialsProvider,
    form: &CredentialsForm,
) -> Result<AuthOutcome, anyhow::Error> {
    match provider.sign_in(CREDENTIALS_STRATEGY, form).await {
        Ok(user) => {
            info!(user_id = %user.user_id, "User signed in");
            record_sign_in("ok");
            Ok(AuthOutcome::SignedIn(user))
        }
        Err(SignInError::Auth(err)) => {
            warn!(kind = %err.kind, "Sign-in rejected");
            record_sign_in(err.kind.as_str());
            let message = match err.kind {
                AuthErrorKind::CredentialsSignin => INVALID_CREDENTIALS,
                _ => SOMETHING_WENT_WRONG,
            };
            Ok(AuthOutcome::Rejected(message))
        }
        Err(SignInError::Other(err)) => {
            record_sign_in("error");
            Err(err)
        }
    }
}
