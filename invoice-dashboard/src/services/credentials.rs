//! Credentials sign-in provider.
//!
//! Sign-in failures that concern the credentials themselves surface as
//! [`AuthError`] with a discriminating [`AuthErrorKind`]. Anything else (the
//! user store being down, a worker panic) is [`SignInError::Other`].

use crate::services::database::UserStore;
use crate::utils::password::{verify_password, Password};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

/// Strategy name of the email/password provider.
pub const CREDENTIALS_STRATEGY: &str = "credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// The submitted email/password pair was rejected.
    CredentialsSignin,
    /// No provider is registered under the requested strategy.
    InvalidProvider,
    /// The provider cannot verify credentials (e.g. a corrupt stored hash).
    Configuration,
}

impl AuthErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorKind::CredentialsSignin => "CredentialsSignin",
            AuthErrorKind::InvalidProvider => "InvalidProvider",
            AuthErrorKind::Configuration => "Configuration",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {detail}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    detail: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    fn credentials(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::CredentialsSignin, detail)
    }
}

#[derive(Debug, Error)]
pub enum SignInError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Login form as submitted.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

impl fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("email", &self.email)
            .field("redirect_to", &self.redirect_to)
            .finish_non_exhaustive()
    }
}

#[derive(Validate)]
struct Credentials {
    #[validate(email)]
    email: String,
    #[validate(length(min = 6))]
    password: String,
}

/// Who signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    async fn sign_in(
        &self,
        strategy: &str,
        form: &CredentialsForm,
    ) -> Result<SignedInUser, SignInError>;
}

/// Email/password sign-in against the users table.
pub struct PasswordCredentialsProvider {
    users: Arc<dyn UserStore>,
}

impl PasswordCredentialsProvider {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CredentialsProvider for PasswordCredentialsProvider {
    async fn sign_in(
        &self,
        strategy: &str,
        form: &CredentialsForm,
    ) -> Result<SignedInUser, SignInError> {
        if strategy != CREDENTIALS_STRATEGY {
            return Err(AuthError::new(
                AuthErrorKind::InvalidProvider,
                format!("no provider named '{}'", strategy),
            )
            .into());
        }

        let credentials = Credentials {
            email: form.email.clone().unwrap_or_default().trim().to_string(),
            password: form.password.clone().unwrap_or_default(),
        };
        credentials
            .validate()
            .map_err(|_| AuthError::credentials("malformed credentials"))?;

        let user = self
            .users
            .find_user_by_email(&credentials.email)
            .await
            .map_err(|e| anyhow::anyhow!("User lookup failed: {}", e))?
            .ok_or_else(|| AuthError::credentials("unknown email"))?;

        let password = Password::new(credentials.password);
        let stored_hash = user.password.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))?
            .map_err(|e| AuthError::new(AuthErrorKind::Configuration, e.to_string()))?;

        if !matches {
            return Err(AuthError::credentials("password mismatch").into());
        }

        Ok(SignedInUser {
            user_id: user.id,
            email: user.email,
            name: user.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::MockStore;
    use crate::utils::password::hash_password;

    fn provider_with_user(password: &str) -> (PasswordCredentialsProvider, Arc<MockStore>) {
        let store = Arc::new(MockStore::new());
        let hash = hash_password(&Password::new(password.to_string())).unwrap();
        store.add_user("User", "user@nextmail.com", &hash).unwrap();
        (PasswordCredentialsProvider::new(store.clone()), store)
    }

    fn form(email: &str, password: &str) -> CredentialsForm {
        CredentialsForm {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            redirect_to: None,
        }
    }

    fn kind(err: SignInError) -> AuthErrorKind {
        match err {
            SignInError::Auth(e) => e.kind,
            SignInError::Other(e) => panic!("expected auth error, got {}", e),
        }
    }

    #[tokio::test]
    async fn correct_password_signs_in() {
        let (provider, _) = provider_with_user("123456");
        let user = provider
            .sign_in(CREDENTIALS_STRATEGY, &form("user@nextmail.com", "123456"))
            .await
            .unwrap();
        assert_eq!(user.email, "user@nextmail.com");
        assert_eq!(user.name, "User");
    }

    #[tokio::test]
    async fn wrong_password_unknown_email_and_malformed_input_are_credentials_errors() {
        let (provider, _) = provider_with_user("123456");
        for submitted in [
            form("user@nextmail.com", "wrong-password"),
            form("nobody@nextmail.com", "123456"),
            form("not-an-email", "123456"),
            form("user@nextmail.com", "123"),
            CredentialsForm::default(),
        ] {
            let err = provider
                .sign_in(CREDENTIALS_STRATEGY, &submitted)
                .await
                .unwrap_err();
            assert_eq!(kind(err), AuthErrorKind::CredentialsSignin);
        }
    }

    #[tokio::test]
    async fn unknown_strategy_is_invalid_provider() {
        let (provider, _) = provider_with_user("123456");
        let err = provider
            .sign_in("github", &form("user@nextmail.com", "123456"))
            .await
            .unwrap_err();
        assert_eq!(kind(err), AuthErrorKind::InvalidProvider);
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_configuration_error() {
        let store = Arc::new(MockStore::new());
        store.add_user("User", "user@nextmail.com", "plaintext").unwrap();
        let provider = PasswordCredentialsProvider::new(store);
        let err = provider
            .sign_in(CREDENTIALS_STRATEGY, &form("user@nextmail.com", "123456"))
            .await
            .unwrap_err();
        assert_eq!(kind(err), AuthErrorKind::Configuration);
    }

    #[tokio::test]
    async fn store_failure_is_not_an_auth_error() {
        let (provider, store) = provider_with_user("123456");
        store.set_unavailable(true);
        let err = provider
            .sign_in(CREDENTIALS_STRATEGY, &form("user@nextmail.com", "123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, SignInError::Other(_)));
    }
}
