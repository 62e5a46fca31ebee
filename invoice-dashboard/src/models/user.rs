use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use tower_sessions::Session;

pub const SESSION_USER_ID: &str = "user_id";
pub const SESSION_EMAIL: &str = "email";
pub const SESSION_NAME: &str = "name";

/// Dashboard user row. `password` holds an Argon2 PHC string.
#[derive(Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Authenticated user context extracted from session
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
}

impl AuthUser {
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => self.email.split('@').next().unwrap_or("User"),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to extract session",
                )
                    .into_response()
            })?;

        let user_id: Option<String> = session.get(SESSION_USER_ID).await.unwrap_or(None);
        let email: Option<String> = session.get(SESSION_EMAIL).await.unwrap_or(None);

        match (user_id, email) {
            (Some(user_id), Some(email)) => {
                let name: Option<String> = session.get(SESSION_NAME).await.unwrap_or(None);
                Ok(AuthUser {
                    user_id,
                    email,
                    name,
                })
            }
            _ => Err(Redirect::to("/login").into_response()),
        }
    }
}
