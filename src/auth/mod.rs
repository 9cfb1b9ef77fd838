//! Authentication and authorization
//!
//! Bearer tokens are validated statelessly; the principal's role and
//! active flag are re-read from the user repository on each request.

pub mod jwt;
pub mod password;

use std::sync::Arc;

use crate::domain::{Principal, Role};
use crate::error::{AppError, AppResult};
use crate::repository::UserRepository;

pub use jwt::{Claims, JwtError, JwtService};
pub use password::{PasswordError, PasswordHasher};

/// Resolves bearer tokens to principals
#[derive(Clone)]
pub struct AuthService {
    jwt: JwtService,
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(jwt: JwtService, users: Arc<dyn UserRepository>) -> Self {
        Self { jwt, users }
    }

    /// Validate a bearer token and load the principal it names.
    pub async fn authenticate(&self, token: &str) -> AppResult<Principal> {
        let claims = self.jwt.validate(token).map_err(|e| match e {
            JwtError::Expired => AppError::Unauthenticated("Token has expired".to_string()),
            _ => AppError::Unauthenticated("Invalid or malformed token".to_string()),
        })?;

        let user = self
            .users
            .find(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User no longer exists".to_string()))?;

        if !user.is_active {
            return Err(AppError::AccountDisabled);
        }

        Ok(Principal::new(user.id, user.role))
    }
}

/// Authorization gate: permit when the principal's role is in `allowed`.
pub fn authorize(principal: &Principal, allowed: &[Role]) -> AppResult<()> {
    if allowed.contains(&principal.role) {
        return Ok(());
    }

    tracing::warn!(
        user_id = %principal.user_id,
        role = %principal.role,
        correlation_id = ?principal.correlation_id,
        "Permission denied"
    );
    let roles: Vec<&str> = allowed.iter().map(Role::as_str).collect();
    Err(AppError::Forbidden(format!(
        "requires role {}",
        roles.join(" or ")
    )))
}

/// Parse the `Authorization` header value into a bearer token.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
