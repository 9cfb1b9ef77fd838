//! User accounts
//!
//! Registration, login and administration of back-office users.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{JwtService, PasswordError, PasswordHasher};
use crate::domain::user::normalize_email;
use crate::domain::{NewUser, Role, User, UserPatch};
use crate::error::{AppError, AppResult};
use crate::repository::UserRepository;

use super::{LoginCommand, LoginResult, RegisterCommand, UpdateUserCommand};

/// Handler for user account operations
#[derive(Clone)]
pub struct UserManager {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    jwt: JwtService,
}

impl UserManager {
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher, jwt: JwtService) -> Self {
        Self { users, hasher, jwt }
    }

    /// Self-service registration. New accounts are inactive cashiers.
    pub async fn register(&self, command: RegisterCommand) -> AppResult<User> {
        self.create(command, Role::Cashier, false).await
    }

    /// Create a user with an explicit role and active flag.
    pub async fn create(
        &self,
        command: RegisterCommand,
        role: Role,
        is_active: bool,
    ) -> AppResult<User> {
        let email = command
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty());
        let password = command.password.filter(|p| !p.is_empty());

        let (Some(email), Some(password)) = (email, password) else {
            return Err(AppError::validation("Email and password are required"));
        };

        let password_hash = self
            .hasher
            .hash_blocking(password)
            .await
            .map_err(password_failure)?;

        let user = self
            .users
            .insert(NewUser {
                email,
                phone: command
                    .phone
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty()),
                password_hash,
                role,
                is_active,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn login(&self, command: LoginCommand) -> AppResult<LoginResult> {
        let email = normalize_email(&command.email);

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = self
            .hasher
            .verify_blocking(command.password, user.password_hash.clone())
            .await
            .map_err(password_failure)?;
        if !valid {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::AccountDisabled);
        }

        let token = self
            .jwt
            .issue(user.id)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginResult {
            token,
            expires_in: self.jwt.expires_in(),
            user,
        })
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.users.list().await?)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        self.users
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn update(&self, id: Uuid, command: UpdateUserCommand) -> AppResult<User> {
        let password_hash = match command.password.filter(|p| !p.is_empty()) {
            Some(password) => Some(
                self.hasher
                    .hash_blocking(password)
                    .await
                    .map_err(password_failure)?,
            ),
            None => None,
        };

        let email = match command.email {
            Some(raw) => {
                let email = normalize_email(&raw);
                if email.is_empty() {
                    return Err(AppError::validation("email must not be blank"));
                }
                Some(email)
            }
            None => None,
        };

        let patch = UserPatch {
            email,
            phone: command.phone,
            password_hash,
            role: command.role,
            is_active: command.is_active,
        };
        if patch.is_empty() {
            return self.get(id).await;
        }

        let user = self
            .users
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        tracing::info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<User> {
        let user = self
            .users
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        tracing::info!(user_id = %user.id, "User deleted");
        Ok(user)
    }
}

fn password_failure(err: PasswordError) -> AppError {
    AppError::Internal(err.to_string())
}
