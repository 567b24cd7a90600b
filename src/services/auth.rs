//! Authentication and registration service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{NewUser, Role, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account with the given role
    pub async fn register(&self, name: &str, email: &str, password: &str, role: Role) -> AppResult<User> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() || email.is_empty() {
            return Err(AppError::Validation(
                "Name, email and password are required".to_string(),
            ));
        }

        if self.repository.users.email_exists(&email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user = self
            .repository
            .users
            .create(NewUser {
                name: name.to_string(),
                email,
                password_hash: hash_password(password)?,
                role,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Authenticate by email and return a signed token with the user
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !verify_password(&user, password)? {
            tracing::debug!(user_id = %user.id, "Rejected login with invalid password");
            return Err(AppError::Authentication("Invalid password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Decode a bearer token, checking signature and expiry
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authorization("Invalid token".to_string()))
    }

    /// Make sure an administrator account exists for these credentials.
    ///
    /// An existing account with the email is promoted; its password is left
    /// untouched.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> AppResult<User> {
        match self.repository.users.get_by_email(&normalize_email(email)).await? {
            Some(user) if user.role == Role::Admin => Ok(user),
            Some(user) => {
                let user = self.repository.users.set_role(user.id, Role::Admin).await?;
                tracing::info!(user_id = %user.id, "Promoted user to administrator");
                Ok(user)
            }
            None => self.register(name, email, password, Role::Admin).await,
        }
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify user password
fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
