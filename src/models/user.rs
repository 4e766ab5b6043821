use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, Result};

/// A registered account. The email address is the login identity; the
/// public-facing identity (username) lives on the associated [`Profile`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    /// Unique, domain-normalized email
    pub email: String,
    /// Argon2id PHC string (never serialized)
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

/// Public-facing identity attached 1:1 to a user.
/// Created in the same transaction as the user, never independently.
#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    /// Unique display name, defaults to a generated guest handle
    pub username: String,
}

/// Request to register a user
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Partial update of the caller's own user record
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Credentials for the token exchange
#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Partial update of a profile (only the username is client-mutable)
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
}

/// User projection for API responses (password hash excluded)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Full profile projection
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub user: i64,
    pub username: String,
}

/// Compact reference to a profile, embedded wherever content carries
/// authorship: username plus a canonical link, never the full record.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRef {
    pub username: String,
    pub href: String,
}

impl User {
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            email: self.email.clone(),
            is_active: self.is_active,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
        }
    }
}

impl Profile {
    /// Canonical URL for this profile
    pub fn href(&self) -> String {
        format!("/users/profiles/{}", self.id)
    }

    pub fn to_ref(&self) -> ProfileRef {
        ProfileRef {
            username: self.username.clone(),
            href: self.href(),
        }
    }

    pub fn to_response(&self) -> ProfileResponse {
        ProfileResponse {
            id: self.id,
            user: self.user_id,
            username: self.username.clone(),
        }
    }
}

/// Normalize an email the standard way: the domain portion (after the
/// last '@') is lower-cased, the local part is preserved.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(AppError::Validation(
            "email: this field may not be blank".to_string(),
        ));
    }
    if email.len() > 255 {
        return Err(AppError::Validation(
            "email: ensure this field has no more than 255 characters".to_string(),
        ));
    }
    match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation(
            "email: enter a valid email address".to_string(),
        )),
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 5 {
        return Err(AppError::Validation(
            "password: ensure this field has at least 5 characters".to_string(),
        ));
    }
    if password.len() > 128 {
        return Err(AppError::Validation(
            "password: ensure this field has no more than 128 characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(AppError::Validation(
            "username: this field may not be blank".to_string(),
        ));
    }
    if username.len() > 255 {
        return Err(AppError::Validation(
            "username: ensure this field has no more than 255 characters".to_string(),
        ));
    }
    Ok(())
}
