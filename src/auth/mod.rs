use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use rand_core::OsRng;
use sha2::{Digest, Sha256};

use crate::{
    db::Database,
    error::AppError,
    models::{normalize_email, Profile, User},
    AppState,
};

/// Prefix for issued bearer tokens
const TOKEN_PREFIX: &str = "tribune_";

/// Hash a password with Argon2id, producing a PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC hash.
/// A malformed stored hash verifies as false rather than erroring.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Generate a new opaque bearer token
pub fn generate_token() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().gen();
    format!("{}{}", TOKEN_PREFIX, hex::encode(bytes))
}

/// Hash a token for storage/lookup (plaintext is never stored)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Credential check for the token exchange. Unknown email, wrong
/// password, and inactive account all collapse into the same error.
pub async fn authenticate(db: &Database, email: &str, password: &str) -> Result<User, AppError> {
    let user = db
        .get_user_by_email(&normalize_email(email))
        .await?
        .ok_or(AppError::Authorization)?;

    if !verify_password(password, &user.password_hash) {
        return Err(AppError::Authorization);
    }
    if !user.is_active {
        return Err(AppError::Authorization);
    }

    Ok(user)
}

/// Resources carrying an owning profile. The owner is optional because
/// deleting a profile detaches ownership without deleting the content.
pub trait Owned {
    fn owner(&self) -> Option<i64>;
}

/// Authenticated identity extracted from the Authorization header
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub profile: Profile,
}

impl AuthenticatedUser {
    pub fn owns<R: Owned>(&self, resource: &R) -> bool {
        resource.owner() == Some(self.profile.id)
    }

    /// Mutation predicate shared by all owned resources: the owner or a
    /// superuser may modify, everyone else is forbidden.
    pub fn can_modify<R: Owned>(&self, resource: &R) -> bool {
        self.user.is_superuser || self.owns(resource)
    }

    pub fn require_owner<R: Owned>(&self, resource: &R) -> Result<(), AppError> {
        if self.can_modify(resource) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not have permission to modify this resource".to_string(),
            ))
        }
    }

    pub fn require_superuser(&self) -> Result<(), AppError> {
        if self.user.is_superuser {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only superusers may perform this action".to_string(),
            ))
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Database: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let db = Database::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        if !token.starts_with(TOKEN_PREFIX) {
            return Err(AppError::Unauthorized("Invalid token format".to_string()));
        }

        let token_hash = hash_token(token);
        let (user, profile) = db.validate_token(&token_hash).await?;

        Ok(AuthenticatedUser { user, profile })
    }
}

// Implement FromRef so the extractor can pull Database out of AppState
impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
