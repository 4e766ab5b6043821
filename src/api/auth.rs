use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    auth::{self, AuthenticatedUser},
    error::Result,
    models::{
        normalize_email, required, validate_email, validate_password, CreateTokenRequest,
        CreateUserRequest, UpdateUserRequest, UserResponse,
    },
    AppState,
};

/// Response for the token exchange. The plaintext token is returned
/// exactly once; only its hash is stored.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a new user. The profile is created as part of the same
/// operation with a generated guest username.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let email = required("email", req.email)?;
    let password = required("password", req.password)?;

    validate_email(&email)?;
    validate_password(&password)?;

    let email = normalize_email(&email);
    let password_hash = auth::hash_password(&password)?;

    let (user, _profile) = state.db.create_user(&email, &password_hash).await?;

    Ok((StatusCode::CREATED, Json(user.to_response())))
}

/// Exchange credentials for an opaque bearer token
pub async fn create_token(
    State(state): State<AppState>,
    Json(req): Json<CreateTokenRequest>,
) -> Result<Json<TokenResponse>> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(crate::error::AppError::Validation(
            "Must include \"email\" and \"password\".".to_string(),
        ));
    };

    let user = auth::authenticate(&state.db, &email, &password).await?;

    let token = auth::generate_token();
    state
        .db
        .create_token(user.id, &auth::hash_token(&token))
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// Fetch the caller's own user record
pub async fn me(identity: AuthenticatedUser) -> Json<UserResponse> {
    Json(identity.user.to_response())
}

/// Update the caller's own user record. A new password is re-hashed, a
/// new email re-normalized; both are optional.
pub async fn update_me(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let email = match req.email {
        Some(email) => {
            validate_email(&email)?;
            Some(normalize_email(&email))
        }
        None => None,
    };

    let password_hash = match req.password {
        Some(password) => {
            validate_password(&password)?;
            Some(auth::hash_password(&password)?)
        }
        None => None,
    };

    let user = state
        .db
        .update_user(identity.user.id, email.as_deref(), password_hash.as_deref())
        .await?;

    Ok(Json(user.to_response()))
}
