use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, Result},
    models::{validate_username, ProfileResponse, UpdateProfileRequest},
    AppState,
};

/// Fetch any profile (public)
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.db.get_profile(id).await?;
    Ok(Json(profile.to_response()))
}

/// Update a profile's username. Only the profile's owner may write;
/// a missing profile resolves as 404 before the ownership check.
pub async fn update_profile(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    let mut profile = state.db.get_profile(id).await?;

    if identity.profile.id != profile.id {
        return Err(AppError::Forbidden(
            "You can only edit your own profile".to_string(),
        ));
    }

    if let Some(username) = req.username {
        validate_username(&username)?;
        profile = state.db.update_profile_username(id, &username).await?;
    }

    Ok(Json(profile.to_response()))
}
