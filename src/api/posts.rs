use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::AuthenticatedUser,
    error::Result,
    models::{
        required, validate_message, CreatePostRequest, Post, PostResponse, UpdatePostRequest,
    },
    AppState,
};

/// List a topic's posts in chronological order
pub async fn list_posts(
    State(state): State<AppState>,
    Path((board_id, topic_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<PostResponse>>> {
    let topic = state.db.get_topic_in_board(board_id, topic_id).await?;
    let posts = state.db.list_posts(topic.id).await?;

    let mut author_ids: Vec<i64> = posts.iter().filter_map(|p| p.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let profiles = state.db.get_profiles_by_ids(&author_ids).await?;

    Ok(Json(
        posts
            .into_iter()
            .map(|post| {
                let author = post
                    .author_id
                    .and_then(|id| profiles.get(&id))
                    .map(|p| p.to_ref());
                post.to_response(author)
            })
            .collect(),
    ))
}

/// Get a single post
pub async fn get_post(
    State(state): State<AppState>,
    Path((board_id, topic_id, id)): Path<(i64, i64, i64)>,
) -> Result<Json<PostResponse>> {
    let topic = state.db.get_topic_in_board(board_id, topic_id).await?;
    let post = state.db.get_post_in_topic(topic.id, id).await?;
    Ok(Json(post_response(&state, post).await?))
}

/// Create a post in a topic (any authenticated user)
pub async fn create_post(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path((board_id, topic_id)): Path<(i64, i64)>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let topic = state.db.get_topic_in_board(board_id, topic_id).await?;

    let message = required("message", req.message)?;
    validate_message(&message)?;

    let post = state
        .db
        .create_post(topic.id, identity.profile.id, &message)
        .await?;

    let author = Some(identity.profile.to_ref());
    Ok((StatusCode::CREATED, Json(post.to_response(author))))
}

/// Edit a post's message (author or superuser). The edit sets message
/// and edited_at together; a request without a message changes nothing.
pub async fn update_post(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path((board_id, topic_id, id)): Path<(i64, i64, i64)>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>> {
    let topic = state.db.get_topic_in_board(board_id, topic_id).await?;
    let mut post = state.db.get_post_in_topic(topic.id, id).await?;
    identity.require_owner(&post)?;

    if let Some(message) = req.message {
        validate_message(&message)?;
        post = state.db.edit_post_message(post.id, &message).await?;
    }

    Ok(Json(post_response(&state, post).await?))
}

/// Delete a post (author or superuser)
pub async fn delete_post(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path((board_id, topic_id, id)): Path<(i64, i64, i64)>,
) -> Result<StatusCode> {
    let topic = state.db.get_topic_in_board(board_id, topic_id).await?;
    let post = state.db.get_post_in_topic(topic.id, id).await?;
    identity.require_owner(&post)?;

    state.db.delete_post(post.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn post_response(state: &AppState, post: Post) -> Result<PostResponse> {
    let author = match post.author_id {
        Some(id) => Some(state.db.get_profile(id).await?.to_ref()),
        None => None,
    };
    Ok(post.to_response(author))
}
