use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::AuthenticatedUser,
    error::Result,
    models::{
        required, validate_message, validate_title, CreateTopicRequest, Topic, TopicDetail,
        TopicListItem, UpdateTopicRequest,
    },
    AppState,
};

/// List a board's topics with derived post_count and first_post
pub async fn list_topics(
    State(state): State<AppState>,
    Path(board_id): Path<i64>,
) -> Result<Json<Vec<TopicListItem>>> {
    let board = state.db.get_board(board_id).await?;
    let topics = state.db.list_topics(board.id).await?;

    let topic_ids: Vec<i64> = topics.iter().map(|t| t.id).collect();
    let post_counts = state.db.get_topic_post_counts(&topic_ids).await?;
    let first_posts = state.db.get_first_posts(&topic_ids).await?;

    // Batch fetch starters and first-post authors in one go
    let mut profile_ids: Vec<i64> = topics.iter().filter_map(|t| t.starter_id).collect();
    profile_ids.extend(first_posts.values().filter_map(|p| p.author_id));
    profile_ids.sort_unstable();
    profile_ids.dedup();
    let profiles = state.db.get_profiles_by_ids(&profile_ids).await?;

    let items = topics
        .into_iter()
        .map(|topic| {
            let starter = topic
                .starter_id
                .and_then(|id| profiles.get(&id))
                .map(|p| p.to_ref());
            let first_post = first_posts.get(&topic.id).map(|post| {
                let author = post
                    .author_id
                    .and_then(|id| profiles.get(&id))
                    .map(|p| p.to_ref());
                post.to_response(author)
            });
            let post_count = post_counts.get(&topic.id).copied().unwrap_or(0);
            topic.to_list_item(post_count, starter, first_post)
        })
        .collect();

    Ok(Json(items))
}

/// Get a topic's detail view with its full ordered post list
pub async fn get_topic(
    State(state): State<AppState>,
    Path((board_id, id)): Path<(i64, i64)>,
) -> Result<Json<TopicDetail>> {
    let topic = state.db.get_topic_in_board(board_id, id).await?;
    Ok(Json(topic_detail(&state, topic).await?))
}

/// Create a topic together with its first post. The two inserts are one
/// transaction; the response is the detail projection already carrying
/// the new post.
pub async fn create_topic(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path(board_id): Path<i64>,
    Json(req): Json<CreateTopicRequest>,
) -> Result<(StatusCode, Json<TopicDetail>)> {
    let board = state.db.get_board(board_id).await?;

    let title = required("title", req.title)?;
    let message = required("message", req.message)?;
    validate_title(&title)?;
    validate_message(&message)?;

    let (topic, post) = state
        .db
        .create_topic_with_first_post(board.id, identity.profile.id, &title, &message)
        .await?;

    let starter = Some(identity.profile.to_ref());
    let posts = vec![post.to_response(starter.clone())];

    Ok((StatusCode::CREATED, Json(topic.to_detail(starter, posts))))
}

/// Update a topic's title (starter or superuser)
pub async fn update_topic(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path((board_id, id)): Path<(i64, i64)>,
    Json(req): Json<UpdateTopicRequest>,
) -> Result<Json<TopicDetail>> {
    let mut topic = state.db.get_topic_in_board(board_id, id).await?;
    identity.require_owner(&topic)?;

    if let Some(title) = req.title {
        validate_title(&title)?;
        topic = state.db.update_topic_title(topic.id, &title).await?;
    }

    Ok(Json(topic_detail(&state, topic).await?))
}

/// Delete a topic and, by cascade, its posts (starter or superuser)
pub async fn delete_topic(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path((board_id, id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    let topic = state.db.get_topic_in_board(board_id, id).await?;
    identity.require_owner(&topic)?;

    state.db.delete_topic(topic.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Assemble the detail projection: starter ref plus all posts with
/// their author refs, resolved in one batch profile lookup.
async fn topic_detail(state: &AppState, topic: Topic) -> Result<TopicDetail> {
    let posts = state.db.list_posts(topic.id).await?;

    let mut profile_ids: Vec<i64> = posts.iter().filter_map(|p| p.author_id).collect();
    profile_ids.extend(topic.starter_id);
    profile_ids.sort_unstable();
    profile_ids.dedup();
    let profiles = state.db.get_profiles_by_ids(&profile_ids).await?;

    let starter = topic
        .starter_id
        .and_then(|id| profiles.get(&id))
        .map(|p| p.to_ref());

    let post_responses = posts
        .into_iter()
        .map(|post| {
            let author = post
                .author_id
                .and_then(|id| profiles.get(&id))
                .map(|p| p.to_ref());
            post.to_response(author)
        })
        .collect();

    Ok(topic.to_detail(starter, post_responses))
}
