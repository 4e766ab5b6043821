use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::AuthenticatedUser,
    error::Result,
    models::{
        required, validate_description, validate_title, Board, BoardResponse, CreateBoardRequest,
        TopicRef, UpdateBoardRequest,
    },
    AppState,
};

/// List all boards with their topic references
pub async fn list_boards(State(state): State<AppState>) -> Result<Json<Vec<BoardResponse>>> {
    let boards = state.db.list_boards().await?;

    let board_ids: Vec<i64> = boards.iter().map(|b| b.id).collect();
    let mut topics_by_board = state.db.get_topics_by_board_ids(&board_ids).await?;

    Ok(Json(
        boards
            .into_iter()
            .map(|board| {
                let topics = topics_by_board.remove(&board.id).unwrap_or_default();
                board.to_response(topics.iter().map(|t| t.to_ref()).collect())
            })
            .collect(),
    ))
}

/// Get a board with its topic references
pub async fn get_board(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BoardResponse>> {
    let board = state.db.get_board(id).await?;
    Ok(Json(board_response(&state, board).await?))
}

/// Create a board (superuser only)
pub async fn create_board(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Json(req): Json<CreateBoardRequest>,
) -> Result<(StatusCode, Json<BoardResponse>)> {
    identity.require_superuser()?;

    let title = required("title", req.title)?;
    let description = required("description", req.description)?;
    validate_title(&title)?;
    validate_description(&description)?;

    let board = state.db.create_board(&title, &description).await?;

    // A fresh board has no topics yet
    Ok((StatusCode::CREATED, Json(board.to_response(Vec::new()))))
}

/// Update a board (superuser only)
pub async fn update_board(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBoardRequest>,
) -> Result<Json<BoardResponse>> {
    identity.require_superuser()?;

    if let Some(title) = &req.title {
        validate_title(title)?;
    }
    if let Some(description) = &req.description {
        validate_description(description)?;
    }

    let board = state
        .db
        .update_board(id, req.title.as_deref(), req.description.as_deref())
        .await?;

    Ok(Json(board_response(&state, board).await?))
}

/// Delete a board and, by cascade, its topics and posts (superuser only)
pub async fn delete_board(
    State(state): State<AppState>,
    identity: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    identity.require_superuser()?;

    state.db.delete_board(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn board_response(state: &AppState, board: Board) -> Result<BoardResponse> {
    let topics = state.db.list_topics(board.id).await?;
    let refs: Vec<TopicRef> = topics.iter().map(|t| t.to_ref()).collect();
    Ok(board.to_response(refs))
}
