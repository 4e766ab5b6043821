mod board;
mod post;
mod topic;
mod user;

pub use board::{
    validate_description, validate_title, Board, BoardResponse, CreateBoardRequest,
    UpdateBoardRequest, MAX_DESCRIPTION_LENGTH,
};
pub use post::{
    validate_message, CreatePostRequest, Post, PostResponse, UpdatePostRequest,
    MAX_MESSAGE_LENGTH,
};
pub use topic::{
    CreateTopicRequest, Topic, TopicDetail, TopicListItem, TopicRef, UpdateTopicRequest,
};
pub use user::{
    normalize_email, validate_email, validate_password, validate_username, CreateTokenRequest,
    CreateUserRequest, Profile, ProfileRef, ProfileResponse, UpdateProfileRequest,
    UpdateUserRequest, User, UserResponse,
};

use crate::error::{AppError, Result};

/// Unwrap a request field that the operation requires, surfacing a
/// field-level validation error instead of a deserialization failure.
pub fn required<T>(field: &'static str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| AppError::Validation(format!("{}: this field is required", field)))
}
