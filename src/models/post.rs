use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ProfileRef;
use crate::error::{AppError, Result};

/// Maximum length of a post message
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// A post inside a topic. `author_id` is detached (NULL) when the
/// authoring profile is deleted. `edited_at` stays NULL until the first
/// edit; the edit operation sets message and edited_at together.
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub author_id: Option<i64>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Request to create a post
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub message: Option<String>,
}

/// Partial update of a post (only the message is client-mutable)
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub message: Option<String>,
}

/// Post projection
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub topic: i64,
    pub author: Option<ProfileRef>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl crate::auth::Owned for Post {
    fn owner(&self) -> Option<i64> {
        self.author_id
    }
}

impl Post {
    pub fn to_response(&self, author: Option<ProfileRef>) -> PostResponse {
        PostResponse {
            id: self.id,
            topic: self.topic_id,
            author,
            message: self.message.clone(),
            created_at: self.created_at,
            edited_at: self.edited_at,
        }
    }
}

pub fn validate_message(message: &str) -> Result<()> {
    if message.is_empty() {
        return Err(AppError::Validation(
            "message: this field may not be blank".to_string(),
        ));
    }
    if message.len() > MAX_MESSAGE_LENGTH {
        return Err(AppError::Validation(format!(
            "message: ensure this field has no more than {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}
