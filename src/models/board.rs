use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::TopicRef;
use crate::error::{AppError, Result};

/// Maximum length of a board description
pub const MAX_DESCRIPTION_LENGTH: usize = 100;

/// A board: the top-level container of topics
#[derive(Debug, Clone, FromRow)]
pub struct Board {
    pub id: i64,
    /// Unique display title
    pub title: String,
    /// Short description, at most [`MAX_DESCRIPTION_LENGTH`] chars
    pub description: String,
    /// Immutable once set
    pub created_at: DateTime<Utc>,
}

/// Request to create a board (superuser only)
#[derive(Debug, Deserialize)]
pub struct CreateBoardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Partial update of a board (superuser only)
#[derive(Debug, Deserialize)]
pub struct UpdateBoardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Board projection: topics are embedded as compact references only,
/// never the full nested tree.
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub topics: Vec<TopicRef>,
}

impl Board {
    pub fn to_response(&self, topics: Vec<TopicRef>) -> BoardResponse {
        BoardResponse {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            topics,
        }
    }
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.is_empty() {
        return Err(AppError::Validation(
            "title: this field may not be blank".to_string(),
        ));
    }
    if title.len() > 255 {
        return Err(AppError::Validation(
            "title: ensure this field has no more than 255 characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<()> {
    if description.len() > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::Validation(format!(
            "description: ensure this field has no more than {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}
