use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{PostResponse, ProfileRef};

/// A topic: a titled thread of posts inside a board.
/// `starter_id` is detached (NULL) when the starting profile is deleted;
/// the topic itself survives.
#[derive(Debug, Clone, FromRow)]
pub struct Topic {
    pub id: i64,
    pub board_id: i64,
    pub starter_id: Option<i64>,
    /// Unique display title
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Request to create a topic. The compound operation also creates the
/// topic's first post from `message`.
#[derive(Debug, Deserialize)]
pub struct CreateTopicRequest {
    pub title: Option<String>,
    pub message: Option<String>,
}

/// Partial update of a topic (only the title is client-mutable)
#[derive(Debug, Deserialize)]
pub struct UpdateTopicRequest {
    pub title: Option<String>,
}

/// Compact reference to a topic, embedded in board projections
#[derive(Debug, Serialize)]
pub struct TopicRef {
    pub href: String,
    pub title: String,
}

/// Topic projection for the list view: derived post_count and the
/// chronologically earliest post (null for a postless topic).
#[derive(Debug, Serialize)]
pub struct TopicListItem {
    pub id: i64,
    pub board: i64,
    pub title: String,
    pub post_count: i64,
    pub created_at: DateTime<Utc>,
    pub starter: Option<ProfileRef>,
    pub first_post: Option<PostResponse>,
}

/// Topic projection for the detail view: the full ordered post list
#[derive(Debug, Serialize)]
pub struct TopicDetail {
    pub id: i64,
    pub board: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub starter: Option<ProfileRef>,
    pub posts: Vec<PostResponse>,
}

impl crate::auth::Owned for Topic {
    fn owner(&self) -> Option<i64> {
        self.starter_id
    }
}

impl Topic {
    /// Canonical URL for this topic
    pub fn href(&self) -> String {
        format!("/boards/{}/topics/{}", self.board_id, self.id)
    }

    pub fn to_ref(&self) -> TopicRef {
        TopicRef {
            href: self.href(),
            title: self.title.clone(),
        }
    }

    pub fn to_list_item(
        &self,
        post_count: i64,
        starter: Option<ProfileRef>,
        first_post: Option<PostResponse>,
    ) -> TopicListItem {
        TopicListItem {
            id: self.id,
            board: self.board_id,
            title: self.title.clone(),
            post_count,
            created_at: self.created_at,
            starter,
            first_post,
        }
    }

    pub fn to_detail(&self, starter: Option<ProfileRef>, posts: Vec<PostResponse>) -> TopicDetail {
        TopicDetail {
            id: self.id,
            board: self.board_id,
            title: self.title.clone(),
            created_at: self.created_at,
            starter,
            posts,
        }
    }
}
