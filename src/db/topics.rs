use std::collections::HashMap;

use super::map_unique_violation;
use crate::error::{AppError, Result};
use crate::models::{Post, Topic};

const TITLE_TAKEN: &str = "title: a topic with this title already exists";

impl super::Database {
    /// Create a topic together with its first post in one transaction:
    /// both rows become visible together or not at all.
    pub async fn create_topic_with_first_post(
        &self,
        board_id: i64,
        starter_id: i64,
        title: &str,
        message: &str,
    ) -> Result<(Topic, Post)> {
        let mut tx = self.pool.begin().await?;

        let topic = sqlx::query_as::<_, Topic>(
            r#"
            INSERT INTO topics (board_id, starter_id, title)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(board_id)
        .bind(starter_id)
        .bind(title)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "topics_title_key", TITLE_TAKEN))?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (topic_id, author_id, message)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(topic.id)
        .bind(starter_id)
        .bind(message)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((topic, post))
    }

    /// Get a topic by ID
    pub async fn get_topic(&self, id: i64) -> Result<Topic> {
        sqlx::query_as::<_, Topic>("SELECT * FROM topics WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Topic not found".to_string()))
    }

    /// Get a topic scoped to a board path segment. A topic reached
    /// through the wrong board resolves as missing.
    pub async fn get_topic_in_board(&self, board_id: i64, topic_id: i64) -> Result<Topic> {
        sqlx::query_as::<_, Topic>("SELECT * FROM topics WHERE id = $1 AND board_id = $2")
            .bind(topic_id)
            .bind(board_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Topic not found".to_string()))
    }

    /// List a board's topics
    pub async fn list_topics(&self, board_id: i64) -> Result<Vec<Topic>> {
        let topics =
            sqlx::query_as::<_, Topic>("SELECT * FROM topics WHERE board_id = $1 ORDER BY id")
                .bind(board_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(topics)
    }

    /// Get topics for multiple boards (batch query to avoid N+1)
    pub async fn get_topics_by_board_ids(
        &self,
        board_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Topic>>> {
        if board_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let topics = sqlx::query_as::<_, Topic>(
            "SELECT * FROM topics WHERE board_id = ANY($1) ORDER BY id",
        )
        .bind(board_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_board: HashMap<i64, Vec<Topic>> = HashMap::new();
        for topic in topics {
            by_board.entry(topic.board_id).or_default().push(topic);
        }

        Ok(by_board)
    }

    /// Get post counts for multiple topics (batch query)
    pub async fn get_topic_post_counts(&self, topic_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if topic_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT topic_id, COUNT(*) as post_count
            FROM posts
            WHERE topic_id = ANY($1)
            GROUP BY topic_id
            "#,
        )
        .bind(topic_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Get the chronologically earliest post of each topic (batch query)
    pub async fn get_first_posts(&self, topic_ids: &[i64]) -> Result<HashMap<i64, Post>> {
        if topic_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT DISTINCT ON (topic_id) *
            FROM posts
            WHERE topic_id = ANY($1)
            ORDER BY topic_id, created_at ASC, id ASC
            "#,
        )
        .bind(topic_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts.into_iter().map(|p| (p.topic_id, p)).collect())
    }

    /// Update a topic's title
    pub async fn update_topic_title(&self, id: i64, title: &str) -> Result<Topic> {
        sqlx::query_as::<_, Topic>("UPDATE topics SET title = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "topics_title_key", TITLE_TAKEN))?
            .ok_or_else(|| AppError::NotFound("Topic not found".to_string()))
    }

    /// Delete a topic; its posts cascade in the store
    pub async fn delete_topic(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Topic not found".to_string()));
        }

        Ok(())
    }
}
