use crate::error::{AppError, Result};
use crate::models::Post;

impl super::Database {
    /// Create a post in a topic
    pub async fn create_post(
        &self,
        topic_id: i64,
        author_id: i64,
        message: &str,
    ) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (topic_id, author_id, message)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(topic_id)
        .bind(author_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    /// Get a post by ID
    pub async fn get_post(&self, id: i64) -> Result<Post> {
        sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    /// Get a post scoped to a topic path segment
    pub async fn get_post_in_topic(&self, topic_id: i64, post_id: i64) -> Result<Post> {
        sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1 AND topic_id = $2")
            .bind(post_id)
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    /// List a topic's posts in chronological order
    pub async fn list_posts(&self, topic_id: i64) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE topic_id = $1 ORDER BY created_at, id",
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Edit a post's message. The only mutation path for post content:
    /// message and edited_at always move together.
    pub async fn edit_post_message(&self, id: i64, message: &str) -> Result<Post> {
        sqlx::query_as::<_, Post>(
            "UPDATE posts SET message = $2, edited_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    /// Delete a post
    pub async fn delete_post(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        Ok(())
    }
}
