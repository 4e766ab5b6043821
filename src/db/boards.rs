use super::map_unique_violation;
use crate::error::{AppError, Result};
use crate::models::Board;

impl super::Database {
    /// Create a board
    pub async fn create_board(&self, title: &str, description: &str) -> Result<Board> {
        sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (title, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "boards_title_key",
                "title: a board with this title already exists",
            )
        })
    }

    /// Get a board by ID
    pub async fn get_board(&self, id: i64) -> Result<Board> {
        sqlx::query_as::<_, Board>("SELECT * FROM boards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Board not found".to_string()))
    }

    /// List all boards
    pub async fn list_boards(&self) -> Result<Vec<Board>> {
        let boards = sqlx::query_as::<_, Board>("SELECT * FROM boards ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(boards)
    }

    /// Partially update a board's title and/or description
    pub async fn update_board(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Board> {
        sqlx::query_as::<_, Board>(
            r#"
            UPDATE boards
            SET title = COALESCE($2, title),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "boards_title_key",
                "title: a board with this title already exists",
            )
        })?
        .ok_or_else(|| AppError::NotFound("Board not found".to_string()))
    }

    /// Delete a board; its topics and their posts cascade in the store
    pub async fn delete_board(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Board not found".to_string()));
        }

        Ok(())
    }
}
