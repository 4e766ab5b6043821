use crate::error::{AppError, Result};
use crate::models::{Profile, User};

impl super::Database {
    /// Store a freshly minted token hash for a user
    pub async fn create_token(&self, user_id: i64, token_hash: &str) -> Result<()> {
        sqlx::query("INSERT INTO auth_tokens (user_id, token_hash) VALUES ($1, $2)")
            .bind(user_id)
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Validate a token hash and load the identity behind it.
    /// Rejects tokens belonging to deactivated accounts.
    pub async fn validate_token(&self, token_hash: &str) -> Result<(User, Profile)> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT id, user_id FROM auth_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        let (token_id, user_id) =
            row.ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

        sqlx::query("UPDATE auth_tokens SET last_used = NOW() WHERE id = $1")
            .bind(token_id)
            .execute(&self.pool)
            .await?;

        let user = self.get_user(user_id).await?;
        if !user.is_active {
            return Err(AppError::Unauthorized("User account is inactive".to_string()));
        }

        let profile = self.get_profile_by_user(user.id).await?;

        Ok((user, profile))
    }
}
