use std::collections::HashMap;

use super::map_unique_violation;
use crate::error::{AppError, Result};
use crate::models::{Profile, User};

/// Attempts before giving up on allocating a guest username. With 8
/// random bytes a collision is astronomically unlikely; the cap only
/// bounds a broken RNG.
const USERNAME_RETRY_CAP: usize = 16;

/// Generate a default profile username: "guest" + 16 hex chars
pub fn generate_guest_username() -> String {
    use rand::Rng;
    let bytes: [u8; 8] = rand::thread_rng().gen();
    format!("guest{}", hex::encode(bytes))
}

impl super::Database {
    /// Create a user and its profile in one transaction.
    ///
    /// The caller passes an already-normalized email and an Argon2 hash.
    /// The profile is allocated a generated guest username, retried on
    /// uniqueness collision without aborting the user insert.
    pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<(User, Profile)> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "users_email_key",
                "email: a user with this email already exists",
            )
        })?;

        // ON CONFLICT DO NOTHING keeps the transaction alive on a
        // username collision; an empty RETURNING means try again.
        let mut profile = None;
        for _ in 0..USERNAME_RETRY_CAP {
            let username = generate_guest_username();
            let row = sqlx::query_as::<_, Profile>(
                r#"
                INSERT INTO profiles (user_id, username)
                VALUES ($1, $2)
                ON CONFLICT (username) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(user.id)
            .bind(&username)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(created) = row {
                profile = Some(created);
                break;
            }
        }

        let profile = profile.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("could not allocate a unique guest username"))
        })?;

        tx.commit().await?;

        Ok((user, profile))
    }

    /// Create a user and flag it staff + superuser
    pub async fn create_superuser(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<(User, Profile)> {
        let (user, profile) = self.create_user(email, password_hash).await?;

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_staff = TRUE, is_superuser = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        Ok((user, profile))
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Look up a user by normalized email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Partially update a user's email and/or password hash
    pub async fn update_user(
        &self,
        id: i64,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "users_email_key",
                "email: a user with this email already exists",
            )
        })?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Get a profile by ID
    pub async fn get_profile(&self, id: i64) -> Result<Profile> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    /// Get the profile owned by a user
    pub async fn get_profile_by_user(&self, user_id: i64) -> Result<Profile> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    /// Get multiple profiles by IDs (batch lookup to avoid N+1)
    pub async fn get_profiles_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, Profile>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let profiles = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
    }

    /// Update a profile's username
    pub async fn update_profile_username(&self, id: i64, username: &str) -> Result<Profile> {
        sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET username = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "profiles_username_key",
                "username: a profile with this username already exists",
            )
        })?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    /// Delete a profile. Authored topics and posts survive with their
    /// starter/author references nulled out by the store.
    pub async fn delete_profile(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Profile not found".to_string()));
        }

        Ok(())
    }
}
