mod boards;
mod posts;
mod tokens;
mod topics;
pub mod users;

use sqlx::PgPool;

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique-constraint violation to a field-level validation error,
/// passing every other error through unchanged.
fn map_unique_violation(
    e: sqlx::Error,
    constraint: &str,
    message: &str,
) -> crate::error::AppError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.constraint() == Some(constraint) {
            return crate::error::AppError::Validation(message.to_string());
        }
    }
    crate::error::AppError::Database(e)
}
