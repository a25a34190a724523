use super::SqliteStore;
use crate::error::MemoryError;
use crate::types::SessionKey;

impl SqliteStore {
    /// Create the session row if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::SessionOwnership`] if the session already exists under a
    /// different user, or a database error if the query fails.
    pub async fn ensure_session(&self, key: &SessionKey) -> Result<(), MemoryError> {
        sqlx::query("INSERT OR IGNORE INTO sessions (session_id, user_id) VALUES (?, ?)")
            .bind(&key.session_id)
            .bind(&key.user_id)
            .execute(&self.pool)
            .await?;

        let owner: (String,) = sqlx::query_as("SELECT user_id FROM sessions WHERE session_id = ?")
            .bind(&key.session_id)
            .fetch_one(&self.pool)
            .await?;

        if owner.0 != key.user_id {
            return Err(MemoryError::SessionOwnership {
                session_id: key.session_id.clone(),
            });
        }
        Ok(())
    }
}
