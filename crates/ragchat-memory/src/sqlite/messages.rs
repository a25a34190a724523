use ragchat_llm::{Message, Role};

use super::SqliteStore;
use crate::error::MemoryError;
use crate::types::{MessageId, SessionKey, StoredMessage};

impl SqliteStore {
    /// Persist one user/assistant exchange atomically.
    ///
    /// Both rows land in the same transaction and the session's `updated_at` is bumped,
    /// so a reader never observes a user message without its answer.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is written in that case.
    pub async fn save_turn(
        &self,
        key: &SessionKey,
        user: &str,
        assistant: &str,
    ) -> Result<(MessageId, MessageId), MemoryError> {
        let mut tx = self.pool.begin().await?;

        let user_id: (MessageId,) = sqlx::query_as(
            "INSERT INTO messages (session_id, role, content) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&key.session_id)
        .bind(Role::User.as_str())
        .bind(user)
        .fetch_one(&mut *tx)
        .await?;

        let assistant_id: (MessageId,) = sqlx::query_as(
            "INSERT INTO messages (session_id, role, content) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&key.session_id)
        .bind(Role::Assistant.as_str())
        .bind(assistant)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE sessions SET updated_at = datetime('now') WHERE session_id = ?")
            .bind(&key.session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((user_id.0, assistant_id.0))
    }

    /// Load the most recent messages for a session, up to `limit`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn load_history(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, MemoryError> {
        let rows: Vec<(MessageId, String, String, String)> = sqlx::query_as(
            "SELECT id, role, content, created_at FROM (\
                SELECT id, role, content, created_at FROM messages \
                WHERE session_id = ? \
                ORDER BY id DESC \
                LIMIT ?\
             ) ORDER BY id ASC",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, role, content, created_at)| StoredMessage {
                id,
                message: Message {
                    role: Role::parse(&role),
                    content,
                },
                created_at,
            })
            .collect())
    }

    /// Count the number of messages in a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_messages(&self, session_id: &str) -> Result<i64, MemoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_session(key: &SessionKey) -> SqliteStore {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.ensure_session(key).await.unwrap();
        store
    }

    #[tokio::test]
    async fn save_turn_persists_both_roles_in_order() {
        let key = SessionKey::new("s", "u");
        let store = store_with_session(&key).await;

        let (user_id, assistant_id) = store.save_turn(&key, "question", "answer").await.unwrap();
        assert!(assistant_id > user_id);

        let history = store.load_history("s", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, Message::user("question"));
        assert_eq!(history[1].message, Message::assistant("answer"));
    }

    #[tokio::test]
    async fn load_history_returns_latest_window_oldest_first() {
        let key = SessionKey::new("s", "u");
        let store = store_with_session(&key).await;
        for i in 0..4 {
            store
                .save_turn(&key, &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }

        let history = store.load_history("s", 3).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.message.content.as_str()).collect();
        assert_eq!(contents, vec!["a2", "q3", "a3"]);
    }

    #[tokio::test]
    async fn load_history_is_scoped_to_session() {
        let a = SessionKey::new("a", "u");
        let b = SessionKey::new("b", "u");
        let store = store_with_session(&a).await;
        store.ensure_session(&b).await.unwrap();

        store.save_turn(&a, "from a", "reply a").await.unwrap();
        store.save_turn(&b, "from b", "reply b").await.unwrap();

        let history = store.load_history("a", 10).await.unwrap();
        assert!(history.iter().all(|m| !m.message.content.contains('b')));
        assert_eq!(store.count_messages("b").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn load_history_empty_session() {
        let key = SessionKey::new("s", "u");
        let store = store_with_session(&key).await;
        assert!(store.load_history("s", 6).await.unwrap().is_empty());
        assert!(store.load_history("s", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_turn_without_session_fails_and_writes_nothing() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let key = SessionKey::new("ghost", "u");

        assert!(store.save_turn(&key, "q", "a").await.is_err());
        assert_eq!(store.count_messages("ghost").await.unwrap(), 0);
    }
}
