use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use armbot_core::{ConversationKey, ConversationState};

use super::{ConversationStateRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationStateRepository {
    pool: DbPool,
}

impl SqlConversationStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStateRepository for SqlConversationStateRepository {
    async fn load(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let row = sqlx::query(
            "SELECT state_json FROM conversation_state \
             WHERE channel_id = ? AND conversation_id = ? AND user_id = ?",
        )
        .bind(&key.channel_id)
        .bind(&key.conversation_id)
        .bind(&key.user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let state_json = row.get::<String, _>("state_json");
            serde_json::from_str(&state_json)
                .map_err(|error| RepositoryError::Decode(error.to_string()))
        })
        .transpose()
    }

    async fn save(
        &self,
        key: &ConversationKey,
        state: &ConversationState,
    ) -> Result<(), RepositoryError> {
        let state_json = serde_json::to_string(state)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO conversation_state \
                 (channel_id, conversation_id, user_id, state_json, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (channel_id, conversation_id, user_id) \
             DO UPDATE SET state_json = excluded.state_json, updated_at = excluded.updated_at",
        )
        .bind(&key.channel_id)
        .bind(&key.conversation_id)
        .bind(&key.user_id)
        .bind(state_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_user(&self, channel_id: &str, user_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM conversation_state WHERE channel_id = ? AND user_id = ?")
            .bind(channel_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
