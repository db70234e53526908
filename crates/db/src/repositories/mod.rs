use async_trait::async_trait;
use thiserror::Error;

use armbot_core::{ConversationKey, ConversationState};

pub mod conversation;
pub mod memory;

pub use conversation::SqlConversationStateRepository;
pub use memory::InMemoryConversationStateRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Durable per-conversation dialog state, keyed by (channel, conversation,
/// user). `delete_user` drops every conversation a user holds in a channel,
/// matching the user-data-deletion semantics of the inbound channel.
#[async_trait]
pub trait ConversationStateRepository: Send + Sync {
    async fn load(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<ConversationState>, RepositoryError>;

    async fn save(
        &self,
        key: &ConversationKey,
        state: &ConversationState,
    ) -> Result<(), RepositoryError>;

    async fn delete_user(&self, channel_id: &str, user_id: &str) -> Result<(), RepositoryError>;
}
