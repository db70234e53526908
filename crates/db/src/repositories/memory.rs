use std::collections::HashMap;

use tokio::sync::RwLock;

use armbot_core::{ConversationKey, ConversationState};

use super::{ConversationStateRepository, RepositoryError};

/// In-memory state store used in tests and as a wiring stand-in.
#[derive(Default)]
pub struct InMemoryConversationStateRepository {
    states: RwLock<HashMap<ConversationKey, ConversationState>>,
}

#[async_trait::async_trait]
impl ConversationStateRepository for InMemoryConversationStateRepository {
    async fn load(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let states = self.states.read().await;
        Ok(states.get(key).cloned())
    }

    async fn save(
        &self,
        key: &ConversationKey,
        state: &ConversationState,
    ) -> Result<(), RepositoryError> {
        let mut states = self.states.write().await;
        states.insert(key.clone(), state.clone());
        Ok(())
    }

    async fn delete_user(&self, channel_id: &str, user_id: &str) -> Result<(), RepositoryError> {
        let mut states = self.states.write().await;
        states.retain(|key, _| !(key.channel_id == channel_id && key.user_id == user_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use armbot_core::{ConversationKey, ConversationState};

    use crate::repositories::{ConversationStateRepository, InMemoryConversationStateRepository};

    fn key(channel_id: &str, conversation_id: &str, user_id: &str) -> ConversationKey {
        ConversationKey {
            channel_id: channel_id.to_string(),
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn round_trip_and_absent_key() {
        let repo = InMemoryConversationStateRepository::default();
        let state = ConversationState {
            default_subscription: Some("sub123".to_string()),
            ..ConversationState::default()
        };

        repo.save(&key("webchat", "c-1", "u-1"), &state).await.expect("save");

        assert_eq!(
            repo.load(&key("webchat", "c-1", "u-1")).await.expect("load"),
            Some(state)
        );
        assert_eq!(repo.load(&key("webchat", "c-2", "u-1")).await.expect("load"), None);
    }

    #[tokio::test]
    async fn delete_user_is_scoped_to_channel_and_user() {
        let repo = InMemoryConversationStateRepository::default();
        let state = ConversationState::default();

        repo.save(&key("webchat", "c-1", "u-1"), &state).await.expect("save");
        repo.save(&key("teams", "c-1", "u-1"), &state).await.expect("save");

        repo.delete_user("webchat", "u-1").await.expect("delete");

        assert_eq!(repo.load(&key("webchat", "c-1", "u-1")).await.expect("load"), None);
        assert_eq!(
            repo.load(&key("teams", "c-1", "u-1")).await.expect("load"),
            Some(state)
        );
    }
}
