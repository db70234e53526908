use serde::{Deserialize, Serialize};

use super::credentials::ServicePrincipalCredentials;

/// Identifies one private conversation. All durable dialog state is keyed by
/// this triple in the state store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub channel_id: String,
    pub conversation_id: String,
    pub user_id: String,
}

/// The follow-up question currently open in a conversation. Each variant has
/// a well-defined answer format the machine validates before resuming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingQuestion {
    ServicePrincipalCredentials,
}

/// Per-conversation dialog state, persisted between webhook calls.
///
/// Invariant: `pending_question` is present iff the machine is waiting on a
/// specific answer format; it is cleared in the same transition that consumes
/// a valid answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_question: Option<PendingQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ServicePrincipalCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_subscription: Option<String>,
}

impl ConversationState {
    pub fn is_awaiting_answer(&self) -> bool {
        self.pending_question.is_some()
    }
}
