use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tokio::sync::Mutex;
use uuid::Uuid;

use armbot_agent::DialogStateMachine;
use armbot_connector::{Activity, ActivityType, ReplyDelivery};
use armbot_core::ConversationKey;
use armbot_db::ConversationStateRepository;

/// One lock per conversation key, created lazily. Messages in the same
/// conversation are processed strictly in arrival order; distinct
/// conversations never contend.
#[derive(Clone, Default)]
struct ConversationLocks {
    inner: Arc<Mutex<HashMap<ConversationKey, Arc<Mutex<()>>>>>,
}

impl ConversationLocks {
    async fn acquire(&self, key: &ConversationKey) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        // An entry held only by the map belongs to an idle conversation and
        // can be dropped; anyone mid-flight still owns a clone.
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(key.clone()).or_default().clone()
    }
}

#[derive(Clone)]
pub struct WebhookState {
    machine: Arc<DialogStateMachine>,
    states: Arc<dyn ConversationStateRepository>,
    replies: Arc<dyn ReplyDelivery>,
    locks: ConversationLocks,
}

impl WebhookState {
    pub fn new(
        machine: Arc<DialogStateMachine>,
        states: Arc<dyn ConversationStateRepository>,
        replies: Arc<dyn ReplyDelivery>,
    ) -> Self {
        Self { machine, states, replies, locks: ConversationLocks::default() }
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/api/messages", post(receive)).with_state(state)
}

/// Webhook entry point. Every well-formed envelope is acknowledged with 200
/// regardless of what processing does with it; the channel retries anything
/// else and the dialog already folds its own failures into reply text.
async fn receive(State(state): State<WebhookState>, Json(activity): Json<Activity>) -> StatusCode {
    let correlation_id = Uuid::new_v4().to_string();

    match activity.activity_type {
        ActivityType::Message => handle_message(&state, &activity, &correlation_id).await,
        ActivityType::DeleteUserData | ActivityType::ContactRelationUpdate => {
            handle_forget_user(&state, &activity, &correlation_id).await
        }
        other => {
            tracing::debug!(
                event_name = "webhook.activity_ignored",
                correlation_id = %correlation_id,
                activity_type = ?other,
                "non-message activity acknowledged without processing"
            );
        }
    }

    StatusCode::OK
}

async fn handle_message(state: &WebhookState, activity: &Activity, correlation_id: &str) {
    let key = activity.conversation_key();
    let text = activity.text.clone().unwrap_or_default();

    let lock = state.locks.acquire(&key).await;
    let _guard = lock.lock().await;

    let conversation = match state.states.load(&key).await {
        Ok(loaded) => loaded.unwrap_or_default(),
        Err(error) => {
            tracing::error!(
                event_name = "webhook.state_load_failed",
                correlation_id = %correlation_id,
                channel_id = %key.channel_id,
                conversation_id = %key.conversation_id,
                error = %error,
                "dropping message because conversation state could not be loaded"
            );
            return;
        }
    };

    let (next, reply_text) = state.machine.handle(conversation, &text).await;

    if let Err(error) = state.states.save(&key, &next).await {
        tracing::error!(
            event_name = "webhook.state_save_failed",
            correlation_id = %correlation_id,
            channel_id = %key.channel_id,
            conversation_id = %key.conversation_id,
            error = %error,
            "dropping reply because conversation state could not be saved"
        );
        return;
    }

    let reply = activity.create_reply(&reply_text);
    if let Err(error) = state.replies.deliver(&reply).await {
        tracing::warn!(
            event_name = "webhook.reply_delivery_failed",
            correlation_id = %correlation_id,
            channel_id = %key.channel_id,
            conversation_id = %key.conversation_id,
            error = %error,
            "reply could not be delivered"
        );
        return;
    }

    tracing::info!(
        event_name = "webhook.message_handled",
        correlation_id = %correlation_id,
        channel_id = %key.channel_id,
        conversation_id = %key.conversation_id,
        "message processed and reply delivered"
    );
}

async fn handle_forget_user(state: &WebhookState, activity: &Activity, correlation_id: &str) {
    match state.states.delete_user(&activity.channel_id, &activity.from.id).await {
        Ok(()) => {
            tracing::info!(
                event_name = "webhook.user_data_deleted",
                correlation_id = %correlation_id,
                channel_id = %activity.channel_id,
                "stored conversation state deleted for user"
            );
        }
        Err(error) => {
            tracing::error!(
                event_name = "webhook.user_data_delete_failed",
                correlation_id = %correlation_id,
                channel_id = %activity.channel_id,
                error = %error,
                "stored conversation state could not be deleted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use armbot_agent::{
        DialogStateMachine, ResourceGroup, StaticClassifier, StaticDirectory, Subscription,
    };
    use armbot_connector::{Activity, RecordingReplyDelivery};
    use armbot_core::{ConversationKey, ConversationState};
    use armbot_db::{ConversationStateRepository, InMemoryConversationStateRepository};

    use super::{router, WebhookState};

    struct Harness {
        state: WebhookState,
        states: Arc<InMemoryConversationStateRepository>,
        replies: Arc<RecordingReplyDelivery>,
    }

    fn harness() -> Harness {
        let classifier = StaticClassifier::new()
            .with_label("hello", "Greet")
            .with_label("list my subscriptions", "ListSubscriptions");
        let directory = StaticDirectory {
            subscriptions: vec![Subscription {
                id: "sub-1".to_string(),
                display_name: "Production".to_string(),
            }],
            resource_groups: vec![ResourceGroup { name: "rg-web".to_string() }],
        };
        let machine =
            Arc::new(DialogStateMachine::new(Arc::new(classifier), Arc::new(directory)));
        let states = Arc::new(InMemoryConversationStateRepository::default());
        let replies = Arc::new(RecordingReplyDelivery::default());

        Harness {
            state: WebhookState::new(machine, states.clone(), replies.clone()),
            states,
            replies,
        }
    }

    fn envelope(activity_type: &str, text: Option<&str>) -> String {
        let text_field = match text {
            Some(text) => format!(r#""text": "{text}","#),
            None => String::new(),
        };
        format!(
            r#"{{
                "type": "{activity_type}",
                "id": "act-1",
                "from": {{"id": "u-1", "name": "Pat"}},
                "recipient": {{"id": "bot-1", "name": "armbot"}},
                "conversation": {{"id": "c-1"}},
                "channelId": "webchat",
                {text_field}
                "serviceUrl": "https://channel.example.test"
            }}"#
        )
    }

    async fn post(harness: &Harness, body: String) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request");

        router(harness.state.clone()).oneshot(request).await.expect("response").status()
    }

    fn conversation_key() -> ConversationKey {
        ConversationKey {
            channel_id: "webchat".to_string(),
            conversation_id: "c-1".to_string(),
            user_id: "u-1".to_string(),
        }
    }

    async fn stored_state(harness: &Harness) -> Option<ConversationState> {
        harness.states.load(&conversation_key()).await.expect("state load should succeed")
    }

    #[tokio::test]
    async fn idle_conversation_locks_are_evicted_on_later_acquires() {
        let locks = super::ConversationLocks::default();
        let other_key = ConversationKey {
            channel_id: "webchat".to_string(),
            conversation_id: "c-2".to_string(),
            user_id: "u-2".to_string(),
        };

        let first = locks.acquire(&conversation_key()).await;
        drop(first);

        let _held = locks.acquire(&other_key).await;

        let map = locks.inner.lock().await;
        assert_eq!(map.len(), 1, "released conversation lock should be gone");
        assert!(map.contains_key(&other_key));
    }

    #[tokio::test]
    async fn held_conversation_locks_survive_eviction() {
        let locks = super::ConversationLocks::default();
        let other_key = ConversationKey {
            channel_id: "webchat".to_string(),
            conversation_id: "c-2".to_string(),
            user_id: "u-2".to_string(),
        };

        let held = locks.acquire(&conversation_key()).await;
        let _other = locks.acquire(&other_key).await;

        let same = locks.acquire(&conversation_key()).await;
        assert!(Arc::ptr_eq(&held, &same), "in-flight conversation must keep its lock");
    }

    #[tokio::test]
    async fn greeting_round_trip_delivers_a_reply_with_swapped_addressing() {
        let harness = harness();

        let status = post(&harness, envelope("message", Some("hello"))).await;

        assert_eq!(status, StatusCode::OK);
        let sent = harness.replies.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text.as_deref(), Some("Hi there. How can I help you today?"));
        assert_eq!(sent[0].from.id, "bot-1");
        assert_eq!(sent[0].recipient.as_ref().map(|account| account.id.as_str()), Some("u-1"));
        assert_eq!(sent[0].reply_to_id.as_deref(), Some("act-1"));
    }

    #[tokio::test]
    async fn credentials_dialog_survives_across_webhook_calls() {
        let harness = harness();

        post(&harness, envelope("message", Some("list my subscriptions"))).await;
        post(&harness, envelope("message", Some("client,secret,tenant"))).await;

        let sent = harness.replies.sent().await;
        assert_eq!(sent.len(), 2);
        assert!(sent[0]
            .text
            .as_deref()
            .expect("prompt text")
            .starts_with("Sure. Please enter your AD application client id"));
        assert_eq!(
            sent[1].text.as_deref(),
            Some("Your subscriptions:\nSubscriptionId: sub-1, DisplayName: Production")
        );

        let state = stored_state(&harness).await.expect("state persisted");
        assert!(state.credentials.is_some());
        assert!(!state.is_awaiting_answer());
    }

    #[tokio::test]
    async fn delete_user_data_clears_stored_state_without_replying() {
        let harness = harness();
        post(&harness, envelope("message", Some("list my subscriptions"))).await;
        assert!(stored_state(&harness).await.is_some());

        let status = post(&harness, envelope("deleteUserData", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(stored_state(&harness).await.is_none());
        assert_eq!(harness.replies.sent().await.len(), 1, "only the prompt was delivered");
    }

    #[tokio::test]
    async fn contact_relation_update_clears_stored_state_too() {
        let harness = harness();
        post(&harness, envelope("message", Some("hello"))).await;

        post(&harness, envelope("contactRelationUpdate", None)).await;

        assert!(stored_state(&harness).await.is_none());
    }

    #[tokio::test]
    async fn unsupported_activity_types_are_acknowledged_without_a_reply() {
        let harness = harness();

        let status = post(&harness, envelope("messageReaction", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(harness.replies.sent().await.is_empty());
    }

    #[tokio::test]
    async fn message_without_text_is_treated_as_an_empty_utterance() {
        let harness = harness();

        let status = post(&harness, envelope("message", None)).await;

        assert_eq!(status, StatusCode::OK);
        let sent = harness.replies.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text.as_deref(), Some("I'm sorry. I did not understand you."));
    }
}
