use std::sync::Arc;

use armbot_core::{ConversationState, PendingQuestion, ServicePrincipalCredentials};

use crate::classify::IntentClassifier;
use crate::directory::{render_resource_groups, render_subscriptions, ResourceDirectory};
use crate::resolve::{self, resolve, Action};

/// Per-message dialog driver. Holds no conversation state of its own; the
/// caller loads state before `handle` and persists whatever comes back.
pub struct DialogStateMachine {
    classifier: Arc<dyn IntentClassifier>,
    directory: Arc<dyn ResourceDirectory>,
}

impl DialogStateMachine {
    pub fn new(classifier: Arc<dyn IntentClassifier>, directory: Arc<dyn ResourceDirectory>) -> Self {
        Self { classifier, directory }
    }

    /// Handles one user message. A pending question consumes the message as
    /// its answer; otherwise the message is classified and routed.
    pub async fn handle(&self, state: ConversationState, text: &str) -> (ConversationState, String) {
        match state.pending_question {
            Some(PendingQuestion::ServicePrincipalCredentials) => {
                self.resume_credentials(state, text).await
            }
            None => self.resolve_intent(state, text).await,
        }
    }

    async fn resume_credentials(
        &self,
        mut state: ConversationState,
        text: &str,
    ) -> (ConversationState, String) {
        let credentials = match ServicePrincipalCredentials::parse(text) {
            Ok(credentials) => credentials,
            Err(error) => {
                tracing::debug!(event_name = "dialog.answer_rejected", error = %error);
                // Self-loop: the question stays pending and the prompt repeats.
                return (state, resolve::CREDENTIALS_PROMPT.to_string());
            }
        };

        // Credentials are cached as soon as they parse. A lookup failure
        // after this point does not discard them; the next attempt reuses
        // them without re-asking.
        state.credentials = Some(credentials.clone());
        state.pending_question = None;

        let reply = self.subscriptions_reply(&credentials).await;
        (state, reply)
    }

    async fn resolve_intent(
        &self,
        mut state: ConversationState,
        text: &str,
    ) -> (ConversationState, String) {
        let classification = match self.classifier.classify(text).await {
            Ok(classification) => classification,
            Err(error) => {
                tracing::warn!(event_name = "dialog.classify_failed", error = %error);
                return (state, resolve::UNRECOGNIZED_REPLY.to_string());
            }
        };

        match resolve(&classification, &state) {
            Action::Reply(reply) => (state, reply),
            Action::AskCredentials => {
                state.pending_question = Some(PendingQuestion::ServicePrincipalCredentials);
                (state, resolve::CREDENTIALS_PROMPT.to_string())
            }
            Action::LookupSubscriptions { credentials } => {
                let reply = self.subscriptions_reply(&credentials).await;
                (state, reply)
            }
            Action::LookupResourceGroups { credentials, subscription_id } => {
                let reply = self.resource_groups_reply(&credentials, &subscription_id).await;
                (state, reply)
            }
            Action::SetDefaultSubscription { subscription_id } => {
                let reply = resolve::default_subscription_reply(&subscription_id);
                state.default_subscription = Some(subscription_id);
                (state, reply)
            }
        }
    }

    async fn subscriptions_reply(&self, credentials: &ServicePrincipalCredentials) -> String {
        match self.directory.list_subscriptions(credentials).await {
            Ok(subscriptions) => render_subscriptions(&subscriptions),
            Err(error) => {
                tracing::warn!(event_name = "dialog.subscription_lookup_failed", error = %error);
                error.user_reply().to_string()
            }
        }
    }

    async fn resource_groups_reply(
        &self,
        credentials: &ServicePrincipalCredentials,
        subscription_id: &str,
    ) -> String {
        match self.directory.list_resource_groups(credentials, subscription_id).await {
            Ok(groups) => render_resource_groups(&groups),
            Err(error) => {
                tracing::warn!(event_name = "dialog.resource_group_lookup_failed", error = %error);
                error.user_reply().to_string()
            }
        }
    }
}
