use armbot_core::{Classification, ConversationState, IntentLabel, ServicePrincipalCredentials};

pub const GREET_REPLY: &str = "Hi there. How can I help you today?";
pub const THANKS_REPLY: &str = "My pleasure.";
pub const CREDENTIALS_PROMPT: &str = "Sure. Please enter your AD application client id, \
     service principal password and tenant id separated by commas.";
pub const MISSING_DEFAULT_SUBSCRIPTION_REPLY: &str = "Please set a default subscription.";
pub const UNRECOGNIZED_REPLY: &str = "I'm sorry. I did not understand you.";

pub fn default_subscription_reply(subscription_id: &str) -> String {
    format!("Subscription [{subscription_id}] is set as the default subscription.")
}

/// What the dialog should do for a classified utterance. Lookup variants
/// carry the credentials they were resolved against so the caller never has
/// to re-check state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Reply(String),
    AskCredentials,
    LookupSubscriptions { credentials: ServicePrincipalCredentials },
    LookupResourceGroups { credentials: ServicePrincipalCredentials, subscription_id: String },
    SetDefaultSubscription { subscription_id: String },
}

/// Maps the top-ranked intent and current state to an action. Pure; all I/O
/// stays with the caller.
pub fn resolve(classification: &Classification, state: &ConversationState) -> Action {
    match classification.top_intent() {
        IntentLabel::Greet => Action::Reply(GREET_REPLY.to_string()),
        IntentLabel::Thanks => Action::Reply(THANKS_REPLY.to_string()),
        IntentLabel::ListSubscriptions => match &state.credentials {
            Some(credentials) => Action::LookupSubscriptions { credentials: credentials.clone() },
            None => Action::AskCredentials,
        },
        IntentLabel::DefaultSubscription => match classification.first_entity_text() {
            // Entity text arrives with the tokenizer's inserted spaces; the
            // subscription id itself never contains any.
            Some(text) => Action::SetDefaultSubscription {
                subscription_id: text.replace(' ', ""),
            },
            None => Action::Reply(UNRECOGNIZED_REPLY.to_string()),
        },
        IntentLabel::ListResourceGroups => match (&state.credentials, &state.default_subscription) {
            (Some(credentials), Some(subscription_id)) => Action::LookupResourceGroups {
                credentials: credentials.clone(),
                subscription_id: subscription_id.clone(),
            },
            // Either prerequisite missing gets the same guided reply; the
            // credentials question is never opened from here.
            _ => Action::Reply(MISSING_DEFAULT_SUBSCRIPTION_REPLY.to_string()),
        },
        IntentLabel::Unrecognized => Action::Reply(UNRECOGNIZED_REPLY.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use armbot_core::{
        Classification, ConversationState, Entity, RankedIntent, ServicePrincipalCredentials,
    };

    use super::{
        default_subscription_reply, resolve, Action, GREET_REPLY,
        MISSING_DEFAULT_SUBSCRIPTION_REPLY, THANKS_REPLY, UNRECOGNIZED_REPLY,
    };

    fn classified(label: &str) -> Classification {
        Classification {
            intents: vec![RankedIntent { label: label.to_string(), score: 0.9 }],
            entities: Vec::new(),
        }
    }

    fn classified_with_entity(label: &str, entity_text: &str) -> Classification {
        Classification {
            intents: vec![RankedIntent { label: label.to_string(), score: 0.9 }],
            entities: vec![Entity {
                text: entity_text.to_string(),
                entity_type: "SubscriptionId".to_string(),
                score: 0.8,
            }],
        }
    }

    fn credentials() -> ServicePrincipalCredentials {
        ServicePrincipalCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            tenant_id: "tenant".to_string(),
        }
    }

    #[test]
    fn greet_and_thanks_reply_without_touching_state() {
        let state = ConversationState::default();

        assert_eq!(
            resolve(&classified("Greet"), &state),
            Action::Reply(GREET_REPLY.to_string())
        );
        assert_eq!(
            resolve(&classified("Thanks"), &state),
            Action::Reply(THANKS_REPLY.to_string())
        );
    }

    #[test]
    fn listing_subscriptions_without_credentials_asks_for_them() {
        let action = resolve(&classified("ListSubscriptions"), &ConversationState::default());
        assert_eq!(action, Action::AskCredentials);
    }

    #[test]
    fn listing_subscriptions_with_cached_credentials_looks_them_up() {
        let state = ConversationState { credentials: Some(credentials()), ..Default::default() };

        let action = resolve(&classified("ListSubscriptions"), &state);

        assert_eq!(action, Action::LookupSubscriptions { credentials: credentials() });
    }

    #[test]
    fn default_subscription_entity_is_stored_with_spaces_stripped() {
        let classification =
            classified_with_entity("DefaultSubscription", "abc - 123 - def");

        let action = resolve(&classification, &ConversationState::default());

        assert_eq!(
            action,
            Action::SetDefaultSubscription { subscription_id: "abc-123-def".to_string() }
        );
    }

    #[test]
    fn default_subscription_without_an_entity_reads_as_unrecognized() {
        let action =
            resolve(&classified("DefaultSubscription"), &ConversationState::default());

        assert_eq!(action, Action::Reply(UNRECOGNIZED_REPLY.to_string()));
    }

    #[test]
    fn listing_resource_groups_without_credentials_gets_the_guided_reply() {
        let action =
            resolve(&classified("ListResourceGroups"), &ConversationState::default());

        assert_eq!(action, Action::Reply(MISSING_DEFAULT_SUBSCRIPTION_REPLY.to_string()));
    }

    #[test]
    fn listing_resource_groups_without_a_default_subscription_prompts_for_one() {
        let state = ConversationState { credentials: Some(credentials()), ..Default::default() };

        let action = resolve(&classified("ListResourceGroups"), &state);

        assert_eq!(action, Action::Reply(MISSING_DEFAULT_SUBSCRIPTION_REPLY.to_string()));
    }

    #[test]
    fn listing_resource_groups_with_both_prerequisites_looks_them_up() {
        let state = ConversationState {
            credentials: Some(credentials()),
            default_subscription: Some("sub-1".to_string()),
            ..Default::default()
        };

        let action = resolve(&classified("ListResourceGroups"), &state);

        assert_eq!(
            action,
            Action::LookupResourceGroups {
                credentials: credentials(),
                subscription_id: "sub-1".to_string(),
            }
        );
    }

    #[test]
    fn empty_classification_resolves_to_the_unrecognized_reply() {
        let action = resolve(&Classification::default(), &ConversationState::default());
        assert_eq!(action, Action::Reply(UNRECOGNIZED_REPLY.to_string()));
    }

    #[test]
    fn default_subscription_confirmation_names_the_subscription() {
        assert_eq!(
            default_subscription_reply("sub-1"),
            "Subscription [sub-1] is set as the default subscription."
        );
    }
}
