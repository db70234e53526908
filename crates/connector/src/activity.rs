use serde::{Deserialize, Serialize};

use armbot_core::ConversationKey;

/// Wire-level activity kinds. Only `message` carries dialog content; the
/// rest are system events acknowledged without a reply. Unknown kinds
/// deserialize to `Unsupported` rather than failing the envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    #[serde(rename = "message")]
    Message,
    #[serde(rename = "deleteUserData")]
    DeleteUserData,
    #[serde(rename = "conversationUpdate")]
    ConversationUpdate,
    #[serde(rename = "contactRelationUpdate")]
    ContactRelationUpdate,
    #[serde(rename = "typing")]
    Typing,
    #[serde(rename = "ping")]
    Ping,
    #[serde(other)]
    Unsupported,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationAccount {
    pub id: String,
}

/// One structured message envelope, camelCase on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from: ChannelAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    pub conversation: ConversationAccount,
    pub channel_id: String,
    pub service_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

impl Activity {
    /// The state-store key for the conversation this activity belongs to.
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey {
            channel_id: self.channel_id.clone(),
            conversation_id: self.conversation.id.clone(),
            user_id: self.from.id.clone(),
        }
    }

    /// Builds the reply envelope for this activity: sender and recipient
    /// swap, conversation and callback address are echoed, and the reply
    /// references the inbound activity id.
    pub fn create_reply(&self, text: &str) -> Activity {
        Activity {
            activity_type: ActivityType::Message,
            id: None,
            from: self.recipient.clone().unwrap_or_default(),
            recipient: Some(self.from.clone()),
            conversation: self.conversation.clone(),
            channel_id: self.channel_id.clone(),
            service_url: self.service_url.clone(),
            text: Some(text.to_string()),
            reply_to_id: self.id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Activity, ActivityType};

    fn inbound_json(activity_type: &str) -> String {
        format!(
            r#"{{
                "type": "{activity_type}",
                "id": "act-1",
                "from": {{"id": "u-1", "name": "Pat"}},
                "recipient": {{"id": "bot-1", "name": "armbot"}},
                "conversation": {{"id": "c-1"}},
                "channelId": "webchat",
                "serviceUrl": "https://channel.example.test",
                "text": "hello"
            }}"#
        )
    }

    #[test]
    fn message_envelope_deserializes_from_camel_case_wire_form() {
        let activity: Activity =
            serde_json::from_str(&inbound_json("message")).expect("deserialize");

        assert_eq!(activity.activity_type, ActivityType::Message);
        assert_eq!(activity.channel_id, "webchat");
        assert_eq!(activity.service_url, "https://channel.example.test");
        assert_eq!(activity.text.as_deref(), Some("hello"));
        assert_eq!(activity.from.id, "u-1");
        assert_eq!(activity.conversation.id, "c-1");
    }

    #[test]
    fn system_event_types_map_to_their_variants() {
        for (wire, expected) in [
            ("deleteUserData", ActivityType::DeleteUserData),
            ("conversationUpdate", ActivityType::ConversationUpdate),
            ("contactRelationUpdate", ActivityType::ContactRelationUpdate),
            ("typing", ActivityType::Typing),
            ("ping", ActivityType::Ping),
        ] {
            let activity: Activity = serde_json::from_str(&inbound_json(wire)).expect(wire);
            assert_eq!(activity.activity_type, expected, "{wire}");
        }
    }

    #[test]
    fn unknown_activity_types_deserialize_as_unsupported() {
        let activity: Activity =
            serde_json::from_str(&inbound_json("messageReaction")).expect("deserialize");

        assert_eq!(activity.activity_type, ActivityType::Unsupported);
    }

    #[test]
    fn conversation_key_uses_channel_conversation_and_sender() {
        let activity: Activity =
            serde_json::from_str(&inbound_json("message")).expect("deserialize");
        let key = activity.conversation_key();

        assert_eq!(key.channel_id, "webchat");
        assert_eq!(key.conversation_id, "c-1");
        assert_eq!(key.user_id, "u-1");
    }

    #[test]
    fn create_reply_swaps_parties_and_references_the_inbound_activity() {
        let activity: Activity =
            serde_json::from_str(&inbound_json("message")).expect("deserialize");
        let reply = activity.create_reply("Hi there. How can I help you today?");

        assert_eq!(reply.activity_type, ActivityType::Message);
        assert_eq!(reply.from.id, "bot-1");
        assert_eq!(reply.recipient.as_ref().map(|account| account.id.as_str()), Some("u-1"));
        assert_eq!(reply.conversation.id, "c-1");
        assert_eq!(reply.service_url, "https://channel.example.test");
        assert_eq!(reply.text.as_deref(), Some("Hi there. How can I help you today?"));
        assert_eq!(reply.reply_to_id.as_deref(), Some("act-1"));
    }

    #[test]
    fn reply_serializes_with_camel_case_field_names() {
        let activity: Activity =
            serde_json::from_str(&inbound_json("message")).expect("deserialize");
        let reply = activity.create_reply("My pleasure.");

        let json = serde_json::to_value(&reply).expect("serialize");
        assert_eq!(json["type"], "message");
        assert_eq!(json["channelId"], "webchat");
        assert_eq!(json["serviceUrl"], "https://channel.example.test");
        assert_eq!(json["replyToId"], "act-1");
    }
}
