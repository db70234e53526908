use serde::{Deserialize, Serialize};

/// Ranked classifier output for a single utterance. Transient: produced and
/// consumed within one request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub intents: Vec<RankedIntent>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedIntent {
    #[serde(rename = "intent")]
    pub label: String,
    #[serde(default)]
    pub score: f32,
}

/// A substring of the utterance tagged with a semantic type by the classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "entity")]
    pub text: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub score: f32,
}

/// Closed set of intents the dialog machine acts on. Labels outside this set,
/// and classifications with no ranked intents at all, route to `Unrecognized`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentLabel {
    Greet,
    Thanks,
    ListSubscriptions,
    DefaultSubscription,
    ListResourceGroups,
    Unrecognized,
}

impl IntentLabel {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Greet" => Self::Greet,
            "Thanks" => Self::Thanks,
            "ListSubscriptions" => Self::ListSubscriptions,
            "DefaultSubscription" => Self::DefaultSubscription,
            "ListResourceGroups" => Self::ListResourceGroups,
            _ => Self::Unrecognized,
        }
    }
}

impl Classification {
    /// The top-ranked intent label. No confidence threshold is applied beyond
    /// trusting the ranking as-is.
    pub fn top_intent(&self) -> IntentLabel {
        self.intents
            .first()
            .map(|intent| IntentLabel::from_label(&intent.label))
            .unwrap_or(IntentLabel::Unrecognized)
    }

    /// First extracted entity, consulted positionally when an action needs one.
    pub fn first_entity_text(&self) -> Option<&str> {
        self.entities.first().map(|entity| entity.text.as_str())
    }
}
