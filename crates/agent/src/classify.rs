use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use armbot_core::{Classification, ClassifyError, RankedIntent};

/// External natural-language classifier. Failures are never fatal: the
/// dialog machine treats any error here as an unrecognized intent.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifyError>;
}

/// Client for a LUIS-style classifier endpoint: app id, subscription key,
/// and the utterance travel as query parameters; the response carries ranked
/// intents plus extracted entities.
pub struct LuisClassifier {
    client: reqwest::Client,
    endpoint: String,
    app_id: String,
    subscription_key: SecretString,
}

impl LuisClassifier {
    pub fn new(
        endpoint: String,
        app_id: String,
        subscription_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ClassifyError::Transport(error.to_string()))?;

        Ok(Self { client, endpoint, app_id, subscription_key })
    }
}

#[async_trait]
impl IntentClassifier for LuisClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("id", self.app_id.as_str()),
                ("subscription-key", self.subscription_key.expose_secret()),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|error| ClassifyError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Status(status.as_u16()));
        }

        let body =
            response.text().await.map_err(|error| ClassifyError::Transport(error.to_string()))?;
        parse_classification(&body)
    }
}

pub fn parse_classification(body: &str) -> Result<Classification, ClassifyError> {
    serde_json::from_str(body).map_err(|error| ClassifyError::MalformedResponse(error.to_string()))
}

/// Table-driven classifier for tests and offline wiring: known utterances map
/// to canned classifications, anything else classifies as no intent at all.
#[derive(Default)]
pub struct StaticClassifier {
    responses: HashMap<String, Classification>,
}

impl StaticClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, text: &str, label: &str) -> Self {
        self.responses.insert(
            text.to_string(),
            Classification {
                intents: vec![RankedIntent { label: label.to_string(), score: 1.0 }],
                entities: Vec::new(),
            },
        );
        self
    }

    pub fn with_classification(mut self, text: &str, classification: Classification) -> Self {
        self.responses.insert(text.to_string(), classification);
        self
    }
}

#[async_trait]
impl IntentClassifier for StaticClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        Ok(self.responses.get(text).cloned().unwrap_or_default())
    }
}
