use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use armbot_core::{LookupError, ServicePrincipalCredentials};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceGroup {
    pub name: String,
}

/// Remote enumeration boundary: send credentials (plus a subscription id for
/// resource groups), get a list back. No retries here; callers surface any
/// `LookupError` as reply text.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn list_subscriptions(
        &self,
        credentials: &ServicePrincipalCredentials,
    ) -> Result<Vec<Subscription>, LookupError>;

    async fn list_resource_groups(
        &self,
        credentials: &ServicePrincipalCredentials,
        subscription_id: &str,
    ) -> Result<Vec<ResourceGroup>, LookupError>;
}

/// Renders the subscription listing reply. An empty result set is the bare
/// header, not an error.
pub fn render_subscriptions(subscriptions: &[Subscription]) -> String {
    let mut lines = vec!["Your subscriptions:".to_string()];
    lines.extend(subscriptions.iter().map(|subscription| {
        format!(
            "SubscriptionId: {}, DisplayName: {}",
            subscription.id, subscription.display_name
        )
    }));
    lines.join("\n")
}

pub fn render_resource_groups(resource_groups: &[ResourceGroup]) -> String {
    let mut lines = vec!["Your resource groups:".to_string()];
    lines.extend(resource_groups.iter().map(|group| format!("Name: {}", group.name)));
    lines.join("\n")
}

#[derive(Debug, Deserialize)]
struct ValueEnvelope<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionRow {
    #[serde(rename = "subscriptionId")]
    subscription_id: String,
    #[serde(rename = "displayName", default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct ResourceGroupRow {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub(crate) fn parse_subscriptions(body: &str) -> Result<Vec<Subscription>, LookupError> {
    let envelope: ValueEnvelope<SubscriptionRow> = serde_json::from_str(body)
        .map_err(|error| LookupError::MalformedResponse(error.to_string()))?;

    Ok(envelope
        .value
        .into_iter()
        .map(|row| Subscription { id: row.subscription_id, display_name: row.display_name })
        .collect())
}

pub(crate) fn parse_resource_groups(body: &str) -> Result<Vec<ResourceGroup>, LookupError> {
    let envelope: ValueEnvelope<ResourceGroupRow> = serde_json::from_str(body)
        .map_err(|error| LookupError::MalformedResponse(error.to_string()))?;

    Ok(envelope.value.into_iter().map(|row| ResourceGroup { name: row.name }).collect())
}

fn status_error(status: reqwest::StatusCode) -> LookupError {
    if matches!(status.as_u16(), 400 | 401 | 403) {
        LookupError::Auth(format!("remote returned status {status}"))
    } else {
        LookupError::Transport(format!("remote returned status {status}"))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, LookupError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| LookupError::Transport(error.to_string()))
}

/// Backend that proxies enumeration through a thin REST facade. Credentials
/// travel as url-encoded query parameters and the proxy itself is guarded by
/// a static `Authorization` header value from config.
pub struct RestProxyDirectory {
    client: reqwest::Client,
    base_url: String,
    authorization: Option<SecretString>,
}

impl RestProxyDirectory {
    pub fn new(
        base_url: String,
        authorization: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization,
        })
    }

    async fn fetch(&self, operation: &str, query: &[(&str, &str)]) -> Result<String, LookupError> {
        let url = format!("{}/{operation}", self.base_url);

        let mut request = self.client.get(&url).query(query);
        if let Some(authorization) = &self.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| LookupError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        response.text().await.map_err(|error| LookupError::Transport(error.to_string()))
    }
}

#[async_trait]
impl ResourceDirectory for RestProxyDirectory {
    async fn list_subscriptions(
        &self,
        credentials: &ServicePrincipalCredentials,
    ) -> Result<Vec<Subscription>, LookupError> {
        let body = self
            .fetch(
                "GetSubscriptions",
                &[
                    ("clientId", credentials.client_id.as_str()),
                    ("clientSecret", credentials.client_secret.as_str()),
                    ("tenantId", credentials.tenant_id.as_str()),
                ],
            )
            .await?;

        parse_subscriptions(&body)
    }

    async fn list_resource_groups(
        &self,
        credentials: &ServicePrincipalCredentials,
        subscription_id: &str,
    ) -> Result<Vec<ResourceGroup>, LookupError> {
        let body = self
            .fetch(
                "GetResourceGroups",
                &[
                    ("clientId", credentials.client_id.as_str()),
                    ("clientSecret", credentials.client_secret.as_str()),
                    ("tenantId", credentials.tenant_id.as_str()),
                    ("subscriptionId", subscription_id),
                ],
            )
            .await?;

        parse_resource_groups(&body)
    }
}

const SUBSCRIPTIONS_API_VERSION: &str = "2020-01-01";
const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";

/// Backend that talks to the management API directly: a client-credentials
/// token request against the tenant authority, then bearer-authorized
/// enumeration calls.
pub struct ArmDirectory {
    client: reqwest::Client,
    authority_base_url: String,
    management_base_url: String,
}

impl ArmDirectory {
    pub fn new(
        authority_base_url: String,
        management_base_url: String,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        Ok(Self {
            client: build_client(timeout)?,
            authority_base_url: authority_base_url.trim_end_matches('/').to_string(),
            management_base_url: management_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn authorize(
        &self,
        credentials: &ServicePrincipalCredentials,
    ) -> Result<String, LookupError> {
        let url = format!("{}/{}/oauth2/token", self.authority_base_url, credentials.tenant_id);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("resource", self.management_base_url.as_str()),
            ])
            .send()
            .await
            .map_err(|error| LookupError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|error| LookupError::MalformedResponse(error.to_string()))?;

        Ok(token.access_token)
    }

    async fn fetch(&self, path: &str, api_version: &str, token: &str) -> Result<String, LookupError> {
        let url = format!("{}{path}", self.management_base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("api-version", api_version)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| LookupError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        response.text().await.map_err(|error| LookupError::Transport(error.to_string()))
    }
}

#[async_trait]
impl ResourceDirectory for ArmDirectory {
    async fn list_subscriptions(
        &self,
        credentials: &ServicePrincipalCredentials,
    ) -> Result<Vec<Subscription>, LookupError> {
        let token = self.authorize(credentials).await?;
        let body = self.fetch("/subscriptions", SUBSCRIPTIONS_API_VERSION, &token).await?;
        parse_subscriptions(&body)
    }

    async fn list_resource_groups(
        &self,
        credentials: &ServicePrincipalCredentials,
        subscription_id: &str,
    ) -> Result<Vec<ResourceGroup>, LookupError> {
        let token = self.authorize(credentials).await?;
        let body = self
            .fetch(
                &format!("/subscriptions/{subscription_id}/resourcegroups"),
                RESOURCE_GROUPS_API_VERSION,
                &token,
            )
            .await?;
        parse_resource_groups(&body)
    }
}

/// Fixed-catalog directory for tests and offline wiring.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    pub subscriptions: Vec<Subscription>,
    pub resource_groups: Vec<ResourceGroup>,
}

#[async_trait]
impl ResourceDirectory for StaticDirectory {
    async fn list_subscriptions(
        &self,
        _credentials: &ServicePrincipalCredentials,
    ) -> Result<Vec<Subscription>, LookupError> {
        Ok(self.subscriptions.clone())
    }

    async fn list_resource_groups(
        &self,
        _credentials: &ServicePrincipalCredentials,
        _subscription_id: &str,
    ) -> Result<Vec<ResourceGroup>, LookupError> {
        Ok(self.resource_groups.clone())
    }
}
