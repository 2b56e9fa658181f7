//! Dialogflow REST client

use async_trait::async_trait;
use parley::ConnectorError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::DialogflowConfig;
use crate::credentials::TokenProvider;
use crate::wire::{DetectIntentRequest, DetectIntentResponse, ListKnowledgeBasesResponse};

/// Operations the connector needs from Dialogflow
///
/// [`DialogflowClient`] talks to the real service; tests substitute
/// an in-memory implementation.
#[async_trait]
pub trait DialogflowApi: Send + Sync {
    /// Send one query to a session
    async fn detect_intent(
        &self,
        session: &str,
        request: &DetectIntentRequest,
    ) -> Result<DetectIntentResponse, ConnectorError>;

    /// Full resource names of all knowledge bases in a project
    async fn list_knowledge_bases(&self, project_id: &str) -> Result<Vec<String>, ConnectorError>;
}

/// Dialogflow API client
pub struct DialogflowClient {
    client: Client,
    tokens: TokenProvider,
    base_url: String,
}

impl DialogflowClient {
    /// Create a client for the configured endpoint and API version
    pub fn new(config: &DialogflowConfig) -> Result<Self, ConnectorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("parley-connector-dialogflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConnectorError::Credentials(format!("Failed to build HTTP client: {e}")))?;

        let tokens = TokenProvider::new(client.clone(), &config.credentials)?;

        Ok(Self {
            client,
            tokens,
            base_url: format!("{}/{}", config.api_endpoint, config.api_version()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ConnectorError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ConnectorError::ExternalService(format!("Request failed: {e}")))?;

        read_json(response).await
    }
}

#[async_trait]
impl DialogflowApi for DialogflowClient {
    async fn detect_intent(
        &self,
        session: &str,
        request: &DetectIntentRequest,
    ) -> Result<DetectIntentResponse, ConnectorError> {
        let url = format!("{}/{}:detectIntent", self.base_url, session);
        debug!(session = %session, "Sending detectIntent request");

        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .inspect_err(|e| error!(error = %e, "detectIntent request failed"))
            .map_err(|e| ConnectorError::ExternalService(format!("Request failed: {e}")))?;

        read_json(response).await
    }

    async fn list_knowledge_bases(&self, project_id: &str) -> Result<Vec<String>, ConnectorError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        let url = format!("{}/projects/{}/knowledgeBases", self.base_url, project_id);

        loop {
            let page: ListKnowledgeBasesResponse = match &page_token {
                Some(token) => self.get_json(&url, &[("pageToken", token.as_str())]).await?,
                None => self.get_json(&url, &[]).await?,
            };
            names.extend(page.knowledge_bases.into_iter().map(|kb| kb.name));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(project_id = %project_id, count = names.len(), "Listed knowledge bases");
        Ok(names)
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ConnectorError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        return Err(map_http_error(status, &body));
    }

    response
        .json()
        .await
        .map_err(|e| ConnectorError::ExternalService(format!("Parse error: {e}")))
}

fn map_http_error(status: StatusCode, body: &str) -> ConnectorError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|err| err.get("message"))
                .and_then(|msg| msg.as_str())
                .map(|msg| msg.to_string())
        })
        .unwrap_or_else(|| body.to_string());

    ConnectorError::ExternalService(format!("API error ({}): {}", status.as_u16(), message))
}
