//! ChatConnector implementation for Dialogflow

use async_trait::async_trait;
use parley::{BotSink, Capabilities, ChatConnector, ConnectorError, UserMessage};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{DialogflowApi, DialogflowClient};
use crate::config::{DialogflowConfig, KnowledgeBaseScope, SET_DIALOGFLOW_CONTEXT};
use crate::context::{parse_context_updates, Context, ContextSet};
use crate::normalize::normalize_response;
use crate::request::{build_request, SessionState};

const SEND_ERROR: &str = "Cannot send message to dialogflow container";

/// State of an open conversation
#[derive(Debug)]
struct Session {
    path: String,
    contexts: ContextSet,
    knowledge_base_names: Vec<String>,
}

/// Dialogflow connector
///
/// Each instance drives a single conversation. Replies are handed to the
/// [`BotSink`] given at construction.
pub struct DialogflowConnector {
    caps: Capabilities,
    sink: Arc<dyn BotSink>,
    config: Option<DialogflowConfig>,
    api: Option<Arc<dyn DialogflowApi>>,
    session: Option<Session>,
}

impl DialogflowConnector {
    /// Create a connector from capabilities
    pub fn new(caps: Capabilities, sink: Arc<dyn BotSink>) -> Self {
        Self {
            caps,
            sink,
            config: None,
            api: None,
            session: None,
        }
    }

    /// Use the given API implementation instead of building a REST client
    pub fn with_api(mut self, api: Arc<dyn DialogflowApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Configuration resolved by `build`
    pub fn config(&self) -> Option<&DialogflowConfig> {
        self.config.as_ref()
    }

    /// Session resource path, while a session is open
    pub fn session_path(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.path.as_str())
    }

    /// Contexts that will be sent with the next turn
    pub fn active_contexts(&self) -> Option<&ContextSet> {
        self.session.as_ref().map(|s| &s.contexts)
    }

    fn api(&self) -> Result<Arc<dyn DialogflowApi>, ConnectorError> {
        self.api
            .clone()
            .ok_or_else(|| ConnectorError::Lifecycle("Connector is not built".into()))
    }

    async fn resolve_knowledge_bases(
        &self,
        config: &DialogflowConfig,
    ) -> Result<Vec<String>, ConnectorError> {
        match &config.knowledge_base {
            KnowledgeBaseScope::Disabled => Ok(Vec::new()),
            KnowledgeBaseScope::All => {
                let names = self
                    .api()?
                    .list_knowledge_bases(&config.project_id)
                    .await
                    .map_err(|e| e.context("Cannot list knowledge bases"))?;
                if names.is_empty() {
                    warn!(project_id = %config.project_id, "Knowledge base enabled but none found");
                }
                Ok(names)
            }
            KnowledgeBaseScope::Named(ids) => Ok(ids
                .iter()
                .map(|id| config.knowledge_base_name(id))
                .collect()),
        }
    }
}

#[async_trait]
impl ChatConnector for DialogflowConnector {
    fn name(&self) -> &str {
        "dialogflow"
    }

    fn validate(&self) -> Result<(), ConnectorError> {
        DialogflowConfig::from_capabilities(&self.caps).map(|_| ())
    }

    async fn build(&mut self) -> Result<(), ConnectorError> {
        let config = DialogflowConfig::from_capabilities(&self.caps)?;

        if self.api.is_none() {
            self.api = Some(Arc::new(DialogflowClient::new(&config)?));
        }
        debug!(
            project_id = %config.project_id,
            api_version = config.api_version(),
            "Dialogflow connector built"
        );
        self.config = Some(config);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), ConnectorError> {
        let config = self
            .config
            .clone()
            .ok_or_else(|| ConnectorError::Lifecycle("start called before build".into()))?;

        let session_id = Uuid::new_v4().to_string();
        let path = config.session_path(&session_id);
        let knowledge_base_names = self.resolve_knowledge_bases(&config).await?;
        let contexts: ContextSet = config.input_contexts.iter().cloned().collect();

        info!(
            session = %path,
            contexts = contexts.len(),
            knowledge_bases = knowledge_base_names.len(),
            "Dialogflow session started"
        );

        self.session = Some(Session {
            path,
            contexts,
            knowledge_base_names,
        });
        Ok(())
    }

    async fn user_says(&mut self, message: &mut UserMessage) -> Result<(), ConnectorError> {
        let api = self.api()?;
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| ConnectorError::Lifecycle("user_says called before build".into()))?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ConnectorError::Lifecycle("user_says called before start".into()))?;

        // Updates only become active once the turn succeeds
        let mut contexts = session.contexts.clone();
        if let Some(updates) = message.custom.get(SET_DIALOGFLOW_CONTEXT) {
            let updates = parse_context_updates(updates)?;
            debug!(count = updates.len(), "Applying context updates");
            contexts.merge(updates);
        }

        let request = build_request(
            config,
            SessionState {
                session_path: &session.path,
                contexts: &contexts,
                knowledge_base_names: &session.knowledge_base_names,
            },
            message,
        )?;
        message.source_data = serde_json::to_value(&request)
            .map_err(|e| ConnectorError::Validation(format!("Cannot encode request: {e}")))?;

        let response = api
            .detect_intent(&session.path, &request)
            .await
            .map_err(|e| match e {
                ConnectorError::ExternalService(_) => e.context(SEND_ERROR),
                other => ConnectorError::ExternalService(format!("{SEND_ERROR}: {other}")),
            })?;

        session.contexts = match &response.query_result {
            Some(result) => result
                .output_contexts
                .iter()
                .map(Context::from)
                .filter(|c| c.lifespan > 0)
                .collect(),
            None => contexts,
        };

        let messages = normalize_response(config, &response);
        debug!(
            response_id = %response.response_id,
            count = messages.len(),
            "Delivering bot messages"
        );
        for bot_message in messages {
            self.sink.queue_bot_says(bot_message);
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ConnectorError> {
        if let Some(session) = self.session.take() {
            debug!(session = %session.path, "Dialogflow session stopped");
        }
        Ok(())
    }

    async fn clean(&mut self) -> Result<(), ConnectorError> {
        self.session = None;
        self.api = None;
        self.config = None;
        Ok(())
    }
}
