//! Thin llama-stack REST client.
//!
//! Just enough surface for the demo: register the MCP toolgroup, create an
//! agent and a session, and stream turn events. Everything else — tool
//! selection, conversation state, retries, inference — belongs to the stack.

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Stack service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Event stream error: {0}")]
    Stream(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StackError>;

/// Agent configuration sent at creation time.
#[derive(Debug, Clone, Serialize)]
pub struct AgentConfig {
    pub model: String,
    pub instructions: String,
    pub toolgroups: Vec<String>,
}

/// One streamed chunk of a turn. The payload shape varies by event type;
/// only text deltas are modeled, the rest deserialize with `delta: None`.
#[derive(Debug, Deserialize)]
pub struct TurnChunk {
    #[serde(default)]
    pub event: Option<TurnEvent>,
}

#[derive(Debug, Deserialize)]
pub struct TurnEvent {
    pub payload: TurnPayload,
}

#[derive(Debug, Deserialize)]
pub struct TurnPayload {
    pub event_type: String,
    #[serde(default)]
    pub delta: Option<TurnDelta>,
}

#[derive(Debug, Deserialize)]
pub struct TurnDelta {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl TurnChunk {
    /// Text carried by this chunk, if it is a text delta.
    pub fn delta_text(&self) -> Option<&str> {
        self.event.as_ref()?.payload.delta.as_ref()?.text.as_deref()
    }
}

/// Client for a llama-stack server.
#[derive(Debug, Clone)]
pub struct LlamaStackClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LlamaStackClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self { http: reqwest::Client::new(), base_url: Url::parse(base_url)? })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(StackError::Service { status, message })
    }

    /// Register a remote MCP toolgroup with the stack.
    pub async fn register_toolgroup(
        &self,
        toolgroup_id: &str,
        provider_id: &str,
        mcp_uri: &str,
    ) -> Result<()> {
        let url = self.base_url.join("v1/toolgroups")?;
        let body = json!({
            "toolgroup_id": toolgroup_id,
            "provider_id": provider_id,
            "mcp_endpoint": {"uri": mcp_uri},
        });
        let response = self.http.post(url).json(&body).send().await?;
        Self::check(response).await?;
        info!(toolgroup_id, mcp_uri, "registered toolgroup");
        Ok(())
    }

    pub async fn create_agent(&self, config: &AgentConfig) -> Result<String> {
        #[derive(Deserialize)]
        struct AgentCreated {
            agent_id: String,
        }

        let url = self.base_url.join("v1/agents")?;
        let response = self.http.post(url).json(&json!({"agent_config": config})).send().await?;
        let created: AgentCreated = Self::check(response).await?.json().await?;
        info!(agent_id = %created.agent_id, model = %config.model, "created agent");
        Ok(created.agent_id)
    }

    pub async fn create_session(&self, agent_id: &str, session_name: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct SessionCreated {
            session_id: String,
        }

        let url = self.base_url.join(&format!("v1/agents/{agent_id}/session"))?;
        let response =
            self.http.post(url).json(&json!({"session_name": session_name})).send().await?;
        let created: SessionCreated = Self::check(response).await?.json().await?;
        Ok(created.session_id)
    }

    /// Send a user message and stream the turn's events.
    pub async fn create_turn(
        &self,
        agent_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<impl Stream<Item = Result<TurnChunk>> + Unpin> {
        let url =
            self.base_url.join(&format!("v1/agents/{agent_id}/session/{session_id}/turn"))?;
        let body = json!({
            "messages": [{"role": "user", "content": message}],
            "stream": true,
        });
        let response = self.http.post(url).json(&body).send().await?;
        let response = Self::check(response).await?;

        let stream = response.bytes_stream().eventsource().map(|event| match event {
            Ok(event) => serde_json::from_str::<TurnChunk>(&event.data).map_err(StackError::from),
            Err(e) => Err(StackError::Stream(e.to_string())),
        });
        Ok(Box::pin(stream))
    }
}
