//! Intent-classification backend client
//!
//! Two operations over JSON: `process` classifies a command into an
//! [`ActionData`], `execute` applies a confirmed inventory movement.
//! A non-2xx transport result is distinct from an application-level
//! `{error: true}` body: the first means the server is unreachable,
//! the second carries a server-supplied message.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::intent::ActionData;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection-level failure (I/O, non-2xx status, bad body)
    #[error("connection failure: {0}")]
    Transport(String),
    /// The server answered but reported an application error
    #[error("{0}")]
    Server(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

/// Result of a successful execute call
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    pub message: String,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Classify a sanitized command into an action.
    async fn process(&self, command: &str) -> Result<ActionData, BackendError>;

    /// Apply a confirmed movement.
    async fn execute(&self, action: &ActionData) -> Result<ExecuteOutcome, BackendError>;
}

#[derive(Deserialize)]
struct ProcessReply {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: String,
    #[serde(flatten)]
    action: ActionData,
}

#[derive(Deserialize)]
struct ExecuteReply {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: String,
}

/// HTTP implementation against the inventory service.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn process(&self, command: &str) -> Result<ActionData, BackendError> {
        let response = self
            .client
            .post(self.url("/voice/process"))
            .json(&json!({ "command": command }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Transport(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let reply: ProcessReply = response.json().await?;
        if reply.error {
            return Err(BackendError::Server(reply.message));
        }
        Ok(reply.action)
    }

    async fn execute(&self, action: &ActionData) -> Result<ExecuteOutcome, BackendError> {
        let response = self
            .client
            .post(self.url("/voice/execute"))
            .json(&json!({ "action_data": action }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Transport(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let reply: ExecuteReply = response.json().await?;
        if reply.error {
            return Err(BackendError::Server(reply.message));
        }
        Ok(ExecuteOutcome {
            message: reply.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    #[test]
    fn test_process_reply_separates_error_flag() {
        let ok: ProcessReply = serde_json::from_str(
            r#"{"intencion": "BUSCAR_PRODUCTO", "mensaje": "hecho", "confianza": 0.7}"#,
        )
        .unwrap();
        assert!(!ok.error);
        assert_eq!(ok.action.intencion, Intent::BuscarProducto);

        let err: ProcessReply =
            serde_json::from_str(r#"{"error": true, "message": "comando vacío"}"#).unwrap();
        assert!(err.error);
        assert_eq!(err.message, "comando vacío");
    }

    #[test]
    fn test_base_url_normalization() {
        let backend = HttpBackend::new("http://localhost:5000/");
        assert_eq!(
            backend.url("/voice/process"),
            "http://localhost:5000/voice/process"
        );
    }
}
