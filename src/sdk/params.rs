use serde::{Deserialize, Serialize};
use tracing::error;

use super::api::{ProtocolError, ProtocolResult, DEFAULT_MAX_MSG_LEN};

/// Per-session configuration.
///
/// Every field has a default so partial configs deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParams {
    /// Label attached to every log line and abort report of the session.
    pub task: String,
    /// Worker threads available to concurrent proof verification.
    pub concurrency: usize,
    pub max_msg_len: usize,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            task: "keygen".to_owned(),
            concurrency: std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1),
            max_msg_len: DEFAULT_MAX_MSG_LEN,
        }
    }
}

impl SessionParams {
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
    pub fn with_max_msg_len(mut self, max_msg_len: usize) -> Self {
        self.max_msg_len = max_msg_len;
        self
    }

    pub fn validate(&self) -> ProtocolResult<()> {
        if self.task.is_empty() {
            error!("session task name must not be empty");
            return Err(ProtocolError::Fatal);
        }
        if self.concurrency == 0 {
            error!("session concurrency must be positive");
            return Err(ProtocolError::Fatal);
        }
        if self.max_msg_len == 0 {
            error!("max message length must be positive");
            return Err(ProtocolError::Fatal);
        }
        Ok(())
    }
}
