use thiserror::Error;

use crate::protocol::ResponseEnvelope;

/// A command that the server answered with `code: "error"`.
#[derive(Debug, Clone, Error)]
#[error("command {command} failed: {message}")]
pub struct CommandFailure {
    pub command: String,
    pub message: String,
}

impl CommandFailure {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn from_envelope(command: impl Into<String>, envelope: &ResponseEnvelope) -> Self {
        Self::new(
            command,
            envelope
                .message
                .clone()
                .unwrap_or_else(|| "no message".to_string()),
        )
    }
}
