pub mod client;
pub mod extract;
pub mod prompt;

use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use tokio_util::sync::CancellationToken;

use prompt::ChatMessage;

/// Classified outcome of a single inference attempt. Each variant crosses
/// the component boundary as-is; nothing rawer ever does.
#[derive(Debug)]
pub enum InferenceError {
    /// No credential configured; raised before any network I/O.
    Config(String),
    /// The caller's cancellation signal fired before or during the call.
    Cancelled,
    /// Transport-level fault reaching the provider (DNS, TLS, reset, timeout).
    Transport(String),
    /// Non-success HTTP status from the provider; body kept for diagnostics.
    Provider { status: u16, body: String },
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::Config(msg) => write!(f, "inference configuration error: {}", msg),
            InferenceError::Cancelled => write!(f, "inference call cancelled"),
            InferenceError::Transport(msg) => write!(f, "inference transport error: {}", msg),
            InferenceError::Provider { status, body } => {
                write!(f, "provider responded with status {}: {}", status, body)
            }
        }
    }
}

impl Error for InferenceError {}

/// Seam between the pipeline and the chat-completion provider. A single
/// attempt per call: retry policy, if any, belongs to the caller.
///
/// Success carries the provider's raw response body; envelope parsing is the
/// extractor's job, so shape drift fails closed there instead of here.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError>;
}
