use crate::db::rows::ResultRow;
use crate::db::{ExecuteError, QueryRunner};
use crate::llm::{extract, prompt, CompletionBackend, InferenceError};
use crate::schema::SchemaDescriptor;
use crate::util::truncate_detail;
use serde::Serialize;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DETAIL_LIMIT: usize = 512;

/// Failure classification surfaced to callers. The web layer maps these to
/// HTTP statuses; the pipeline itself never returns anything rawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Configuration,
    Cancelled,
    Transport,
    Provider,
    Extraction,
    Execution,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Transport => "transport",
            ErrorKind::Provider => "provider",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Execution => "execution",
        };
        write!(f, "{}", name)
    }
}

/// Terminal outcome of one pipeline invocation. Success carries the
/// generated text (and rows when the statement ran); failure carries a
/// human-readable message and its kind. Execution failures keep the
/// generated text attached so the caller sees both what the model said and
/// why running it failed.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub query: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<ResultRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl PipelineResult {
    fn failure(query: &str, kind: ErrorKind, message: String) -> Self {
        Self {
            query: query.to_string(),
            succeeded: false,
            generated_text: None,
            rows: None,
            error: Some(message),
            error_kind: Some(kind),
        }
    }

    fn success(query: &str, generated_text: String, rows: Option<Vec<ResultRow>>) -> Self {
        Self {
            query: query.to_string(),
            succeeded: true,
            generated_text: Some(generated_text),
            rows,
            error: None,
            error_kind: None,
        }
    }
}

/// Orchestrates the translate-and-run pipeline: validate the question, build
/// the prompt, call the provider, extract the generated text, and execute it
/// when it looks like a query. A strictly linear machine; no stage is
/// revisited and cancellation at either suspension point ends the run.
pub struct Pipeline {
    schema: SchemaDescriptor,
    backend: Box<dyn CompletionBackend>,
    runner: Box<dyn QueryRunner>,
}

impl Pipeline {
    pub fn new(
        schema: SchemaDescriptor,
        backend: Box<dyn CompletionBackend>,
        runner: Box<dyn QueryRunner>,
    ) -> Self {
        Self {
            schema,
            backend,
            runner,
        }
    }

    pub async fn translate_and_run(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult {
        let question = query.trim();
        if question.is_empty() {
            return PipelineResult::failure(
                query,
                ErrorKind::Validation,
                "Please enter a search query.".to_string(),
            );
        }

        let messages = prompt::build_messages(self.schema.text(), question);

        let raw_body = match self.backend.complete(&messages, cancel).await {
            Ok(body) => body,
            Err(e) => return Self::inference_failure(query, e),
        };

        let generated = match extract::completion_content(&raw_body) {
            Ok(text) => text,
            Err(e) => {
                warn!("provider response failed extraction: {}", e);
                return PipelineResult::failure(
                    query,
                    ErrorKind::Extraction,
                    format!("Unexpected response from the language model: {}", e),
                );
            }
        };

        debug!("generated text: {}", generated);

        // Execution gate: only text carrying an uppercase SELECT token is
        // treated as a runnable statement; anything else (refusals, prose)
        // is returned as-is with no database call.
        if !generated.contains("SELECT") {
            info!("generated text carries no SELECT token; skipping execution");
            return PipelineResult::success(query, generated, None);
        }

        match self.runner.run(&generated, cancel).await {
            Ok(rows) => {
                info!("statement returned {} row(s)", rows.len());
                PipelineResult::success(query, generated, Some(rows))
            }
            Err(e) => {
                let kind = match &e {
                    ExecuteError::Cancelled => ErrorKind::Cancelled,
                    ExecuteError::Database(_) => ErrorKind::Execution,
                };
                warn!("execution failed ({}): {}", kind, e);
                let mut result = PipelineResult::failure(
                    query,
                    kind,
                    format!(
                        "The generated statement failed to run: {}",
                        truncate_detail(&e.to_string(), DETAIL_LIMIT)
                    ),
                );
                result.generated_text = Some(generated);
                result
            }
        }
    }

    fn inference_failure(query: &str, error: InferenceError) -> PipelineResult {
        let (kind, message) = match &error {
            InferenceError::Config(msg) => (
                ErrorKind::Configuration,
                format!("The language model service is not configured: {}", msg),
            ),
            InferenceError::Cancelled => (
                ErrorKind::Cancelled,
                "The request was cancelled before a translation arrived.".to_string(),
            ),
            InferenceError::Transport(msg) => (
                ErrorKind::Transport,
                format!(
                    "Could not reach the language model service: {}",
                    truncate_detail(msg, DETAIL_LIMIT)
                ),
            ),
            InferenceError::Provider { status, body } => (
                ErrorKind::Provider,
                format!(
                    "The language model service returned status {}: {}",
                    status,
                    truncate_detail(body, DETAIL_LIMIT)
                ),
            ),
        };
        PipelineResult::failure(query, kind, message)
    }
}
