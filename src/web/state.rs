use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use minijinja::Environment;
use tokio_util::sync::CancellationToken;

/// Shared application state for the web server.
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Pipeline,
    pub template_env: Environment<'static>,
    pub schema_text: String,
    pub startup_time: chrono::DateTime<chrono::Utc>,
    /// Root token cancelled on shutdown; requests derive child tokens so an
    /// in-flight pipeline stops at its next suspension point.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Pipeline, schema_text: String) -> Self {
        Self {
            config,
            pipeline,
            template_env: crate::web::templates::init_templates(),
            schema_text,
            startup_time: chrono::Utc::now(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
