use axum::{
    extract::State,
    response::{Html, IntoResponse},
    Form,
};
use minijinja::value::Value;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;
use crate::web::templates::render_template;

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    pub query: String,
}

// Main UI entry point: the search form
pub async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(render_template(
        &state.template_env,
        "index.html",
        HashMap::new(),
    ))
}

// Form-post search: run the pipeline and re-render the page with the outcome
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SearchForm>,
) -> impl IntoResponse {
    debug!("ui search: {}", form.query);

    let token = state.request_token();
    let result = state.pipeline.translate_and_run(&form.query, &token).await;

    let mut context = HashMap::new();
    context.insert("query", Value::from(result.query.clone()));
    context.insert("result", Value::from_serialize(&result));

    Html(render_template(&state.template_env, "index.html", context))
}
