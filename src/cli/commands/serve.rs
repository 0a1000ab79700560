//! Browser form and JSON API server.
//!
//! Every submission re-runs the whole pipeline: load, split, embed, answer.

use super::{connect, load_prompts};
use crate::chain::{variables, LlmChain, PromptTemplate};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::ChainlabError;
use crate::gateway::Gateway;
use crate::llm::{init_llm, InitOptions};
use crate::rag::{VideoAnswer, VideoAssistant};
use crate::web::{
    error_banners, render_assistant_page, render_basics_page, AssistantForm, AssistantPage, TOPICS,
};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state.
struct AppState {
    gateway: Arc<Gateway>,
    settings: Settings,
}

/// Run the web server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let gateway = connect(&settings, Operation::Gateway)?;

    let state = Arc::new(AppState { gateway, settings });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(assistant_page).post(assistant_submit))
        .route("/basics", get(basics_page).post(basics_submit))
        .route("/health", get(health))
        .route("/api/ask", axum::routing::post(api_ask))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("chainlab server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("YouTube Assistant", "GET/POST /");
    Output::kv("Basics", "GET/POST /basics");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask (JSON)", "POST /api/ask");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct TopicForm {
    #[serde(default)]
    topic: String,
}

#[derive(Deserialize)]
struct AskRequest {
    url: String,
    question: String,
    #[serde(default)]
    k: Option<usize>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP status for a failed question.
fn status_for(error: &ChainlabError) -> StatusCode {
    match error {
        ChainlabError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ChainlabError::VideoNotFound(_) | ChainlabError::EmptyTranscript(_) => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn answer(
    state: &AppState,
    url: &str,
    question: &str,
    k: usize,
) -> crate::Result<VideoAnswer> {
    let assistant = VideoAssistant::from_settings(&state.settings, state.gateway.clone()).await?;
    assistant.ask(url, question, k).await
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn assistant_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_assistant_page(
        &AssistantPage::default(),
        state.settings.server.max_input_chars,
    ))
}

async fn assistant_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AssistantForm>,
) -> Html<String> {
    let max_chars = state.settings.server.max_input_chars;
    let form = form.normalized(max_chars);
    let mut page = AssistantPage {
        banners: form.missing_field_warnings(),
        ..Default::default()
    };

    if page.banners.is_empty() {
        info!("Answering '{}' for {}", form.query, form.youtube_url);
        match answer(&state, &form.youtube_url, &form.query, state.settings.retrieval.k).await {
            Ok(result) => page.answer = Some(result),
            Err(e) => {
                error!("Request failed: {}", e);
                page.banners = error_banners(&e.to_string());
            }
        }
    }

    page.form = form;
    Html(render_assistant_page(&page, max_chars))
}

async fn basics_page() -> Html<String> {
    Html(render_basics_page(TOPICS[0], None))
}

async fn basics_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TopicForm>,
) -> Html<String> {
    if !TOPICS.contains(&form.topic.as_str()) {
        return Html(render_basics_page(TOPICS[0], None));
    }

    let text = match step_by_step(&state, &form.topic).await {
        Ok(text) => text,
        Err(e) => {
            error!("Chain failed: {}", e);
            e.to_string()
        }
    };
    Html(render_basics_page(&form.topic, Some(&text)))
}

async fn step_by_step(state: &AppState, topic: &str) -> anyhow::Result<String> {
    let prompts = load_prompts(&state.settings)?;
    let prompt = PromptTemplate::new(prompts.chains.step_by_step.clone())
        .with_partials(&prompts.variables);
    let model = init_llm(
        state.gateway.clone(),
        &state.settings.llm.model,
        InitOptions::from_settings(&state.settings)?,
    )
    .await?;

    let response = LlmChain::new(prompt, Arc::new(model))
        .invoke_or_degrade(&variables([("query", topic)]))
        .await;
    Ok(response.text)
}

async fn api_ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    let k = req.k.unwrap_or(state.settings.retrieval.k);
    match answer(&state, &req.url, &req.question, k).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => (
            status_for(&e),
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for() {
        assert_eq!(
            status_for(&ChainlabError::InvalidInput("bad url".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ChainlabError::VideoNotFound("abc".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ChainlabError::EmptyTranscript("abc".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ChainlabError::Gateway("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
