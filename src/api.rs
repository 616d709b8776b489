// src/api.rs
// Thin HTTP surface over the batch pipeline: input collection and result
// rendering only, no pipeline logic.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::config::PublisherConfig;
use crate::diagnostics;
use crate::error::BatchAbort;
use crate::pipeline::{BatchRequest, Publisher};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PublisherConfig>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/publish", post(publish))
        .route("/diagnostics", get(run_diagnostics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct PublishReq {
    #[serde(default = "default_query")]
    query: String,
    #[serde(default = "default_max_articles")]
    max_articles: u32,
    #[serde(default)]
    process_images: bool,
}

fn default_query() -> String {
    "technology".to_string()
}

fn default_max_articles() -> u32 {
    10
}

async fn publish(State(state): State<AppState>, Json(req): Json<PublishReq>) -> Json<Value> {
    let request = BatchRequest::new(req.query, req.max_articles, req.process_images);

    let publisher = match Publisher::from_config(&state.config) {
        Ok(p) => p,
        Err(abort) => return Json(aborted_body(&abort)),
    };

    match publisher.run(&request).await {
        Ok(result) => Json(json!(result)),
        Err(abort) => Json(aborted_body(&abort)),
    }
}

fn aborted_body(abort: &BatchAbort) -> Value {
    json!({
        "aborted": true,
        "reason": abort.to_string(),
        "trace": format!("{abort:?}"),
    })
}

async fn run_diagnostics(State(state): State<AppState>) -> Json<diagnostics::SetupReport> {
    Json(diagnostics::run_setup_probe(&state.config).await)
}
