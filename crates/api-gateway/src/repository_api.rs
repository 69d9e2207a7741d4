//! Repository administration adapter
//!
//! Load/unload endpoints in the model-repository-extension style:
//! `POST /v2/repository/models/{name}/load` and `/unload`, answering
//! `{name, load|unload: bool}` with 404 for unknown names and 503 for load
//! failures. Like every adapter, these only call dataplane operations.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use dataplane::Dataplane;

use crate::error::ApiError;

/// Repository admin route namespace
pub fn routes() -> Router<Arc<Dataplane>> {
    Router::new()
        .route("/v2/repository/models/:name/load", post(load_model))
        .route("/v2/repository/models/:name/unload", post(unload_model))
}

/// `POST /v2/repository/models/{name}/load`
async fn load_model(
    State(dataplane): State<Arc<Dataplane>>,
    Path(name): Path<String>,
) -> std::result::Result<Json<Value>, ApiError> {
    dataplane.load_model(&name).await?;
    Ok(Json(json!({ "name": name, "load": true })))
}

/// `POST /v2/repository/models/{name}/unload`
async fn unload_model(
    State(dataplane): State<Arc<Dataplane>>,
    Path(name): Path<String>,
) -> std::result::Result<Json<Value>, ApiError> {
    dataplane.unload_model(&name).await?;
    Ok(Json(json!({ "name": name, "unload": true })))
}
