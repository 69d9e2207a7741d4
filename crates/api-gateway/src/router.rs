//! Router assembly
//!
//! Merges every adapter's route namespace into one router over a single
//! shared dataplane. Adding a protocol means adding a merge here; the
//! dataplane and repository contracts stay untouched.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use dataplane::{Dataplane, ServerLive};

use crate::{openai, repository_api, v1, v2};

/// Converts wire headers into the dataplane's plain string map
pub(crate) fn headers_to_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_lowercase(), value.to_string()))
        })
        .collect()
}

/// `GET /` — server liveness probe
async fn live(State(dataplane): State<Arc<Dataplane>>) -> Json<ServerLive> {
    Json(dataplane.live())
}

/// Builds the complete protocol surface over one shared dataplane
pub fn build_router(dataplane: Arc<Dataplane>) -> Router {
    Router::new()
        .route("/", get(live))
        .merge(v1::routes())
        .merge(v2::routes())
        .merge(openai::routes())
        .merge(repository_api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(dataplane)
}
