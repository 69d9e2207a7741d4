//! V1 REST protocol adapter
//!
//! Legacy JSON protocol: `POST /v1/models/{name}:predict` and `:explain`
//! with an `instances` array, `GET /v1/models` for the model list, and
//! `GET /v1/models/{name}` for readiness. The wire payload is untyped, so
//! the decoder infers a logical datatype from the first instance.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::{json, Value};

use common::error::{Error, Result};
use common::infer::{InferRequest, InferResponse, InferTensor, ProtocolVersion, TensorDataType};
use dataplane::Dataplane;

use crate::error::ApiError;
use crate::router::headers_to_map;

/// Decodes a V1 request body into the canonical representation. Fails with
/// `InvalidInput` before the dataplane is ever invoked.
pub fn decode_request(model_name: &str, body: &[u8]) -> Result<InferRequest> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("Unrecognized request format: {}", e)))?;

    let instances = payload
        .get("instances")
        .ok_or_else(|| Error::InvalidInput("Expected \"instances\" to be present".to_string()))?;

    let rows = instances
        .as_array()
        .ok_or_else(|| Error::InvalidInput("Expected \"instances\" to be a list".to_string()))?;

    let tensor = InferTensor::new(
        "instances",
        TensorDataType::of_value(instances),
        vec![rows.len() as i64],
        rows.clone(),
    );

    Ok(InferRequest::new(
        model_name,
        vec![tensor],
        ProtocolVersion::V1,
    ))
}

/// Encodes a canonical response as a V1 `predictions` body
pub fn encode_response(response: &InferResponse) -> Value {
    let predictions = response
        .outputs
        .first()
        .map(|tensor| Value::Array(tensor.data.clone()))
        .unwrap_or_else(|| Value::Array(Vec::new()));

    json!({ "predictions": predictions })
}

/// V1 route namespace
pub fn routes() -> Router<Arc<Dataplane>> {
    Router::new()
        .route("/v1/models", get(list_models))
        .route("/v1/models/:name", get(model_ready).post(model_call))
}

/// `GET /v1/models`
async fn list_models(State(dataplane): State<Arc<Dataplane>>) -> Json<Value> {
    Json(json!({ "models": dataplane.list_models() }))
}

/// `GET /v1/models/{name}`
async fn model_ready(
    State(dataplane): State<Arc<Dataplane>>,
    Path(name): Path<String>,
) -> std::result::Result<Json<Value>, ApiError> {
    let ready = dataplane.model_ready(&name)?;
    Ok(Json(json!({ "name": name, "ready": ready })))
}

/// `POST /v1/models/{name}:predict` and `POST /v1/models/{name}:explain`.
/// The verb arrives inside the final path segment.
async fn model_call(
    State(dataplane): State<Arc<Dataplane>>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let (name, verb) = segment.split_once(':').ok_or_else(|| {
        ApiError(Error::InvalidInput(
            "Expected a :predict or :explain suffix".to_string(),
        ))
    })?;

    let request = decode_request(name, &body)?;
    let header_map = headers_to_map(&headers);

    let response = match verb {
        "predict" => dataplane.infer(name, request, &header_map).await?,
        "explain" => dataplane.explain(name, request, &header_map).await?,
        other => {
            return Err(ApiError(Error::InvalidInput(format!(
                "Unknown verb: {}",
                other
            ))))
        }
    };

    Ok(Json(encode_response(&response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_requires_instances() {
        let err = decode_request("m", br#"{"inputs": []}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = decode_request("m", br#"{"instances": 42}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = decode_request("m", b"not json").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_decode_builds_canonical_tensor() {
        let request = decode_request("m", br#"{"instances": [[1, 2], [3, 4]]}"#).unwrap();
        assert_eq!(request.model_name, "m");
        assert_eq!(request.protocol, ProtocolVersion::V1);

        let tensor = request.input("instances").unwrap();
        assert_eq!(tensor.shape, vec![2]);
        assert_eq!(tensor.datatype, TensorDataType::Int64);
        assert_eq!(tensor.data[1], json!([3, 4]));
    }

    #[test]
    fn test_round_trip_preserves_numeric_values() {
        // Encoding a canonical response and decoding a matching request
        // must agree on the JSON values, with no precision loss.
        let rows = vec![json!([1.5, -2]), json!([3.25, 4])];
        let response = InferResponse::new(
            "m",
            vec![InferTensor::new(
                "predictions",
                TensorDataType::Fp64,
                vec![2],
                rows.clone(),
            )],
        );

        let encoded = encode_response(&response);
        assert_eq!(encoded["predictions"], Value::Array(rows.clone()));

        let wire_request = json!({ "instances": encoded["predictions"] });
        let decoded = decode_request("m", wire_request.to_string().as_bytes()).unwrap();
        assert_eq!(decoded.input("instances").unwrap().data, rows);
    }

    #[test]
    fn test_encode_empty_response() {
        let response = InferResponse::new("m", Vec::new());
        assert_eq!(encode_response(&response), json!({ "predictions": [] }));
    }
}
