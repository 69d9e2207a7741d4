//! V2 / open inference protocol REST adapter
//!
//! Tensors arrive named, typed, and shaped, so decode is a direct mapping
//! onto the canonical representation. The namespace also exposes server
//! metadata and the V2 health probes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use common::error::{Error, Result};
use common::infer::{InferRequest, InferResponse, InferTensor, ProtocolVersion, TensorDataType};
use dataplane::Dataplane;

use crate::error::ApiError;
use crate::router::headers_to_map;

/// V2 wire tensor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2Tensor {
    /// Tensor name
    pub name: String,

    /// Tensor shape
    pub shape: Vec<i64>,

    /// Logical datatype
    pub datatype: TensorDataType,

    /// Row-major payload
    pub data: Vec<Value>,
}

/// V2 inference request body
#[derive(Debug, Deserialize)]
struct V2RequestBody {
    id: Option<String>,
    parameters: Option<HashMap<String, Value>>,
    inputs: Option<Vec<V2Tensor>>,
}

/// V2 inference response body
#[derive(Debug, Serialize)]
struct V2ResponseBody {
    model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    parameters: HashMap<String, Value>,
    outputs: Vec<V2Tensor>,
}

/// Decodes a V2 request body into the canonical representation
pub fn decode_request(model_name: &str, body: &[u8]) -> Result<InferRequest> {
    let payload: V2RequestBody = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("Unrecognized request format: {}", e)))?;

    let inputs = payload
        .inputs
        .ok_or_else(|| Error::InvalidInput("Expected \"inputs\" to be present".to_string()))?;

    if inputs.is_empty() {
        return Err(Error::InvalidInput(
            "Expected at least one input tensor".to_string(),
        ));
    }

    let tensors = inputs
        .into_iter()
        .map(|tensor| InferTensor::new(tensor.name, tensor.datatype, tensor.shape, tensor.data))
        .collect();

    let mut request = InferRequest::new(model_name, tensors, ProtocolVersion::V2);
    request.id = payload.id;
    if let Some(parameters) = payload.parameters {
        request.parameters.extra = parameters;
    }

    Ok(request)
}

/// Encodes a canonical response as a V2 response body
pub fn encode_response(response: &InferResponse) -> Value {
    let outputs = response
        .outputs
        .iter()
        .map(|tensor| V2Tensor {
            name: tensor.name.clone(),
            shape: tensor.shape.clone(),
            datatype: tensor.datatype,
            data: tensor.data.clone(),
        })
        .collect();

    let body = V2ResponseBody {
        model_name: response.model_name.clone(),
        id: response.id.clone(),
        parameters: response.parameters.clone(),
        outputs,
    };

    // V2ResponseBody contains only JSON-representable fields
    serde_json::to_value(body).unwrap_or_else(|_| json!({}))
}

/// V2 route namespace
pub fn routes() -> Router<Arc<Dataplane>> {
    Router::new()
        .route("/v2", get(server_metadata))
        .route("/v2/health/live", get(health_live))
        .route("/v2/health/ready", get(health_ready))
        .route("/v2/models/:name", get(model_metadata))
        .route("/v2/models/:name/ready", get(model_ready))
        .route("/v2/models/:name/infer", post(infer))
}

/// `GET /v2`
async fn server_metadata(State(dataplane): State<Arc<Dataplane>>) -> Json<Value> {
    let metadata = dataplane.metadata();
    Json(json!({
        "name": metadata.name,
        "version": metadata.version,
        "extensions": metadata.extensions,
    }))
}

/// `GET /v2/health/live`
async fn health_live(State(dataplane): State<Arc<Dataplane>>) -> Json<Value> {
    let live = dataplane.live().status == "alive";
    Json(json!({ "live": live }))
}

/// `GET /v2/health/ready`
async fn health_ready(State(dataplane): State<Arc<Dataplane>>) -> Json<Value> {
    Json(json!({ "ready": dataplane.ready() }))
}

/// `GET /v2/models/{name}`
async fn model_metadata(
    State(dataplane): State<Arc<Dataplane>>,
    Path(name): Path<String>,
) -> std::result::Result<Json<common::infer::ModelMetadata>, ApiError> {
    Ok(Json(dataplane.model_metadata(&name)?))
}

/// `GET /v2/models/{name}/ready`
async fn model_ready(
    State(dataplane): State<Arc<Dataplane>>,
    Path(name): Path<String>,
) -> std::result::Result<Json<Value>, ApiError> {
    let ready = dataplane.model_ready(&name)?;
    Ok(Json(json!({ "name": name, "ready": ready })))
}

/// `POST /v2/models/{name}/infer`
async fn infer(
    State(dataplane): State<Arc<Dataplane>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let request = decode_request(&name, &body)?;
    let header_map = headers_to_map(&headers);

    let response = dataplane.infer(&name, request, &header_map).await?;

    Ok(Json(encode_response(&response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_requires_inputs() {
        let err = decode_request("m", br#"{"id": "1"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = decode_request("m", br#"{"inputs": []}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_decode_typed_tensor() {
        let body = br#"{
            "id": "req-1",
            "inputs": [
                {"name": "input0", "shape": [2, 2], "datatype": "INT32", "data": [1, 2, 3, 4]}
            ]
        }"#;

        let request = decode_request("m", body).unwrap();
        assert_eq!(request.id.as_deref(), Some("req-1"));
        assert_eq!(request.protocol, ProtocolVersion::V2);

        let tensor = request.input("input0").unwrap();
        assert_eq!(tensor.datatype, TensorDataType::Int32);
        assert_eq!(tensor.shape, vec![2, 2]);
        assert_eq!(tensor.data.len(), 4);
    }

    #[test]
    fn test_encode_round_trip() {
        let mut response = InferResponse::new(
            "m",
            vec![InferTensor::new(
                "output0",
                TensorDataType::Fp32,
                vec![2],
                vec![json!(0.5), json!(1.5)],
            )],
        );
        response.id = Some("req-1".to_string());

        let encoded = encode_response(&response);
        assert_eq!(encoded["model_name"], "m");
        assert_eq!(encoded["id"], "req-1");
        assert_eq!(encoded["outputs"][0]["datatype"], "FP32");
        assert_eq!(encoded["outputs"][0]["data"], json!([0.5, 1.5]));
    }
}
