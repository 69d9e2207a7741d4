//! OpenAI-compatible protocol adapter
//!
//! Non-streaming `chat/completions` and `completions` surfaces for
//! generative models, layered on the same dataplane as the V1/V2 adapters.
//! Messages are carried to the model as a BYTES tensor; the first element
//! of the model's first output tensor becomes the generated text.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use common::error::{Error, Result};
use common::infer::{InferRequest, InferResponse, InferTensor, ProtocolVersion, TensorDataType};
use dataplane::Dataplane;

use crate::error::ApiError;
use crate::router::headers_to_map;

/// A chat message on the wire
#[derive(Debug, Clone, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// `POST /openai/v1/chat/completions` request body
#[derive(Debug, Deserialize)]
struct ChatCompletionRequest {
    model: Option<String>,
    messages: Option<Vec<ChatMessage>>,
    max_tokens: Option<u64>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    #[serde(default)]
    stream: bool,
}

/// `POST /openai/v1/completions` request body
#[derive(Debug, Deserialize)]
struct CompletionRequest {
    model: Option<String>,
    prompt: Option<Value>,
    max_tokens: Option<u64>,
    temperature: Option<f64>,
    #[serde(default)]
    stream: bool,
}

/// Decodes a chat completion body into (model name, canonical request)
pub fn decode_chat_request(body: &[u8]) -> Result<(String, InferRequest)> {
    let payload: ChatCompletionRequest = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("Unrecognized request format: {}", e)))?;

    if payload.stream {
        return Err(Error::InvalidInput(
            "Streaming responses are not supported".to_string(),
        ));
    }

    let model = payload
        .model
        .ok_or_else(|| Error::InvalidInput("Expected \"model\" to be present".to_string()))?;

    let messages = payload
        .messages
        .filter(|messages| !messages.is_empty())
        .ok_or_else(|| {
            Error::InvalidInput("Expected \"messages\" to be a non-empty list".to_string())
        })?;

    let data: Vec<Value> = messages
        .iter()
        .map(|message| json!({ "role": message.role, "content": message.content }))
        .collect();

    let tensor = InferTensor::new(
        "messages",
        TensorDataType::Bytes,
        vec![data.len() as i64],
        data,
    );

    let mut request = InferRequest::new(&model, vec![tensor], ProtocolVersion::OpenAi);
    insert_sampling_parameters(
        &mut request,
        payload.max_tokens,
        payload.temperature,
        payload.top_p,
    );

    Ok((model, request))
}

/// Decodes a text completion body into (model name, canonical request)
pub fn decode_completion_request(body: &[u8]) -> Result<(String, InferRequest)> {
    let payload: CompletionRequest = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("Unrecognized request format: {}", e)))?;

    if payload.stream {
        return Err(Error::InvalidInput(
            "Streaming responses are not supported".to_string(),
        ));
    }

    let model = payload
        .model
        .ok_or_else(|| Error::InvalidInput("Expected \"model\" to be present".to_string()))?;

    let data = match payload.prompt {
        Some(Value::String(prompt)) => vec![Value::String(prompt)],
        Some(Value::Array(prompts)) if !prompts.is_empty() => prompts,
        _ => {
            return Err(Error::InvalidInput(
                "Expected \"prompt\" to be a string or a non-empty list".to_string(),
            ))
        }
    };

    let tensor = InferTensor::new(
        "prompt",
        TensorDataType::Bytes,
        vec![data.len() as i64],
        data,
    );

    let mut request = InferRequest::new(&model, vec![tensor], ProtocolVersion::OpenAi);
    insert_sampling_parameters(&mut request, payload.max_tokens, payload.temperature, None);

    Ok((model, request))
}

/// Carries sampling options to the model through the open parameter map
fn insert_sampling_parameters(
    request: &mut InferRequest,
    max_tokens: Option<u64>,
    temperature: Option<f64>,
    top_p: Option<f64>,
) {
    if let Some(max_tokens) = max_tokens {
        request
            .parameters
            .extra
            .insert("max_tokens".to_string(), json!(max_tokens));
    }
    if let Some(temperature) = temperature {
        request
            .parameters
            .extra
            .insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = top_p {
        request
            .parameters
            .extra
            .insert("top_p".to_string(), json!(top_p));
    }
}

/// Extracts the generated text from the model's first output tensor
fn generated_text(response: &InferResponse) -> String {
    match response.outputs.first().and_then(|tensor| tensor.data.first()) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Token usage block, taken from model-supplied response parameters when
/// present
fn usage(response: &InferResponse) -> Value {
    let count = |key: &str| {
        response
            .parameters
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };

    let prompt_tokens = count("prompt_tokens");
    let completion_tokens = count("completion_tokens");

    json!({
        "prompt_tokens": prompt_tokens,
        "completion_tokens": completion_tokens,
        "total_tokens": prompt_tokens + completion_tokens,
    })
}

/// Encodes a canonical response as a chat completion body
pub fn encode_chat_response(model: &str, response: &InferResponse) -> Value {
    json!({
        "id": format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": generated_text(response) },
            "finish_reason": "stop",
        }],
        "usage": usage(response),
    })
}

/// Encodes a canonical response as a text completion body
pub fn encode_completion_response(model: &str, response: &InferResponse) -> Value {
    json!({
        "id": format!("cmpl-{}", uuid::Uuid::new_v4().simple()),
        "object": "text_completion",
        "created": chrono::Utc::now().timestamp(),
        "model": model,
        "choices": [{
            "index": 0,
            "text": generated_text(response),
            "finish_reason": "stop",
        }],
        "usage": usage(response),
    })
}

/// OpenAI-compatible route namespace
pub fn routes() -> Router<Arc<Dataplane>> {
    Router::new()
        .route("/openai/v1/chat/completions", post(chat_completions))
        .route("/openai/v1/completions", post(completions))
}

/// `POST /openai/v1/chat/completions`
async fn chat_completions(
    State(dataplane): State<Arc<Dataplane>>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let (model, request) = decode_chat_request(&body)?;
    let header_map = headers_to_map(&headers);

    let response = dataplane.infer(&model, request, &header_map).await?;

    Ok(Json(encode_chat_response(&model, &response)))
}

/// `POST /openai/v1/completions`
async fn completions(
    State(dataplane): State<Arc<Dataplane>>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let (model, request) = decode_completion_request(&body)?;
    let header_map = headers_to_map(&headers);

    let response = dataplane.infer(&model, request, &header_map).await?;

    Ok(Json(encode_completion_response(&model, &response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chat_request() {
        let body = br#"{
            "model": "llm",
            "messages": [{"role": "user", "content": "hello"}],
            "max_tokens": 16,
            "temperature": 0.2
        }"#;

        let (model, request) = decode_chat_request(body).unwrap();
        assert_eq!(model, "llm");
        assert_eq!(request.protocol, ProtocolVersion::OpenAi);

        let tensor = request.input("messages").unwrap();
        assert_eq!(tensor.datatype, TensorDataType::Bytes);
        assert_eq!(tensor.data[0]["content"], "hello");
        assert_eq!(request.parameters.extra["max_tokens"], json!(16));
    }

    #[test]
    fn test_decode_chat_rejects_streaming() {
        let body = br#"{
            "model": "llm",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true
        }"#;

        let err = decode_chat_request(body).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_decode_chat_requires_model_and_messages() {
        let err =
            decode_chat_request(br#"{"messages": [{"role": "user", "content": "x"}]}"#)
                .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = decode_chat_request(br#"{"model": "llm", "messages": []}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_decode_completion_prompt_forms() {
        let (_, request) =
            decode_completion_request(br#"{"model": "llm", "prompt": "once upon"}"#).unwrap();
        assert_eq!(request.input("prompt").unwrap().data, vec![json!("once upon")]);

        let (_, request) =
            decode_completion_request(br#"{"model": "llm", "prompt": ["a", "b"]}"#).unwrap();
        assert_eq!(request.input("prompt").unwrap().data.len(), 2);

        let err = decode_completion_request(br#"{"model": "llm"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_encode_chat_response() {
        let mut response = InferResponse::new(
            "llm",
            vec![InferTensor::new(
                "text",
                TensorDataType::Bytes,
                vec![1],
                vec![json!("generated reply")],
            )],
        );
        response
            .parameters
            .insert("prompt_tokens".to_string(), json!(7));
        response
            .parameters
            .insert("completion_tokens".to_string(), json!(3));

        let encoded = encode_chat_response("llm", &response);
        assert_eq!(encoded["object"], "chat.completion");
        assert_eq!(encoded["choices"][0]["message"]["content"], "generated reply");
        assert_eq!(encoded["usage"]["total_tokens"], 10);
        assert!(encoded["id"].as_str().unwrap().starts_with("chatcmpl-"));
    }
}
