//! Canonical inference request and response types
//!
//! This module defines the protocol-neutral representation that every wire
//! adapter decodes into and encodes out of. Once an adapter has constructed
//! an [`InferRequest`], it is treated as immutable by the dataplane.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire protocol a request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Legacy REST protocol (`instances`/`predictions` JSON)
    V1,
    /// Open inference protocol (named, typed, shaped tensors)
    V2,
    /// OpenAI-compatible chat/completions surface
    OpenAi,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => write!(f, "v1"),
            ProtocolVersion::V2 => write!(f, "v2"),
            ProtocolVersion::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v1" => Ok(ProtocolVersion::V1),
            "v2" => Ok(ProtocolVersion::V2),
            "openai" => Ok(ProtocolVersion::OpenAi),
            _ => Err(format!("Unknown protocol version: {}", s)),
        }
    }
}

/// Logical datatype of a tensor, using open inference protocol names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorDataType {
    #[serde(rename = "BOOL")]
    Bool,
    #[serde(rename = "UINT8")]
    Uint8,
    #[serde(rename = "UINT16")]
    Uint16,
    #[serde(rename = "UINT32")]
    Uint32,
    #[serde(rename = "UINT64")]
    Uint64,
    #[serde(rename = "INT8")]
    Int8,
    #[serde(rename = "INT16")]
    Int16,
    #[serde(rename = "INT32")]
    Int32,
    #[serde(rename = "INT64")]
    Int64,
    #[serde(rename = "FP16")]
    Fp16,
    #[serde(rename = "FP32")]
    Fp32,
    #[serde(rename = "FP64")]
    Fp64,
    #[serde(rename = "BYTES")]
    Bytes,
}

impl TensorDataType {
    /// Infers a logical datatype for an untyped JSON value. Used by the V1
    /// adapter, whose wire format carries no type information.
    pub fn of_value(value: &Value) -> TensorDataType {
        match value {
            Value::Bool(_) => TensorDataType::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => TensorDataType::Int64,
            Value::Number(_) => TensorDataType::Fp64,
            Value::String(_) => TensorDataType::Bytes,
            Value::Array(items) => items
                .first()
                .map(TensorDataType::of_value)
                .unwrap_or(TensorDataType::Bytes),
            _ => TensorDataType::Bytes,
        }
    }
}

impl fmt::Display for TensorDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TensorDataType::Bool => "BOOL",
            TensorDataType::Uint8 => "UINT8",
            TensorDataType::Uint16 => "UINT16",
            TensorDataType::Uint32 => "UINT32",
            TensorDataType::Uint64 => "UINT64",
            TensorDataType::Int8 => "INT8",
            TensorDataType::Int16 => "INT16",
            TensorDataType::Int32 => "INT32",
            TensorDataType::Int64 => "INT64",
            TensorDataType::Fp16 => "FP16",
            TensorDataType::Fp32 => "FP32",
            TensorDataType::Fp64 => "FP64",
            TensorDataType::Bytes => "BYTES",
        };
        write!(f, "{}", name)
    }
}

/// A named, typed, shaped tensor with a JSON-representable payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferTensor {
    /// Tensor name
    pub name: String,

    /// Logical datatype
    pub datatype: TensorDataType,

    /// Tensor shape; variable-size dimensions are specified as -1
    pub shape: Vec<i64>,

    /// Row-major payload
    pub data: Vec<Value>,
}

impl InferTensor {
    /// Creates a new tensor
    pub fn new(
        name: impl Into<String>,
        datatype: TensorDataType,
        shape: Vec<i64>,
        data: Vec<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            datatype,
            shape,
            data,
        }
    }
}

/// Per-request parameters carried alongside the canonical payload
#[derive(Debug, Clone, Default)]
pub struct RequestParameters {
    /// Per-request override of the configured timeout
    pub timeout: Option<Duration>,

    /// Protocol-specific parameters (e.g. sampling options) that models may
    /// interpret
    pub extra: HashMap<String, Value>,
}

/// Canonical, protocol-neutral inference request
#[derive(Debug, Clone)]
pub struct InferRequest {
    /// Request id, if the wire protocol carried one
    pub id: Option<String>,

    /// Target model name
    pub model_name: String,

    /// Ordered input tensors
    pub inputs: Vec<InferTensor>,

    /// Per-request parameters
    pub parameters: RequestParameters,

    /// Protocol the request arrived on
    pub protocol: ProtocolVersion,
}

impl InferRequest {
    /// Creates a new canonical request
    pub fn new(
        model_name: impl Into<String>,
        inputs: Vec<InferTensor>,
        protocol: ProtocolVersion,
    ) -> Self {
        Self {
            id: None,
            model_name: model_name.into(),
            inputs,
            parameters: RequestParameters::default(),
            protocol,
        }
    }

    /// Sets the request id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Looks up an input tensor by name
    pub fn input(&self, name: &str) -> Option<&InferTensor> {
        self.inputs.iter().find(|t| t.name == name)
    }
}

/// Canonical, protocol-neutral inference response
#[derive(Debug, Clone)]
pub struct InferResponse {
    /// Request id echoed back, if one was supplied
    pub id: Option<String>,

    /// Model that produced the response
    pub model_name: String,

    /// Ordered output tensors
    pub outputs: Vec<InferTensor>,

    /// Model-supplied response parameters (e.g. token usage)
    pub parameters: HashMap<String, Value>,
}

impl InferResponse {
    /// Creates a new canonical response
    pub fn new(model_name: impl Into<String>, outputs: Vec<InferTensor>) -> Self {
        Self {
            id: None,
            model_name: model_name.into(),
            outputs,
            parameters: HashMap::new(),
        }
    }

    /// Looks up an output tensor by name
    pub fn output(&self, name: &str) -> Option<&InferTensor> {
        self.outputs.iter().find(|t| t.name == name)
    }
}

/// Shape/type descriptor for a model input or output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorSpec {
    /// Tensor name
    pub name: String,

    /// Logical datatype
    pub datatype: TensorDataType,

    /// Tensor shape; variable-size dimensions are specified as -1
    pub shape: Vec<i64>,
}

/// Model metadata served by the metadata endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,

    /// Serving platform identifier, empty when not applicable
    pub platform: String,

    /// Available model versions
    pub versions: Vec<String>,

    /// Input descriptors
    pub inputs: Vec<TensorSpec>,

    /// Output descriptors
    pub outputs: Vec<TensorSpec>,
}

impl ModelMetadata {
    /// Creates empty metadata for a named model
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform: String::new(),
            versions: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}
