//! Structural validation of inbound completion bodies.

use serde_json::Value;

use crate::api::models::CompletionRequest;
use crate::core::{GatewayError, Result};

const INVALID_JSON: &str = "Invalid JSON body";
const NOT_AN_OBJECT: &str = "Request body must be a JSON object.";
const MISSING_MESSAGES: &str = "Request must include non-empty \"messages\" array.";
const MESSAGES_NOT_ARRAY: &str = "Request must include non-empty \"messages\" array; \"messages\" must be an array.";
const EMPTY_MESSAGES: &str = "Request must include non-empty \"messages\" array; \"messages\" is empty.";

/// Parse and structurally check a raw request body.
///
/// Checks, in order: valid JSON, a JSON object, a `messages` field, that
/// `messages` is an array, and that it has at least one entry. The content of
/// individual messages is not inspected.
pub fn validate(raw_body: &[u8]) -> Result<CompletionRequest> {
    let value: Value = serde_json::from_slice(raw_body)
        .map_err(|_| GatewayError::InvalidRequest(INVALID_JSON.to_string()))?;
    validate_value(&value)
}

/// Same checks as [`validate`] on an already parsed body.
pub fn validate_value(value: &Value) -> Result<CompletionRequest> {
    let obj = value
        .as_object()
        .ok_or_else(|| GatewayError::InvalidRequest(NOT_AN_OBJECT.to_string()))?;

    let messages = match obj.get("messages") {
        None | Some(Value::Null) => {
            return Err(GatewayError::InvalidRequest(MISSING_MESSAGES.to_string()))
        }
        Some(Value::Array(messages)) if messages.is_empty() => {
            return Err(GatewayError::InvalidRequest(EMPTY_MESSAGES.to_string()))
        }
        Some(Value::Array(messages)) => messages.clone(),
        Some(_) => {
            return Err(GatewayError::InvalidRequest(
                MESSAGES_NOT_ARRAY.to_string(),
            ))
        }
    };

    Ok(CompletionRequest::from_object(obj, messages))
}
