//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the core message types used in the Model Context Protocol.
//! All messages follow the JSON-RPC 2.0 specification with MCP-specific extensions.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`)
//! - **Response**: A reply to a request (success or error)
//! - **Notification**: A one-way message (no `id`, no response expected)
//! - **Batch**: An array of requests and notifications in one HTTP body
//!
//! # MCP-Specific Constraints
//!
//! - Request IDs must be strings or numbers (never `null`)
//! - A response carries exactly one of `result` and `error`; this is enforced
//!   by [`ResponsePayload`] when encoding and rejected when decoding

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation and discovery.
pub const SERVER_NAME: &str = "showcase-mcp";

/// The JSON-RPC version marker carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request ID.
///
/// IDs are strings or numbers, never `null`. Numbers keep their JSON
/// representation so `1.5` or `7.0` are echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(Number),
    /// String request ID.
    String(String),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A JSON-RPC 2.0 request message.
///
/// Requests expect a response from the server.
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    /// Unique request identifier.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and do not expect a response.
#[derive(Debug, Clone)]
pub struct JsonRpcNotification {
    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    pub params: Option<Value>,
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
///
/// Method handlers return this as the error half of their `Result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Unknown method or tool.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::with_message(ErrorCode::MethodNotFound, format!("Method not found: {method}"))
    }

    /// Missing or malformed parameters, or a referenced entity that does not exist.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidParams, message)
    }

    /// A failure on the server side of an otherwise valid request.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, message)
    }
}

/// The outcome carried by a response: a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    /// The method succeeded.
    Result(Value),
    /// The method failed.
    Error(JsonRpcErrorData),
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireResponse")]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: String,

    /// The request ID this response corresponds to; `null` when the request
    /// could not be parsed far enough to read it.
    pub id: Option<RequestId>,

    /// The result or error.
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

/// A response as decoded, before the payload is checked.
#[derive(Deserialize)]
struct WireResponse {
    jsonrpc: String,
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorData>,
}

/// Maps a present member to `Some`, including an explicit `null`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<WireResponse> for JsonRpcResponse {
    type Error = &'static str;

    fn try_from(wire: WireResponse) -> Result<Self, Self::Error> {
        let payload = match (wire.result, wire.error) {
            (Some(result), None) => ResponsePayload::Result(result),
            (None, Some(error)) => ResponsePayload::Error(error),
            (Some(_), Some(_)) => return Err("response carries both result and error"),
            (None, None) => return Err("response carries neither result nor error"),
        };
        Ok(Self {
            jsonrpc: wire.jsonrpc,
            id: wire.id,
            payload,
        })
    }
}

impl JsonRpcResponse {
    /// Builds the wire response for a handler outcome.
    #[must_use]
    pub fn from_result(id: Option<RequestId>, result: Result<Value, JsonRpcErrorData>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: match result {
                Ok(value) => ResponsePayload::Result(value),
                Err(error) => ResponsePayload::Error(error),
            },
        }
    }

    /// Creates a new success response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::from_result(Some(id), Ok(result))
    }

    /// Creates a new error response.
    #[must_use]
    pub fn error(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self::from_result(id, Err(error))
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::error(
            None,
            JsonRpcErrorData::from_code(ErrorCode::ParseError).with_data(Value::String(detail.into())),
        )
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::error(id, JsonRpcErrorData::from_code(ErrorCode::InvalidRequest))
    }

    /// Returns the result value, if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(value) => Some(value),
            ResponsePayload::Error(_) => None,
        }
    }

    /// Returns the error object, if this is an error response.
    #[must_use]
    pub const fn error_data(&self) -> Option<&JsonRpcErrorData> {
        match &self.payload {
            ResponsePayload::Result(_) => None,
            ResponsePayload::Error(error) => Some(error),
        }
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }
}

/// A decoded HTTP body: one message or a batch of them.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A single JSON value (normally an object).
    Single(Value),
    /// A JSON array of messages.
    Batch(Vec<Value>),
}

/// Decodes an HTTP body as JSON.
///
/// Only the top-level JSON syntax is checked here; each message is
/// validated separately by [`parse_message`] so that one bad entry in a
/// batch does not affect the others.
///
/// # Errors
///
/// Returns a parse error response (`-32700`, `id: null`) if the body is not
/// valid JSON.
pub fn parse_body(body: &[u8]) -> Result<Payload, JsonRpcResponse> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| JsonRpcResponse::parse_error(e.to_string()))?;

    Ok(match value {
        Value::Array(items) => Payload::Batch(items),
        other => Payload::Single(other),
    })
}

/// Validates one decoded JSON value as a request or notification.
///
/// # Errors
///
/// Returns an invalid request response (`-32600`) if the value is not an
/// object, lacks `"jsonrpc": "2.0"` or a method name, or carries an ID that
/// is neither a string nor a number. The ID is echoed whenever it could be
/// read.
pub fn parse_message(value: Value) -> Result<IncomingMessage, JsonRpcResponse> {
    let Value::Object(mut obj) = value else {
        return Err(JsonRpcResponse::invalid_request(None));
    };

    // An `id` member makes this a request; it must be a string or number.
    let id = match obj.remove("id") {
        None => None,
        Some(raw) => Some(
            serde_json::from_value::<RequestId>(raw)
                .map_err(|_| JsonRpcResponse::invalid_request(None))?,
        ),
    };

    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(JsonRpcResponse::invalid_request(id));
    }

    let method = match obj.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => return Err(JsonRpcResponse::invalid_request(id)),
    };

    let params = obj.remove("params").filter(|p| !p.is_null());

    Ok(match id {
        Some(id) => IncomingMessage::Request(JsonRpcRequest { id, method, params }),
        None => IncomingMessage::Notification(JsonRpcNotification { method, params }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(json: &str) -> Result<IncomingMessage, JsonRpcResponse> {
        match parse_body(json.as_bytes())? {
            Payload::Single(value) => parse_message(value),
            Payload::Batch(_) => panic!("Expected a single message"),
        }
    }

    fn error_code(response: &JsonRpcResponse) -> i32 {
        response.error_data().expect("error response").code
    }

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse(json).unwrap();
        assert_eq!(msg.method(), "initialize");

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::from(1));
        assert_eq!(req.method, "initialize");
        assert_eq!(req.params, Some(json!({})));
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "initialized"}"#;
        let msg = parse(json).unwrap();
        assert!(msg.id().is_none());
        assert_eq!(msg.method(), "initialized");

        let IncomingMessage::Notification(notif) = msg else {
            panic!("Expected Notification, got Request");
        };
        assert_eq!(notif.method, "initialized");
        assert!(notif.params.is_none());
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let msg = parse(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::from("abc-123"));
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_body(b"not valid json").unwrap_err();
        assert_eq!(error_code(&err), ErrorCode::ParseError.code());
        assert_eq!(err.id, None);
        assert!(err.error_data().unwrap().data.is_some());
    }

    #[test]
    fn parse_batch_body() {
        let payload = parse_body(br#"[{"jsonrpc":"2.0","id":1,"method":"ping"}, 5]"#).unwrap();
        let Payload::Batch(items) = payload else {
            panic!("Expected Batch");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn parse_missing_jsonrpc_echoes_id() {
        let json = r#"{"id": 1, "method": "test"}"#;
        let err = parse(json).unwrap_err();
        assert_eq!(error_code(&err), ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::from(1)));
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#;
        let err = parse(json).unwrap_err();
        assert_eq!(error_code(&err), ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn parse_missing_method() {
        let json = r#"{"jsonrpc": "2.0", "id": "x"}"#;
        let err = parse(json).unwrap_err();
        assert_eq!(error_code(&err), ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::String("x".to_string())));
    }

    #[test]
    fn parse_non_object() {
        let err = parse("42").unwrap_err();
        assert_eq!(error_code(&err), ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, None);
    }

    #[test]
    fn parse_null_id_is_invalid() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "ping"}"#;
        let err = parse(json).unwrap_err();
        assert_eq!(error_code(&err), ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn serialise_success_response() {
        let response =
            JsonRpcResponse::success(RequestId::from(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn serialise_error_response() {
        let error = JsonRpcResponse::error(
            Some(RequestId::from(1)),
            JsonRpcErrorData::method_not_found("unknown/method"),
        );
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
        assert!(!json.contains("result"));
    }

    #[test]
    fn parse_error_serialises_null_id() {
        let value = serde_json::to_value(JsonRpcResponse::parse_error("eof")).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["error"]["message"], "Parse error");
    }

    #[test]
    fn response_round_trip_keeps_id_and_one_payload() {
        let responses = [
            JsonRpcResponse::success(RequestId::String("a".into()), json!({"tools": []})),
            JsonRpcResponse::error(
                Some(RequestId::from(9)),
                JsonRpcErrorData::invalid_params("Missing required parameter: id"),
            ),
        ];

        for response in responses {
            let encoded = serde_json::to_string(&response).unwrap();
            let decoded: JsonRpcResponse = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded.id, response.id);
            assert_eq!(decoded, response);
            assert!(decoded.result().is_some() != decoded.error_data().is_some());
        }
    }

    #[test]
    fn decoding_rejects_response_without_payload() {
        let result: Result<JsonRpcResponse, _> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn decoding_rejects_response_with_both_payloads() {
        let result: Result<JsonRpcResponse, _> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"result":{},"error":{"code":-32603,"message":"x"}}"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("both result and error"));
    }

    #[test]
    fn decoding_keeps_null_result() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"n","result":null}"#).unwrap();
        assert_eq!(response.result(), Some(&Value::Null));
        assert!(response.error_data().is_none());
    }

    #[test]
    fn numeric_ids_are_echoed_verbatim() {
        for raw in ["1.5", "7.0", "18446744073709551615", "-3"] {
            let json = format!(r#"{{"jsonrpc": "2.0", "id": {raw}, "method": "ping"}}"#);
            let msg = parse(&json).unwrap();
            let id = msg.id().cloned().expect("request id");

            let response = JsonRpcResponse::success(id, json!({}));
            let encoded = serde_json::to_string(&response).unwrap();
            assert!(encoded.contains(&format!(r#""id":{raw}"#)), "{encoded}");
        }
    }

    #[test]
    fn parse_rejects_non_scalar_ids() {
        for raw in ["true", "[1]", r#"{"n":1}"#] {
            let json = format!(r#"{{"jsonrpc": "2.0", "id": {raw}, "method": "ping"}}"#);
            let err = parse(&json).unwrap_err();
            assert_eq!(error_code(&err), ErrorCode::InvalidRequest.code());
            assert_eq!(err.id, None);
        }
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::from(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
