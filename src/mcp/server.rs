//! MCP request dispatcher for the showcase data.
//!
//! The server is stateless between HTTP requests: there is no session, no
//! initialisation gate and no subscription. Each body is decoded, every
//! message in it is routed to a method handler, and the responses are
//! collected in input order.
//!
//! # Message handling
//!
//! 1. **Decode**: The body is parsed as JSON; a syntax error ends the
//!    exchange with a single `-32700` response
//! 2. **Validate**: Each message is checked for `jsonrpc`, `method` and `id`
//! 3. **Dispatch**: Known methods run against the [`ShowcaseStore`];
//!    notifications run too, but their output is dropped

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::mcp::protocol::{
    parse_body, parse_message, IncomingMessage, JsonRpcErrorData, JsonRpcResponse, Payload,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::resources::{list_resources, read_resource, resource_templates};
use crate::mcp::tools::{call_tool, tool_definitions};
use crate::store::{ShowcaseStore, StoreError};

/// Description shown in the discovery document.
const SERVER_DESCRIPTION: &str = "Read-only MCP server for community project showcase data";

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Resource-related capabilities.
    pub resources: ResourceCapabilities,
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            resources: ResourceCapabilities::default(),
            tools: ToolCapabilities {},
        }
    }
}

/// Resource-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCapabilities {
    /// Whether clients may subscribe to resource updates.
    pub subscribe: bool,
    /// Whether the resource list can change during the session.
    pub list_changed: bool,
}

/// Tool-specific capabilities. Serialises as an empty object.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request. Only used for logging; the server
/// always answers with its own protocol version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Parameters for resources/read request.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceParams {
    /// URI of the resource to read.
    pub uri: String,
}

/// The methods this server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `initialized` or `notifications/initialized`
    Initialized,
    /// `ping`
    Ping,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// `resources/list`
    ResourcesList,
    /// `resources/templates/list`
    ResourceTemplatesList,
    /// `resources/read`
    ResourcesRead,
}

impl Method {
    /// Looks up a method by name (case-sensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "initialize" => Self::Initialize,
            "initialized" | "notifications/initialized" => Self::Initialized,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "resources/list" => Self::ResourcesList,
            "resources/templates/list" => Self::ResourceTemplatesList,
            "resources/read" => Self::ResourcesRead,
            _ => return None,
        })
    }
}

/// What the transport should send back for one HTTP body.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// One response object.
    Single(JsonRpcResponse),
    /// A response array for a batch, possibly empty.
    Batch(Vec<JsonRpcResponse>),
    /// A lone notification: nothing to send.
    NoContent,
    /// The body was not valid JSON.
    ParseError(JsonRpcResponse),
}

/// The MCP server for showcase project data.
pub struct McpServer {
    /// The data store, shared by every request.
    store: Arc<dyn ShowcaseStore>,
}

impl McpServer {
    /// Creates a new MCP server over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ShowcaseStore>) -> Self {
        Self { store }
    }

    /// Handles one HTTP request body.
    pub async fn handle_body(&self, body: &[u8]) -> DispatchOutcome {
        let payload = match parse_body(body) {
            Ok(payload) => payload,
            Err(response) => {
                tracing::debug!("Rejecting body that is not valid JSON");
                return DispatchOutcome::ParseError(response);
            }
        };

        match payload {
            Payload::Single(value) => match self.handle_value(value).await {
                Some(response) => DispatchOutcome::Single(response),
                None => DispatchOutcome::NoContent,
            },
            Payload::Batch(items) if items.is_empty() => {
                DispatchOutcome::Single(JsonRpcResponse::invalid_request(None))
            }
            Payload::Batch(items) => {
                tracing::debug!(size = items.len(), "Handling batch");
                let mut responses = Vec::with_capacity(items.len());
                // Sequential, so responses keep the order of the input.
                for item in items {
                    if let Some(response) = self.handle_value(item).await {
                        responses.push(response);
                    }
                }
                DispatchOutcome::Batch(responses)
            }
        }
    }

    /// Validates and handles one message of a body.
    async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        match parse_message(value) {
            Ok(msg) => self.handle_message(msg).await,
            Err(response) => Some(response),
        }
    }

    /// Handles a parsed incoming message.
    ///
    /// Returns `None` for notifications and for `initialized`.
    pub async fn handle_message(&self, msg: IncomingMessage) -> Option<JsonRpcResponse> {
        let (id, method_name, params) = match msg {
            IncomingMessage::Request(req) => (Some(req.id), req.method, req.params),
            IncomingMessage::Notification(notif) => (None, notif.method, notif.params),
        };

        let Some(method) = Method::from_name(&method_name) else {
            tracing::debug!(method = %method_name, "Unknown method");
            return id.map(|id| {
                JsonRpcResponse::error(Some(id), JsonRpcErrorData::method_not_found(&method_name))
            });
        };

        if method == Method::Initialized {
            tracing::debug!("Client initialised");
            return None;
        }

        tracing::debug!(method = %method_name, id = ?id, "Handling request");

        let result = self.dispatch(method, params.as_ref()).await;

        if let Err(error) = &result {
            tracing::debug!(
                method = %method_name,
                code = error.code,
                message = %error.message,
                "Request failed"
            );
        }

        // Notifications run for their side effects only.
        let id = id?;
        Some(JsonRpcResponse::from_result(Some(id), result))
    }

    async fn dispatch(
        &self,
        method: Method,
        params: Option<&Value>,
    ) -> Result<Value, JsonRpcErrorData> {
        match method {
            Method::Initialize => Ok(Self::handle_initialize(params)),
            Method::Ping | Method::Initialized => Ok(json!({})),
            Method::ToolsList => Ok(json!({ "tools": tool_definitions() })),
            Method::ToolsCall => self.handle_tools_call(params).await,
            Method::ResourcesList => list_resources(self.store.as_ref()).await,
            Method::ResourceTemplatesList => {
                Ok(json!({ "resourceTemplates": resource_templates() }))
            }
            Method::ResourcesRead => self.handle_resources_read(params).await,
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(params: Option<&Value>) -> Value {
        if let Some(params) =
            params.and_then(|p| serde_json::from_value::<InitializeParams>(p.clone()).ok())
        {
            let client = params.client_info.as_ref();
            tracing::info!(
                client = client.map_or("unknown", |c| c.name.as_str()),
                client_version = client.and_then(|c| c.version.as_deref()),
                requested_version = params.protocol_version.as_deref(),
                "Client connected"
            );
        }

        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        })
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(&self, params: Option<&Value>) -> Result<Value, JsonRpcErrorData> {
        let params: ToolCallParams = params
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| JsonRpcErrorData::invalid_params(format!("Invalid tool call params: {e}")))?
            .ok_or_else(|| JsonRpcErrorData::invalid_params("Missing required parameter: name"))?;

        call_tool(self.store.as_ref(), &params.name, &params.arguments).await
    }

    /// Handles the resources/read request.
    async fn handle_resources_read(
        &self,
        params: Option<&Value>,
    ) -> Result<Value, JsonRpcErrorData> {
        let params: ReadResourceParams = params
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .ok_or_else(|| JsonRpcErrorData::invalid_params("Missing required parameter: uri"))?;

        read_resource(self.store.as_ref(), &params.uri).await
    }

    /// Returns the document served on `GET`.
    #[must_use]
    pub fn discovery_document() -> Value {
        let tools: Vec<Value> = tool_definitions()
            .into_iter()
            .map(|tool| json!({ "name": tool.name, "description": tool.description }))
            .collect();

        json!({
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "description": SERVER_DESCRIPTION,
            "capabilities": ServerCapabilities::default(),
            "tools": tools,
        })
    }
}

/// Maps a store failure to a `-32603` response error, logging the cause.
///
/// The store error itself never reaches the client.
pub(crate) fn store_failure(
    operation: &'static str,
    message: &'static str,
) -> impl FnOnce(StoreError) -> JsonRpcErrorData {
    move |error| {
        tracing::error!(operation, error = ?error, "Store query failed");
        JsonRpcErrorData::internal_error(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{ErrorCode, RequestId};
    use crate::store::InMemoryStore;

    fn server() -> McpServer {
        McpServer::new(Arc::new(InMemoryStore::new()))
    }

    async fn single(server: &McpServer, body: Value) -> JsonRpcResponse {
        match server.handle_body(body.to_string().as_bytes()).await {
            DispatchOutcome::Single(response) => response,
            other => panic!("Expected a single response, got {other:?}"),
        }
    }

    #[test]
    fn method_names_are_case_sensitive() {
        assert_eq!(Method::from_name("ping"), Some(Method::Ping));
        assert_eq!(
            Method::from_name("notifications/initialized"),
            Some(Method::Initialized)
        );
        assert_eq!(Method::from_name("Ping"), None);
        assert_eq!(Method::from_name("resources/subscribe"), None);
    }

    #[test]
    fn capabilities_serialise() {
        let value = serde_json::to_value(ServerCapabilities::default()).unwrap();
        assert_eq!(
            value,
            json!({"resources": {"subscribe": false, "listChanged": false}, "tools": {}})
        );
    }

    #[test]
    fn discovery_lists_every_tool() {
        let doc = McpServer::discovery_document();
        assert_eq!(doc["name"], SERVER_NAME);
        assert_eq!(doc["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(doc["tools"].as_array().unwrap().len(), 8);
        assert!(doc["tools"][0]["description"].is_string());
    }

    #[tokio::test]
    async fn initialize_echoes_id() {
        let response = single(
            &server(),
            json!({"jsonrpc": "2.0", "id": "init-1", "method": "initialize", "params": {
                "protocolVersion": "2025-03-26",
                "clientInfo": {"name": "test-client"}
            }}),
        )
        .await;

        assert_eq!(response.id, Some(RequestId::String("init-1".to_string())));
        let result = response.result().unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let response = single(
            &server(),
            json!({"jsonrpc": "2.0", "id": 3, "method": "prompts/list"}),
        )
        .await;
        let error = response.error_data().unwrap();
        assert_eq!(error.code, ErrorCode::MethodNotFound.code());
        assert_eq!(error.message, "Method not found: prompts/list");
    }

    #[tokio::test]
    async fn initialized_with_id_gets_no_response() {
        let outcome = server()
            .handle_body(br#"{"jsonrpc":"2.0","id":1,"method":"initialized"}"#)
            .await;
        assert!(matches!(outcome, DispatchOutcome::NoContent));
    }

    #[tokio::test]
    async fn notification_gets_no_response() {
        let outcome = server()
            .handle_body(br#"{"jsonrpc":"2.0","method":"ping"}"#)
            .await;
        assert!(matches!(outcome, DispatchOutcome::NoContent));
    }

    #[tokio::test]
    async fn empty_batch_is_invalid_request() {
        let response = single(&server(), json!([])).await;
        assert_eq!(response.id, None);
        assert_eq!(
            response.error_data().unwrap().code,
            ErrorCode::InvalidRequest.code()
        );
    }

    #[tokio::test]
    async fn tools_call_without_params() {
        let response = single(
            &server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call"}),
        )
        .await;
        assert_eq!(
            response.error_data().unwrap().code,
            ErrorCode::InvalidParams.code()
        );
    }

    #[test]
    fn store_failure_is_internal_error() {
        let error = store_failure("test", "Failed to fetch projects")(StoreError::Unavailable(
            "down".to_string(),
        ));
        assert_eq!(error.code, ErrorCode::InternalError.code());
        assert_eq!(error.message, "Failed to fetch projects");
        assert!(error.data.is_none());
    }
}
