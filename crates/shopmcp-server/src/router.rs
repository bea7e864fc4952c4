//! JSON-RPC request routing.
//!
//! Maps method names onto the dispatch tables. Notifications (no `id`)
//! never produce a response; the returned [`JsonRpcOutgoing`] for them
//! fails `should_send`.

use serde_json::Value;

use shopmcp_protocol::jsonrpc::{JsonRpcIncoming, JsonRpcOutgoing};
use shopmcp_protocol::types::{
    CallToolRequest, GetPromptRequest, Implementation, InitializeResult, ListPromptsResult,
    ListToolsResult, PromptsCapability, ServerCapabilities, ToolsCapability,
};
use shopmcp_protocol::{McpError, McpResult, PROTOCOL_VERSION};

use crate::registry::{PromptRegistry, ToolRegistry};

/// The server's dispatch state: identity plus the two registries.
pub struct ShopDispatch {
    info: Implementation,
    tools: ToolRegistry,
    prompts: PromptRegistry,
}

impl ShopDispatch {
    /// Assemble the dispatch state.
    pub fn new(info: Implementation, tools: ToolRegistry, prompts: PromptRegistry) -> Self {
        Self {
            info,
            tools,
            prompts,
        }
    }

    /// Server identity reported during initialization.
    pub fn info(&self) -> &Implementation {
        &self.info
    }

    /// The tool dispatch table.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The prompt dispatch table.
    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }
}

/// Route one incoming message to its handler.
pub async fn route_request(dispatch: &ShopDispatch, request: JsonRpcIncoming) -> JsonRpcOutgoing {
    if request.is_notification() {
        match request.method.as_str() {
            "notifications/initialized" => tracing::debug!("client reported initialized"),
            method => tracing::debug!(method, "ignoring notification"),
        }
        return JsonRpcOutgoing::success(None, Value::Null);
    }

    let id = request.id.clone();
    let result = dispatch_method(dispatch, &request).await;

    match result {
        Ok(value) => JsonRpcOutgoing::success(id, value),
        Err(err) => {
            tracing::warn!(method = %request.method, error = %err, "request failed");
            JsonRpcOutgoing::error(id, err)
        }
    }
}

async fn dispatch_method(dispatch: &ShopDispatch, request: &JsonRpcIncoming) -> McpResult<Value> {
    match request.method.as_str() {
        "initialize" => handle_initialize(dispatch, request.params.as_ref()),
        "ping" => Ok(serde_json::json!({})),
        "tools/list" => {
            let result = ListToolsResult {
                tools: dispatch.tools.list(),
            };
            Ok(serde_json::to_value(result)?)
        }
        "tools/call" => {
            let params: CallToolRequest = parse_params(request.params.clone())?;
            let result = dispatch
                .tools
                .call(&params.name, params.arguments.unwrap_or_default())
                .await?;
            Ok(serde_json::to_value(result)?)
        }
        "prompts/list" => {
            let result = ListPromptsResult {
                prompts: dispatch.prompts.list(),
            };
            Ok(serde_json::to_value(result)?)
        }
        "prompts/get" => {
            let params: GetPromptRequest = parse_params(request.params.clone())?;
            let result = dispatch
                .prompts
                .get(&params.name, params.arguments.unwrap_or_default())
                .await?;
            Ok(serde_json::to_value(result)?)
        }
        method => Err(McpError::method_not_found(method)),
    }
}

fn parse_params<P: serde::de::DeserializeOwned>(params: Option<Value>) -> McpResult<P> {
    let params = params.ok_or_else(|| McpError::invalid_params("missing params"))?;
    serde_json::from_value(params).map_err(|e| McpError::invalid_params(e.to_string()))
}

fn handle_initialize(dispatch: &ShopDispatch, params: Option<&Value>) -> McpResult<Value> {
    let params = params.ok_or_else(|| McpError::invalid_params("missing params"))?;

    // clientInfo with name and version is required by the handshake.
    let client_info = params
        .get("clientInfo")
        .ok_or_else(|| McpError::invalid_params("missing required field: clientInfo"))?;
    let name = client_info.get("name").and_then(Value::as_str);
    let version = client_info.get("version").and_then(Value::as_str);
    let (Some(name), Some(version)) = (name, version) else {
        return Err(McpError::invalid_params(
            "clientInfo must contain 'name' and 'version' fields",
        ));
    };

    if let Some(requested) = params.get("protocolVersion").and_then(Value::as_str) {
        if requested != PROTOCOL_VERSION {
            tracing::warn!(
                requested,
                served = PROTOCOL_VERSION,
                "client requested a different protocol version"
            );
        }
    }

    tracing::info!(client = name, client_version = version, "client initializing");

    let result = InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
            prompts: Some(PromptsCapability {
                list_changed: Some(false),
            }),
        },
        server_info: dispatch.info.clone(),
        instructions: None,
    };
    Ok(serde_json::to_value(result)?)
}

/// Convenience: route an already-serialized message, producing a serialized
/// response (or `None` for notifications). Parse failures yield a JSON-RPC
/// parse error with a null id.
pub async fn route_text(dispatch: &ShopDispatch, text: &str) -> Option<String> {
    let request: JsonRpcIncoming = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable request");
            let response = JsonRpcOutgoing::error(None, McpError::parse_error(e.to_string()));
            return serde_json::to_string(&response).ok();
        }
    };

    let response = route_request(dispatch, request).await;
    if !response.should_send() {
        return None;
    }
    serde_json::to_string(&response).ok()
}
