//! MCP protocol engine: capability tables and JSON-RPC dispatch.
//!
//! One [`ProtocolEngine`] serves every session. Tools and resources are
//! registered at startup, after which the engine is shared immutably
//! through an `Arc`. [`ProtocolEngine::attach`] binds the engine to one
//! channel's inbound queue for the lifetime of that channel.
//!
//! Dispatch is split in two phases. [`ProtocolEngine::begin`] decodes,
//! resolves and validates synchronously, so messages on one channel start
//! in arrival order. The handler future it returns runs on its own task,
//! so a slow call never delays later messages on the same or other
//! channels. Responses may therefore complete out of order.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use rmcp::model::{
    Annotated, CallToolResult, ErrorCode, ErrorData, Implementation, JsonObject,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, RawResource,
    ReadResourceResult, ServerCapabilities, ServerInfo, Tool,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use super::channel::{InboundMessages, StreamingChannel};
use super::schema::InputSchema;
use crate::{AppError, Result};

/// Boxed, sendable future used at handler seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Tool handler: validated arguments in, tool result out.
pub type ToolHandler =
    Arc<dyn Fn(JsonObject) -> BoxFuture<'static, Result<CallToolResult>> + Send + Sync>;

/// Resource handler: requested URI in, resource contents out.
pub type ResourceHandler =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<ReadResourceResult>> + Send + Sync>;

/// Default upper bound on a single handler invocation.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(60);

const JSONRPC_VERSION: &str = "2.0";

/// A named, schema-validated tool.
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Description surfaced in `tools/list`.
    pub description: String,
    /// Shape the arguments must satisfy before the handler runs.
    pub input: InputSchema,
    /// Async handler.
    pub handler: ToolHandler,
}

impl ToolDescriptor {
    /// Build a descriptor from any async closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input: InputSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    fn to_tool(&self) -> Tool {
        Tool::new(
            self.name.clone(),
            self.description.clone(),
            self.input.to_json_schema(),
        )
    }
}

/// A named, URI-addressed, read-only resource.
pub struct ResourceDescriptor {
    /// Unique display name.
    pub name: String,
    /// Resource URI, `scheme://authority[...]`.
    pub uri: String,
    /// Description surfaced in `resources/list`.
    pub description: String,
    /// MIME type of the returned content.
    pub mime_type: String,
    /// Async handler.
    pub handler: ResourceHandler,
}

impl ResourceDescriptor {
    /// Build a descriptor from any async closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        uri: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ReadResourceResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            uri: uri.into(),
            description: description.into(),
            mime_type: "application/json".into(),
            handler: Arc::new(move |uri| Box::pin(handler(uri))),
        }
    }

    fn to_resource(&self) -> Annotated<RawResource> {
        let mut raw = RawResource::new(self.uri.clone(), self.name.clone());
        raw.description = Some(self.description.clone());
        raw.mime_type = Some(self.mime_type.clone());
        Annotated::new(raw, None)
    }
}

/// `scheme://authority` prefix identifying the resource a URI belongs to.
///
/// The scheme is compared case-insensitively; the authority is not.
#[must_use]
pub fn resource_key(uri: &str) -> Option<String> {
    let (scheme, rest) = uri.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    if authority.is_empty() {
        return None;
    }
    Some(format!("{}://{authority}", scheme.to_ascii_lowercase()))
}

/// One decoded client message.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// `initialize` handshake.
    Initialize {
        /// Request id.
        id: Value,
    },
    /// `ping`.
    Ping {
        /// Request id.
        id: Value,
    },
    /// `tools/list`.
    ListTools {
        /// Request id.
        id: Value,
    },
    /// `tools/call`.
    CallTool {
        /// Request id.
        id: Value,
        /// Tool name.
        name: String,
        /// Raw arguments, not yet validated.
        arguments: JsonObject,
    },
    /// `resources/list`.
    ListResources {
        /// Request id.
        id: Value,
    },
    /// `resources/templates/list`.
    ListResourceTemplates {
        /// Request id.
        id: Value,
    },
    /// `resources/read`.
    ReadResource {
        /// Request id.
        id: Value,
        /// Requested URI.
        uri: String,
    },
    /// Any message without an id that carries a method.
    Notification {
        /// Notification method.
        method: String,
    },
    /// A client response to a server request; the server sends none, so it is ignored.
    Response {
        /// Response id.
        id: Value,
    },
    /// Message that could not be turned into a request; answered with `error`.
    Invalid {
        /// Request id, `null` when unknown.
        id: Value,
        /// Error to return.
        error: ErrorData,
    },
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<JsonObject>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

impl InboundMessage {
    /// Decode one raw JSON-RPC payload.
    ///
    /// Never fails: undecodable input becomes [`InboundMessage::Invalid`].
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                return Self::Invalid {
                    id: Value::Null,
                    error: ErrorData::parse_error(format!("invalid JSON: {err}"), None),
                }
            }
        };
        let Value::Object(object) = value else {
            return Self::Invalid {
                id: Value::Null,
                error: ErrorData::invalid_request("message is not a JSON object", None),
            };
        };
        if let Some(method) = object.get("method") {
            if !method.is_string() && !method.is_null() {
                return Self::Invalid {
                    id: object.get("id").cloned().unwrap_or(Value::Null),
                    error: ErrorData::invalid_request("method must be a string", None),
                };
            }
        }
        let message: RawMessage = match serde_json::from_value(Value::Object(object)) {
            Ok(message) => message,
            Err(err) => {
                return Self::Invalid {
                    id: Value::Null,
                    error: ErrorData::invalid_request(format!("invalid request: {err}"), None),
                }
            }
        };

        let Some(method) = message.method else {
            return match message.id {
                Some(id) if message.result.is_some() || message.error.is_some() => {
                    Self::Response { id }
                }
                id => Self::Invalid {
                    id: id.unwrap_or(Value::Null),
                    error: ErrorData::invalid_request("message has no method", None),
                },
            };
        };

        let Some(id) = message.id else {
            return Self::Notification { method };
        };

        match method.as_str() {
            "initialize" => Self::Initialize { id },
            "ping" => Self::Ping { id },
            "tools/list" => Self::ListTools { id },
            "resources/list" => Self::ListResources { id },
            "resources/templates/list" => Self::ListResourceTemplates { id },
            "tools/call" => match parse_params::<CallToolParams>(message.params) {
                Ok(params) => Self::CallTool {
                    id,
                    name: params.name,
                    arguments: params.arguments.unwrap_or_default(),
                },
                Err(error) => Self::Invalid { id, error },
            },
            "resources/read" => match parse_params::<ReadResourceParams>(message.params) {
                Ok(params) => Self::ReadResource {
                    id,
                    uri: params.uri,
                },
                Err(error) => Self::Invalid { id, error },
            },
            _ => Self::Invalid {
                id,
                error: ErrorData::new(
                    ErrorCode::METHOD_NOT_FOUND,
                    format!("method not found: {method}"),
                    Some(json!({ "method": method })),
                ),
            },
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> std::result::Result<T, ErrorData> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|err| ErrorData::invalid_params(format!("invalid params: {err}"), None))
}

/// Outcome of the synchronous dispatch phase.
pub enum Dispatch {
    /// Answer is ready.
    Reply(String),
    /// Answer is produced by a handler future.
    Pending(BoxFuture<'static, String>),
    /// Nothing is sent back (notifications, client responses).
    NoReply,
}

/// Map an application error onto a JSON-RPC error object.
#[must_use]
pub fn error_data(err: &AppError) -> ErrorData {
    match err {
        AppError::UnknownTool(name) => ErrorData::invalid_params(
            format!("unknown tool: {name}"),
            Some(json!({ "tool": name })),
        ),
        AppError::InvalidInput(errors) => ErrorData::invalid_params(
            format!("invalid input: {errors}"),
            Some(json!({ "errors": errors })),
        ),
        AppError::UnknownResource(uri) => ErrorData::resource_not_found(
            format!("unknown resource: {uri}"),
            Some(json!({ "uri": uri })),
        ),
        other => ErrorData::internal_error(other.to_string(), None),
    }
}

/// Encode a JSON-RPC success envelope.
#[must_use]
pub fn success_frame(id: &Value, result: &impl serde::Serialize) -> String {
    match serde_json::to_value(result) {
        Ok(result) => json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result }).to_string(),
        Err(err) => error_frame(
            id,
            &ErrorData::internal_error(format!("failed to encode result: {err}"), None),
        ),
    }
}

/// Encode a JSON-RPC error envelope.
#[must_use]
pub fn error_frame(id: &Value, error: &ErrorData) -> String {
    json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "error": error }).to_string()
}

/// MCP dispatcher shared by every session.
pub struct ProtocolEngine {
    name: String,
    version: String,
    instructions: Option<String>,
    tools: BTreeMap<String, ToolDescriptor>,
    resources: BTreeMap<String, ResourceDescriptor>,
    handler_timeout: Duration,
}

impl ProtocolEngine {
    /// Create an engine with no capabilities registered.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instructions: None,
            tools: BTreeMap::new(),
            resources: BTreeMap::new(),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// Set the upper bound on a single handler invocation.
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Set the instructions returned from `initialize`.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a tool with the same name exists.
    pub fn register_tool(&mut self, tool: ToolDescriptor) -> Result<()> {
        if self.tools.contains_key(&tool.name) {
            return Err(AppError::Config(format!(
                "tool '{}' is already registered",
                tool.name
            )));
        }
        debug!(tool = %tool.name, "tool registered");
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Register a resource.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the URI is malformed, or if a resource
    /// with the same name or `scheme://authority` exists.
    pub fn register_resource(&mut self, resource: ResourceDescriptor) -> Result<()> {
        let key = resource_key(&resource.uri).ok_or_else(|| {
            AppError::Config(format!(
                "resource uri '{}' is not of the form scheme://name",
                resource.uri
            ))
        })?;
        if self.resources.contains_key(&key) {
            return Err(AppError::Config(format!(
                "resource uri '{key}' is already registered"
            )));
        }
        if self.resources.values().any(|r| r.name == resource.name) {
            return Err(AppError::Config(format!(
                "resource '{}' is already registered",
                resource.name
            )));
        }
        debug!(resource = %resource.name, %key, "resource registered");
        self.resources.insert(key, resource);
        Ok(())
    }

    /// Names of registered tools, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// URIs of registered resources, sorted by key.
    #[must_use]
    pub fn resource_uris(&self) -> Vec<&str> {
        self.resources.values().map(|r| r.uri.as_str()).collect()
    }

    /// Server identity and capabilities returned from `initialize`.
    #[must_use]
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                ..Implementation::default()
            },
            instructions: self.instructions.clone(),
            ..ServerInfo::default()
        }
    }

    /// Bind the engine to one channel's inbound queue.
    ///
    /// The returned task ends when the channel closes. Handler tasks already
    /// spawned keep running; their results are dropped if the channel is gone.
    pub fn attach(
        self: &Arc<Self>,
        channel: Arc<StreamingChannel>,
        mut inbound: InboundMessages,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let span = info_span!("sse_session", session_id = %channel.session_id());

        tokio::spawn(
            async move {
                loop {
                    let raw = tokio::select! {
                        () = channel.closed() => break,
                        raw = inbound.recv() => match raw {
                            Some(raw) => raw,
                            None => break,
                        },
                    };

                    match engine.begin(InboundMessage::decode(&raw)) {
                        Dispatch::Reply(frame) => deliver(&channel, frame),
                        Dispatch::Pending(response) => {
                            let channel = Arc::clone(&channel);
                            tokio::spawn(
                                async move {
                                    let frame = response.await;
                                    deliver(&channel, frame);
                                }
                                .in_current_span(),
                            );
                        }
                        Dispatch::NoReply => {}
                    }
                }
                debug!("engine detached from channel");
            }
            .instrument(span),
        )
    }

    /// Decode and fully dispatch one raw payload.
    pub async fn handle_raw(&self, raw: &str) -> Option<String> {
        self.dispatch(InboundMessage::decode(raw)).await
    }

    /// Dispatch one message and await its encoded response.
    pub async fn dispatch(&self, message: InboundMessage) -> Option<String> {
        match self.begin(message) {
            Dispatch::Reply(frame) => Some(frame),
            Dispatch::Pending(response) => Some(response.await),
            Dispatch::NoReply => None,
        }
    }

    /// Resolve, validate and start one message.
    ///
    /// Everything up to the handler invocation happens before this returns.
    pub fn begin(&self, message: InboundMessage) -> Dispatch {
        match message {
            InboundMessage::Initialize { id } => {
                info!(server = %self.name, "client initialized session");
                Dispatch::Reply(success_frame(&id, &self.server_info()))
            }
            InboundMessage::Ping { id } => Dispatch::Reply(success_frame(&id, &json!({}))),
            InboundMessage::ListTools { id } => {
                let tools: Vec<Tool> = self.tools.values().map(ToolDescriptor::to_tool).collect();
                Dispatch::Reply(success_frame(&id, &ListToolsResult::with_all_items(tools)))
            }
            InboundMessage::ListResources { id } => {
                let resources = self
                    .resources
                    .values()
                    .map(ResourceDescriptor::to_resource)
                    .collect();
                Dispatch::Reply(success_frame(
                    &id,
                    &ListResourcesResult::with_all_items(resources),
                ))
            }
            InboundMessage::ListResourceTemplates { id } => Dispatch::Reply(success_frame(
                &id,
                &ListResourceTemplatesResult::with_all_items(Vec::new()),
            )),
            InboundMessage::CallTool {
                id,
                name,
                arguments,
            } => self.begin_tool_call(id, &name, arguments),
            InboundMessage::ReadResource { id, uri } => self.begin_resource_read(id, uri),
            InboundMessage::Notification { method } => {
                debug!(%method, "notification received");
                Dispatch::NoReply
            }
            InboundMessage::Response { id } => {
                debug!(%id, "ignoring client response");
                Dispatch::NoReply
            }
            InboundMessage::Invalid { id, error } => {
                warn!(code = error.code.0, message = %error.message, "rejecting inbound message");
                Dispatch::Reply(error_frame(&id, &error))
            }
        }
    }

    fn begin_tool_call(&self, id: Value, name: &str, arguments: JsonObject) -> Dispatch {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = name, "call to unknown tool");
            return Dispatch::Reply(error_frame(
                &id,
                &error_data(&AppError::UnknownTool(name.to_owned())),
            ));
        };

        if let Err(errors) = tool.input.validate(&arguments) {
            warn!(tool = name, %errors, "tool input rejected");
            return Dispatch::Reply(error_frame(&id, &error_data(&errors.into())));
        }

        let span = info_span!("call_tool", tool = %name);
        let response = (tool.handler)(arguments);
        let limit = self.handler_timeout;
        Dispatch::Pending(Box::pin(
            async move { encode_outcome(&id, run_bounded(limit, response).await) }.instrument(span),
        ))
    }

    fn begin_resource_read(&self, id: Value, uri: String) -> Dispatch {
        let Some(resource) = resource_key(&uri).and_then(|key| self.resources.get(&key)) else {
            warn!(%uri, "read of unknown resource");
            return Dispatch::Reply(error_frame(&id, &error_data(&AppError::UnknownResource(uri))));
        };

        let span = info_span!("read_resource", resource = %resource.name, %uri);
        let response = (resource.handler)(uri);
        let limit = self.handler_timeout;
        Dispatch::Pending(Box::pin(
            async move { encode_outcome(&id, run_bounded(limit, response).await) }.instrument(span),
        ))
    }
}

async fn run_bounded<T>(limit: Duration, response: BoxFuture<'static, Result<T>>) -> Result<T> {
    // A panicking handler still owes its caller an error envelope.
    match tokio::time::timeout(limit, AssertUnwindSafe(response).catch_unwind()).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(panic)) => Err(AppError::Mcp(format!(
            "handler panicked: {}",
            panic_message(panic.as_ref())
        ))),
        Err(_) => Err(AppError::Mcp(format!(
            "handler timed out after {}s",
            limit.as_secs_f64()
        ))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

fn encode_outcome<T: serde::Serialize>(id: &Value, outcome: Result<T>) -> String {
    match outcome {
        Ok(result) => {
            debug!("handler completed");
            success_frame(id, &result)
        }
        Err(err) => {
            warn!(%err, "handler failed");
            error_frame(id, &error_data(&err))
        }
    }
}

fn deliver(channel: &StreamingChannel, frame: String) {
    if let Err(err) = channel.send(frame) {
        debug!(%err, "result dropped");
    }
}
