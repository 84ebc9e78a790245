//! MCP server handler that exposes the sync operations as tools.
//!
//! Every tool answers with a JSON text payload: `{ "ok": true, "result": .. }`
//! on success, `{ "ok": false, "error": "<one line>" }` when the operation
//! itself failed. Malformed arguments are JSON-RPC `invalid_params` errors.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_mcp_sdk::schema::{
    CallToolResult, ClientRequest, ListToolsResult, RpcError, TextContent, Tool, ToolInputSchema,
    schema_utils::{NotificationFromClient, RequestFromClient, ResultFromServer},
};
use rust_mcp_sdk::{
    McpServer,
    mcp_server::{ServerHandlerCore, enforce_compatible_protocol_version},
};
use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use uuid::Uuid;

use crate::engine::{RestoreMode, SyncRequest};
use crate::error::SyncError;
use crate::model::{EntryInput, TargetKind};
use crate::service::SyncService;

/// Why a tool call produced no result.
#[derive(Debug)]
enum CallError {
    /// Arguments missing or of the wrong shape.
    Args(String),
    /// The operation ran and failed.
    Sync(SyncError),
    /// The server could not encode its own result.
    Internal(String),
}

impl From<SyncError> for CallError {
    fn from(e: SyncError) -> Self {
        CallError::Sync(e)
    }
}

type CallResult = std::result::Result<JsonValue, CallError>;

fn to_json<T: serde::Serialize>(value: &T) -> CallResult {
    serde_json::to_value(value).map_err(|e| CallError::Internal(format!("unserializable result: {e}")))
}

fn arg<T: DeserializeOwned>(args: &JsonMap<String, JsonValue>, key: &str) -> std::result::Result<T, CallError> {
    let v = args
        .get(key)
        .ok_or_else(|| CallError::Args(format!("missing required '{key}'")))?;
    serde_json::from_value(v.clone()).map_err(|e| CallError::Args(format!("invalid '{key}': {e}")))
}

fn opt_arg<T: DeserializeOwned>(
    args: &JsonMap<String, JsonValue>,
    key: &str,
) -> std::result::Result<Option<T>, CallError> {
    match args.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(_) => arg(args, key).map(Some),
    }
}

fn target_arg(args: &JsonMap<String, JsonValue>) -> std::result::Result<TargetKind, CallError> {
    let raw: String = arg(args, "target")?;
    raw.parse().map_err(CallError::Args)
}

fn prop(ty: &str, description: &str) -> JsonMap<String, JsonValue> {
    let mut m = JsonMap::new();
    m.insert("type".to_string(), JsonValue::String(ty.to_string()));
    m.insert(
        "description".to_string(),
        JsonValue::String(description.to_string()),
    );
    m
}

fn target_prop() -> JsonMap<String, JsonValue> {
    let mut m = prop("string", "Target tool");
    m.insert("enum".to_string(), json!(["droid", "opencode"]));
    m
}

fn string_array_prop(description: &str) -> JsonMap<String, JsonValue> {
    let mut m = prop("array", description);
    m.insert("items".to_string(), json!({ "type": "string" }));
    m
}

fn entries_prop() -> JsonMap<String, JsonValue> {
    let mut m = prop(
        "array",
        "Entry list as returned by preview_merge ({uid?, key?, fields})",
    );
    m.insert("items".to_string(), json!({ "type": "object" }));
    m
}

fn tool(
    name: &str,
    description: &str,
    required: &[&str],
    props: Vec<(&str, JsonMap<String, JsonValue>)>,
) -> Tool {
    Tool {
        annotations: None,
        description: Some(description.to_string()),
        input_schema: ToolInputSchema::new(
            required.iter().map(|s| s.to_string()).collect(),
            Some(
                props
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect::<HashMap<_, _>>(),
            ),
        ),
        meta: None,
        name: name.to_string(),
        output_schema: None,
        title: None,
    }
}

/// Routes MCP requests to the sync service.
pub struct SyncServerHandler {
    service: SyncService,
}

impl SyncServerHandler {
    pub fn new(service: SyncService) -> Self {
        Self { service }
    }

    /// Build the list of tool definitions exposed by this server.
    fn tool_definitions(&self) -> Vec<Tool> {
        vec![
            tool(
                "list_models",
                "List the catalog models that can be synced",
                &[],
                vec![],
            ),
            tool(
                "get_status",
                "Installation, version, backup and sync state of one or all targets",
                &[],
                vec![("target", target_prop())],
            ),
            tool(
                "preview_merge",
                "Entry list a sync with this selection would write; writes nothing",
                &["target", "selected_ids"],
                vec![
                    ("target", target_prop()),
                    ("selected_ids", string_array_prop("Catalog model ids to keep synced")),
                ],
            ),
            tool(
                "execute_sync",
                "Merge the selection (or write the given entry list) into the target's config",
                &["target"],
                vec![
                    ("target", target_prop()),
                    ("selected_ids", string_array_prop("Catalog model ids to keep synced")),
                    ("entries", entries_prop()),
                ],
            ),
            tool(
                "execute_restore",
                "Restore the target's config from its backup or reset it to the default",
                &["target", "mode"],
                vec![("target", target_prop()), ("mode", {
                    let mut m = prop("string", "Restore source");
                    m.insert("enum".to_string(), json!(["backup", "default"]));
                    m
                })],
            ),
            tool(
                "get_config_content",
                "Raw text of a target config file",
                &["target"],
                vec![
                    ("target", target_prop()),
                    ("file_name", prop("string", "File of the target's family; defaults to the primary file")),
                ],
            ),
            tool(
                "reorder_entries",
                "Move one entry of an entry list and re-derive indices and identifiers",
                &["target", "entries", "from", "to"],
                vec![
                    ("target", target_prop()),
                    ("entries", entries_prop()),
                    ("from", prop("integer", "Current position")),
                    ("to", prop("integer", "New position")),
                ],
            ),
            tool(
                "remove_entry",
                "Remove one entry of an entry list by uid",
                &["target", "entries", "uid"],
                vec![
                    ("target", target_prop()),
                    ("entries", entries_prop()),
                    ("uid", prop("string", "Session uid of the entry")),
                ],
            ),
        ]
    }

    fn has_tool(&self, name: &str) -> bool {
        self.tool_definitions().iter().any(|t| t.name == name)
    }

    async fn dispatch(&self, tool: &str, args: &JsonMap<String, JsonValue>) -> CallResult {
        let svc = &self.service;
        match tool {
            "list_models" => to_json(&svc.engine().catalog().list_models()),
            "get_status" => match opt_arg::<String>(args, "target")? {
                Some(_) => to_json(&svc.get_status(target_arg(args)?).await?),
                None => {
                    let mut all = Vec::with_capacity(TargetKind::ALL.len());
                    for kind in TargetKind::ALL {
                        all.push(svc.get_status(kind).await?);
                    }
                    to_json(&all)
                }
            },
            "preview_merge" => {
                let kind = target_arg(args)?;
                to_json(&svc.preview_merge(kind, arg(args, "selected_ids")?).await?)
            }
            "execute_sync" => {
                let kind = target_arg(args)?;
                let request = match (
                    opt_arg::<Vec<EntryInput>>(args, "entries")?,
                    opt_arg::<Vec<String>>(args, "selected_ids")?,
                ) {
                    (Some(entries), _) => SyncRequest::Entries(entries),
                    (None, Some(ids)) => SyncRequest::Selected(ids),
                    (None, None) => SyncRequest::Selected(Vec::new()),
                };
                to_json(&svc.execute_sync(kind, request).await?)
            }
            "execute_restore" => {
                let kind = target_arg(args)?;
                let mode: RestoreMode = arg(args, "mode")?;
                svc.execute_restore(kind, mode).await?;
                Ok(json!({ "target": kind, "mode": mode }))
            }
            "get_config_content" => {
                let kind = target_arg(args)?;
                let content = svc
                    .get_config_content(kind, opt_arg(args, "file_name")?)
                    .await?;
                Ok(JsonValue::String(content))
            }
            "reorder_entries" => {
                let kind = target_arg(args)?;
                let entries = svc
                    .reorder_entries(kind, arg(args, "entries")?, arg(args, "from")?, arg(args, "to")?)
                    .await?;
                to_json(&entries)
            }
            "remove_entry" => {
                let kind = target_arg(args)?;
                let uid: Uuid = arg(args, "uid")?;
                to_json(&svc.remove_entry(kind, arg(args, "entries")?, uid).await?)
            }
            other => Err(CallError::Args(format!("Unknown tool '{other}'"))),
        }
    }
}

#[async_trait]
impl ServerHandlerCore for SyncServerHandler {
    async fn handle_request(
        &self,
        request: RequestFromClient,
        runtime: &dyn McpServer,
    ) -> std::result::Result<ResultFromServer, RpcError> {
        let method_name = request.method().to_owned();
        tracing::info!("handle_request: method={}", method_name);
        match request {
            RequestFromClient::ClientRequest(client_request) => match client_request {
                ClientRequest::InitializeRequest(initialize_request) => {
                    tracing::debug!(
                        "initialize_request: client_protocol={}",
                        initialize_request.params.protocol_version
                    );
                    let mut server_info = runtime.server_info().to_owned();
                    if let Some(updated_protocol_version) = enforce_compatible_protocol_version(
                        &initialize_request.params.protocol_version,
                        &server_info.protocol_version,
                    )
                    .map_err(|err| {
                        tracing::error!(
                            "incompatible protocol version (client={}, server={})",
                            initialize_request.params.protocol_version,
                            server_info.protocol_version
                        );
                        RpcError::internal_error().with_message(err.to_string())
                    })? {
                        server_info.protocol_version = updated_protocol_version;
                    }
                    tracing::info!("initialized (protocol={})", server_info.protocol_version);
                    Ok(server_info.into())
                }

                ClientRequest::ListToolsRequest(_) => {
                    let tools = self.tool_definitions();
                    tracing::info!("list_tools (count={})", tools.len());
                    Ok(ListToolsResult {
                        meta: None,
                        next_cursor: None,
                        tools,
                    }
                    .into())
                }

                ClientRequest::CallToolRequest(request) => {
                    let tool = request.tool_name().to_string();
                    let empty = JsonMap::new();
                    let args = request.params.arguments.as_ref().unwrap_or(&empty);
                    tracing::info!(
                        "call_tool request: tool={}, arg_keys={:?}",
                        tool,
                        args.keys().collect::<Vec<_>>()
                    );
                    if !self.has_tool(&tool) {
                        tracing::warn!("unknown tool: {}", tool);
                        return Err(RpcError::method_not_found()
                            .with_message(format!("Unknown tool '{}'", tool)));
                    }
                    let payload = match self.dispatch(&tool, args).await {
                        Ok(result) => json!({ "ok": true, "result": result }),
                        Err(CallError::Sync(e)) => {
                            tracing::warn!("{} failed: {}", tool, e);
                            json!({ "ok": false, "error": e.to_string() })
                        }
                        Err(CallError::Args(msg)) => {
                            tracing::error!("invalid arguments (tool={}): {}", tool, msg);
                            return Err(RpcError::invalid_params().with_message(msg));
                        }
                        Err(CallError::Internal(msg)) => {
                            tracing::error!("{} failed internally: {}", tool, msg);
                            return Err(RpcError::internal_error().with_message(msg));
                        }
                    };
                    Ok(CallToolResult::text_content(vec![TextContent::from(payload.to_string())]).into())
                }

                _ => {
                    tracing::warn!("method not implemented: {}", method_name);
                    Err(RpcError::method_not_found()
                        .with_message(format!("No handler is implemented for '{method_name}'.")))
                }
            },
            RequestFromClient::CustomRequest(_) => {
                tracing::warn!("custom request not implemented");
                Err(RpcError::method_not_found()
                    .with_message("No handler is implemented for custom requests.".to_string()))
            }
        }
    }

    async fn handle_notification(
        &self,
        notification: NotificationFromClient,
        _: &dyn McpServer,
    ) -> std::result::Result<(), RpcError> {
        match &notification {
            NotificationFromClient::ClientNotification(_) => {
                tracing::debug!("handle_notification: client notification")
            }
            NotificationFromClient::CustomNotification(_) => {
                tracing::debug!("handle_notification: custom notification")
            }
        }
        Ok(())
    }

    async fn handle_error(
        &self,
        error: &RpcError,
        _: &dyn McpServer,
    ) -> std::result::Result<(), RpcError> {
        tracing::error!(
            "handle_error from client (code={:?}, message={:?})",
            error.code,
            error.message
        );
        Ok(())
    }
}
