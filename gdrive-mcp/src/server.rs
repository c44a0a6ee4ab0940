//! MCP server surface for the Drive adapter.
//!
//! The four operations are registered as MCP tools with schemars-derived
//! parameter schemas. Every tool accepts a `session_id` argument for
//! uniformity with the agent runtime's calling convention; it is never used.

use crate::content::DocContent;
use crate::drive::{DriveClient, ReadOutcome};
use crate::link::extract_file_id;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

pub const CREATE_TOOL: &str = "create_google_doc";
pub const SHARE_TOOL: &str = "share_google_doc";
pub const READ_TOOL: &str = "read_google_doc";
pub const EXTRACT_TOOL: &str = "get_file_id_from_url";

/// Arguments for `create_google_doc`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateDocArgs {
    /// Session identifier supplied by the agent runtime. Unused.
    #[serde(default)]
    pub session_id: Option<String>,
    /// The title of the Google Docs document to create.
    pub title: String,
    /// The textual content to insert into the document.
    pub content: DocContent,
    /// The ID of the Google Drive folder where the document should be created.
    #[serde(default)]
    pub folder_id: Option<String>,
}

/// Arguments for `share_google_doc`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ShareDocArgs {
    /// Session identifier supplied by the agent runtime. Unused.
    #[serde(default)]
    pub session_id: Option<String>,
    /// The ID of the Google Drive file to share.
    pub file_id: String,
    /// The email address of the user to share the file with.
    pub email: String,
    /// The access role to grant (e.g. 'reader', 'commenter', 'writer').
    /// Defaults to 'writer'.
    #[serde(default)]
    pub role: Option<String>,
}

/// Arguments for `read_google_doc`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadDocArgs {
    /// Session identifier supplied by the agent runtime. Unused.
    #[serde(default)]
    pub session_id: Option<String>,
    /// The URL of the Google Drive file.
    pub file_url: String,
}

/// Arguments for `get_file_id_from_url`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractIdArgs {
    /// Session identifier supplied by the agent runtime. Unused.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Google Drive link to extract the file ID from.
    pub url: String,
}

/// Strip schema fields some LLM APIs reject.
fn sanitize_schema(value: &mut Value) {
    if let Value::Object(map) = value {
        map.remove("$schema");
        map.remove("definitions");
        map.remove("additionalProperties");
        for (_, v) in map.iter_mut() {
            sanitize_schema(v);
        }
    } else if let Value::Array(arr) = value {
        for v in arr.iter_mut() {
            sanitize_schema(v);
        }
    }
}

fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    let settings = schemars::r#gen::SchemaSettings::draft07().with(|s| s.inline_subschemas = true);
    let schema = settings.into_generator().into_root_schema_for::<T>();
    let mut value =
        serde_json::to_value(schema).expect("unreachable error: schema serialization failed");
    sanitize_schema(&mut value);
    match value {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

fn tool_definitions() -> Vec<Tool> {
    vec![
        Tool::new(
            CREATE_TOOL,
            "Create a new Google Docs document with the specified title and content. \
             Returns the file ID of the newly created document.",
            input_schema::<CreateDocArgs>(),
        ),
        Tool::new(
            SHARE_TOOL,
            "Share a Google Doc file with a specified user by email with a given access role. \
             Returns a confirmation message.",
            input_schema::<ShareDocArgs>(),
        ),
        Tool::new(
            READ_TOOL,
            "Reads the content of a Google Docs or plain text file from Google Drive, \
             given its URL.",
            input_schema::<ReadDocArgs>(),
        ),
        Tool::new(
            EXTRACT_TOOL,
            "Extract the Drive file ID from a share URL. The Drive API requires file IDs \
             to share docs.",
            input_schema::<ExtractIdArgs>(),
        ),
    ]
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ErrorData> {
    serde_json::from_value(args)
        .map_err(|e| ErrorData::invalid_params(format!("invalid tool arguments: {e}"), None))
}

fn tool_failure(error: impl std::fmt::Display) -> CallToolResult {
    warn!(error = %error, "tool call failed");
    CallToolResult::error(vec![Content::text(error.to_string())])
}

/// MCP handler serving the Drive tools.
#[derive(Clone)]
pub struct DriveToolServer {
    drive: Arc<DriveClient>,
}

impl DriveToolServer {
    pub fn new(drive: DriveClient) -> Self {
        Self { drive: Arc::new(drive) }
    }

    /// Dispatch a tool call by name. Domain failures become MCP tool errors;
    /// malformed arguments become protocol errors.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<CallToolResult, ErrorData> {
        info!(tool = name, "tool invoked");
        match name {
            CREATE_TOOL => {
                let args: CreateDocArgs = parse_args(args)?;
                match self
                    .drive
                    .create_document(&args.title, args.content, args.folder_id.as_deref())
                    .await
                {
                    Ok(file_id) => Ok(CallToolResult::success(vec![Content::text(
                        json!({"file_id": file_id}).to_string(),
                    )])),
                    Err(e) => Ok(tool_failure(e)),
                }
            }
            SHARE_TOOL => {
                let args: ShareDocArgs = parse_args(args)?;
                match self
                    .drive
                    .share_document(&args.file_id, &args.email, args.role.as_deref())
                    .await
                {
                    Ok(confirmation) => {
                        Ok(CallToolResult::success(vec![Content::text(confirmation)]))
                    }
                    Err(e) => Ok(tool_failure(e)),
                }
            }
            READ_TOOL => {
                let args: ReadDocArgs = parse_args(args)?;
                match self.drive.read_document(&args.file_url).await {
                    Ok(ReadOutcome::Content(text)) => Ok(CallToolResult::success(vec![
                        Content::text(json!({"status": "content", "content": text}).to_string()),
                    ])),
                    Ok(ReadOutcome::Empty) => Ok(CallToolResult::success(vec![Content::text(
                        json!({"status": "empty"}).to_string(),
                    )])),
                    Err(e) => Ok(tool_failure(
                        json!({"status": "failed", "reason": e.to_string()}).to_string(),
                    )),
                }
            }
            EXTRACT_TOOL => {
                let args: ExtractIdArgs = parse_args(args)?;
                match extract_file_id(&args.url) {
                    Ok(file_id) => Ok(CallToolResult::success(vec![Content::text(file_id)])),
                    Err(e) => Ok(tool_failure(e)),
                }
            }
            other => Err(ErrorData::invalid_params(format!("unknown tool: {other}"), None)),
        }
    }
}

impl ServerHandler for DriveToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Google Drive tools: create documents, share them, read their content, \
                 and extract file IDs from share links."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult { tools: tool_definitions(), next_cursor: None })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let args = Value::Object(request.arguments.unwrap_or_default());
        self.dispatch(request.name.as_ref(), args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definitions() {
        let tools = tool_definitions();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names, vec![CREATE_TOOL, SHARE_TOOL, READ_TOOL, EXTRACT_TOOL]);
    }

    #[test]
    fn test_every_tool_accepts_session_id() {
        for tool in tool_definitions() {
            let properties = tool.input_schema.get("properties").and_then(Value::as_object);
            let properties = properties.unwrap_or_else(|| {
                panic!("tool {} has no properties object", tool.name);
            });
            assert!(
                properties.contains_key("session_id"),
                "tool {} is missing session_id",
                tool.name
            );
        }
    }

    #[test]
    fn test_schemas_are_sanitized() {
        for tool in tool_definitions() {
            let raw = serde_json::to_string(&tool.input_schema).unwrap();
            assert!(!raw.contains("$schema"), "tool {} leaks $schema", tool.name);
        }
    }

    #[test]
    fn test_create_args_accept_both_content_forms() {
        let plain: CreateDocArgs = serde_json::from_value(json!({
            "session_id": "s1", "title": "Notes", "content": "body"
        }))
        .unwrap();
        let wrapped: CreateDocArgs = serde_json::from_value(json!({
            "session_id": "s1", "title": "Notes", "content": {"text": "body"}
        }))
        .unwrap();
        assert_eq!(plain.content.as_text(), wrapped.content.as_text());
    }

    #[test]
    fn test_share_args_role_is_optional() {
        let args: ShareDocArgs = serde_json::from_value(json!({
            "file_id": "abc", "email": "a@b.c"
        }))
        .unwrap();
        assert!(args.role.is_none());
    }
}
