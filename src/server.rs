use anyhow::Context;
use rmcp::{
    ServerHandler, ServiceExt,
    model::{
        CallToolRequestParam, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
        Implementation, JsonObject, ListPromptsResult, ListResourceTemplatesResult,
        ListResourcesResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ReadResourceRequestParam, ReadResourceResult, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
};
use schemars::JsonSchema;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::Database;
use crate::prompts::PromptRegistry;
use crate::resources;
use crate::tools::query::{self, QueryRequest};

pub const SQL_QUERY_TOOL: &str = "sql_query";

#[derive(Debug, Clone)]
pub struct SqliteHandler {
    db: Arc<Database>,
    tools: Arc<Vec<Tool>>,
    prompts: Arc<PromptRegistry>,
}

impl SqliteHandler {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            tools: Arc::new(Self::get_tools()),
            prompts: Arc::new(PromptRegistry::default()),
        }
    }

    fn get_tools() -> Vec<Tool> {
        vec![Tool::new(
            SQL_QUERY_TOOL,
            "Execute a read-only SQL query. Only a single statement starting with SELECT is allowed; \
             returns column names and rows.",
            input_schema::<QueryRequest>(),
        )]
    }

    pub async fn call_tool_by_name(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        tracing::debug!(tool = name, "Tool call");
        match name {
            SQL_QUERY_TOOL => {
                let params: QueryRequest =
                    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
                        .map_err(|e| rmcp::ErrorData::invalid_params(e.to_string(), None))?;

                let result = query::run_query(&self.db, &params.query)
                    .await
                    .map_err(rmcp::ErrorData::from)?;

                let structured = serde_json::to_value(&result)
                    .map_err(|e| rmcp::ErrorData::internal_error(e.to_string(), None))?;
                let text = serde_json::to_string_pretty(&structured)
                    .map_err(|e| rmcp::ErrorData::internal_error(e.to_string(), None))?;

                Ok(CallToolResult {
                    content: vec![Content::text(text)],
                    structured_content: Some(structured),
                    is_error: Some(false),
                })
            }
            _ => Err(rmcp::ErrorData::invalid_params(
                format!("Tool '{name}' not found"),
                None,
            )),
        }
    }

    pub async fn read_resource_by_uri(
        &self,
        uri: &str,
    ) -> Result<ReadResourceResult, rmcp::ErrorData> {
        tracing::debug!(uri, "Resource read");
        resources::read_resource(&self.db, uri).await.map_err(|e| {
            tracing::warn!(uri, error = %e, "Resource read failed");
            rmcp::ErrorData::from(e)
        })
    }

    async fn list_tools_handler(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ListToolsResult, rmcp::ErrorData> {
        Ok(ListToolsResult {
            tools: self.tools.as_ref().clone(),
            next_cursor: None,
        })
    }

    async fn call_tool_handler(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<rmcp::service::RoleServer>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        self.call_tool_by_name(request.name.as_ref(), request.arguments)
            .await
    }

    async fn list_resources_handler(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ListResourcesResult, rmcp::ErrorData> {
        let resources = resources::list_resources(&self.db)
            .await
            .map_err(rmcp::ErrorData::from)?;
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn list_resource_templates_handler(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ListResourceTemplatesResult, rmcp::ErrorData> {
        Ok(ListResourceTemplatesResult {
            resource_templates: resources::list_resource_templates()
                .map_err(rmcp::ErrorData::from)?,
            next_cursor: None,
        })
    }

    async fn read_resource_handler(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ReadResourceResult, rmcp::ErrorData> {
        self.read_resource_by_uri(&request.uri).await
    }

    async fn list_prompts_handler(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ListPromptsResult, rmcp::ErrorData> {
        let prompts = self
            .prompts
            .list()
            .map_err(|e| rmcp::ErrorData::internal_error(e.to_string(), None))?;
        Ok(ListPromptsResult {
            prompts,
            next_cursor: None,
        })
    }

    async fn get_prompt_handler(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<rmcp::service::RoleServer>,
    ) -> Result<GetPromptResult, rmcp::ErrorData> {
        self.prompts.get(&request.name, request.arguments.as_ref())
    }
}

/// Top-level JSON schema object for a tool's argument struct.
fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(T).schema) {
        Ok(Value::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

impl ServerHandler for SqliteHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::from_build_env()
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                resources: Some(Default::default()),
                prompts: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(
                "Read-only access to a SQLite database. Read schema://sqlite/all or \
                schema://sqlite/{table} for table definitions, call sql_query with a single \
                SELECT statement, and use analyze_table_prompt / describe_query_prompt for \
                analysis templates."
                    .into(),
            ),
        }
    }

    fn list_tools(
        &self,
        request: Option<PaginatedRequestParam>,
        context: RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        self.list_tools_handler(request, context)
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        self.call_tool_handler(request, context)
    }

    fn list_resources(
        &self,
        request: Option<PaginatedRequestParam>,
        context: RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, rmcp::ErrorData>> + Send + '_
    {
        self.list_resources_handler(request, context)
    }

    fn list_resource_templates(
        &self,
        request: Option<PaginatedRequestParam>,
        context: RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourceTemplatesResult, rmcp::ErrorData>>
    + Send
    + '_ {
        self.list_resource_templates_handler(request, context)
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        context: RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, rmcp::ErrorData>> + Send + '_
    {
        self.read_resource_handler(request, context)
    }

    fn list_prompts(
        &self,
        request: Option<PaginatedRequestParam>,
        context: RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListPromptsResult, rmcp::ErrorData>> + Send + '_
    {
        self.list_prompts_handler(request, context)
    }

    fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        context: RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<GetPromptResult, rmcp::ErrorData>> + Send + '_
    {
        self.get_prompt_handler(request, context)
    }
}

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let db_path = config.database_path();
    let db = Database::open(&db_path, Duration::from_millis(config.busy_timeout_ms))
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let db = Arc::new(db);
    tracing::info!(path = %db.path().display(), "Serving database over stdio");
    let handler = SqliteHandler::new(db);

    // Serve the handler with stdio transport
    let server = handler
        .serve(stdio())
        .await
        .context("Failed to start MCP stdio transport")?;

    let reason = server.waiting().await?;
    tracing::info!(?reason, "MCP server shutdown complete");

    Ok(())
}
