//! `schema://sqlite/...` resources

use rmcp::model::{
    AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents, ResourceTemplate,
};
use serde_json::json;

use crate::db::Database;
use crate::error::SqliteMcpError;

pub const URI_PREFIX: &str = "schema://sqlite/";
pub const ALL_SCHEMAS_URI: &str = "schema://sqlite/all";
pub const TABLE_SCHEMA_TEMPLATE: &str = "schema://sqlite/{table}";

/// A parsed schema resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaResource {
    All,
    Table(String),
}

impl SchemaResource {
    pub fn parse(uri: &str) -> Result<Self, SqliteMcpError> {
        match uri.strip_prefix(URI_PREFIX) {
            Some("all") => Ok(Self::All),
            Some(table) if !table.is_empty() => Ok(Self::Table(table.to_string())),
            _ => Err(SqliteMcpError::NotFound(format!("Unknown resource URI '{uri}'"))),
        }
    }

    pub fn uri(&self) -> String {
        match self {
            Self::All => ALL_SCHEMAS_URI.to_string(),
            Self::Table(table) => format!("{URI_PREFIX}{table}"),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::All => "application/json",
            Self::Table(_) => "text/plain",
        }
    }

    /// Schema text for this resource.
    pub async fn read(&self, db: &Database) -> Result<String, SqliteMcpError> {
        match self {
            Self::All => Ok(serde_json::to_string_pretty(&db.all_schemas().await?)?),
            Self::Table(table) => db.table_schema(table).await,
        }
    }
}

pub async fn read_resource(db: &Database, uri: &str) -> Result<ReadResourceResult, SqliteMcpError> {
    let resource = SchemaResource::parse(uri)?;
    let text = resource.read(db).await?;
    tracing::debug!(uri, bytes = text.len(), "Read schema resource");

    let mut contents = ResourceContents::text(text, resource.uri());
    if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
        *mime_type = Some(resource.mime_type().to_string());
    }

    Ok(ReadResourceResult {
        contents: vec![contents],
    })
}

/// `schema://sqlite/all` followed by one resource per table.
pub async fn list_resources(db: &Database) -> Result<Vec<Resource>, SqliteMcpError> {
    let mut entries = vec![(
        SchemaResource::All,
        "all".to_string(),
        "Creation statements of every table, as a JSON object keyed by table name".to_string(),
    )];
    for table in db.table_names().await? {
        // Its URI is taken by the all-schemas resource, which already carries it.
        if table == "all" {
            continue;
        }
        let description = format!("Creation statement of table '{table}'");
        entries.push((SchemaResource::Table(table.clone()), table, description));
    }

    Ok(entries
        .into_iter()
        .map(|(resource, name, description)| {
            let mut raw = RawResource::new(resource.uri(), name);
            raw.description = Some(description);
            raw.mime_type = Some(resource.mime_type().to_string());
            raw.no_annotation()
        })
        .collect())
}

pub fn list_resource_templates() -> Result<Vec<ResourceTemplate>, SqliteMcpError> {
    let template = serde_json::from_value(json!({
        "uriTemplate": TABLE_SCHEMA_TEMPLATE,
        "name": "table_schema",
        "description": "Creation statement of a single table",
        "mimeType": "text/plain",
    }))?;
    Ok(vec![template])
}
