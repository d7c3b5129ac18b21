//! Prompt templates offered to the client

use rmcp::model::{
    GetPromptResult, JsonObject, Prompt, PromptArgument, PromptMessage, PromptMessageRole,
};
use serde_json::json;
use std::collections::BTreeMap;

/// A fixed template with one substituted argument.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub argument: &'static str,
    pub argument_description: &'static str,
    pub render: fn(&str) -> String,
}

pub fn analyze_table_prompt(table: &str) -> String {
    format!(
        "Analyze the table '{table}' from the SQLite database. Provide insights about the data structure, \
         list key columns, and suggest potential data cleaning or further analysis steps."
    )
}

pub fn describe_query_prompt(query: &str) -> String {
    format!(
        "I executed the following SQL query:\n\n{query}\n\n\
         Please explain what this query does, interpret the results, and suggest improvements if applicable."
    )
}

const TEMPLATES: [PromptTemplate; 2] = [
    PromptTemplate {
        name: "analyze_table_prompt",
        description: "Ask the model to analyze a table's structure and data",
        argument: "table",
        argument_description: "Name of the database table to analyze",
        render: analyze_table_prompt,
    },
    PromptTemplate {
        name: "describe_query_prompt",
        description: "Ask the model to explain a SQL query and suggest improvements",
        argument: "query",
        argument_description: "The SQL query to describe",
        render: describe_query_prompt,
    },
];

/// Name → template lookup, built once when the server starts.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    templates: BTreeMap<&'static str, PromptTemplate>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self {
            templates: TEMPLATES.iter().map(|t| (t.name, *t)).collect(),
        }
    }
}

impl PromptRegistry {
    pub fn list(&self) -> Result<Vec<Prompt>, serde_json::Error> {
        self.templates
            .values()
            .map(|t| {
                let argument: PromptArgument = serde_json::from_value(json!({
                    "name": t.argument,
                    "description": t.argument_description,
                    "required": true,
                }))?;
                Ok(Prompt::new(t.name, Some(t.description), Some(vec![argument])))
            })
            .collect()
    }

    /// Render `name` with its argument taken from `arguments`.
    pub fn get(
        &self,
        name: &str,
        arguments: Option<&JsonObject>,
    ) -> Result<GetPromptResult, rmcp::ErrorData> {
        let template = self.templates.get(name).ok_or_else(|| {
            rmcp::ErrorData::invalid_params(format!("Prompt '{name}' not found"), None)
        })?;

        let value = arguments
            .and_then(|args| args.get(template.argument))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                rmcp::ErrorData::invalid_params(
                    format!("Missing required argument '{}'", template.argument),
                    None,
                )
            })?;

        tracing::debug!(prompt = name, "Rendering prompt");
        Ok(GetPromptResult {
            description: Some(template.description.to_string()),
            messages: vec![PromptMessage::new_text(
                PromptMessageRole::User,
                (template.render)(value),
            )],
        })
    }
}
