use schemars::JsonSchema;
use serde::Deserialize;

use crate::db::{Database, QueryResult};
use crate::error::SqliteMcpError;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryRequest {
    #[schemars(description = "A single read-only SELECT statement")]
    #[serde(alias = "sql")]
    pub query: String,
}

/// Reject anything that is not exactly one SELECT statement.
pub fn validate_select_query(sql: &str) -> Result<(), SqliteMcpError> {
    let trimmed = sql.trim();
    let is_select = trimmed
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"));
    if !is_select {
        return Err(SqliteMcpError::PermissionDenied(
            "Only SELECT queries are allowed".into(),
        ));
    }

    if has_trailing_statement(trimmed) {
        return Err(SqliteMcpError::PermissionDenied(
            "Multiple statements are not allowed".into(),
        ));
    }

    Ok(())
}

pub async fn run_query(db: &Database, sql: &str) -> Result<QueryResult, SqliteMcpError> {
    if let Err(e) = validate_select_query(sql) {
        tracing::warn!(query = sql, error = %e, "Rejected query");
        return Err(e);
    }

    let result = db.select(sql).await?;
    tracing::info!(rows = result.row_count, "SQL query executed successfully");
    Ok(result)
}

#[derive(Clone, Copy, PartialEq)]
enum Lex {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// True when anything other than whitespace, comments or further `;` follows
/// the first statement terminator. String literals, quoted identifiers and
/// comments are skipped so a `;` inside them does not count.
fn has_trailing_statement(sql: &str) -> bool {
    let mut state = Lex::Code;
    let mut terminated = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Lex::Code => match c {
                '\'' | '"' | '`' => state = Lex::Quoted(c),
                '[' => state = Lex::Quoted(']'),
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = Lex::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = Lex::BlockComment;
                }
                ';' => terminated = true,
                c if c.is_whitespace() => {}
                _ if terminated => return true,
                _ => {}
            },
            // A doubled quote re-enters the same state on the next char.
            Lex::Quoted(close) if c == close => state = Lex::Code,
            Lex::Quoted(_) => {}
            Lex::LineComment if c == '\n' => state = Lex::Code,
            Lex::LineComment => {}
            Lex::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                chars.next();
                state = Lex::Code;
            }
            Lex::BlockComment => {}
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::create_sample_database;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("startups.db");
        create_sample_database(&db_path).unwrap();
        let db = Database::open(&db_path, Duration::from_millis(100)).unwrap();
        (db, temp_dir)
    }

    #[test]
    fn test_accepts_select() {
        for sql in [
            "SELECT 1",
            "select * from startups",
            "  \n\tSeLeCt name FROM t  ",
            "SELECT 1;",
            "SELECT 1; -- trailing comment",
            "SELECT 1; /* done */ ;",
            "SELECT 'a;b' AS s",
            "SELECT \"odd;name\" FROM t",
            "SELECT [x;y] FROM t",
            "SELECT 'it''s; fine'",
            "SELECT 1 -- comment; DROP TABLE t\n",
            "SELECT 1 /* ; DELETE FROM t */",
        ] {
            assert!(validate_select_query(sql).is_ok(), "should accept: {sql}");
        }
    }

    #[test]
    fn test_rejects_non_select() {
        for sql in [
            "",
            "   ",
            "DELETE FROM startups",
            "drop table startups",
            "INSERT INTO startups (startup_name) VALUES ('x')",
            "UPDATE startups SET funding_amount = 0",
            "PRAGMA table_info(startups)",
            "WITH t AS (SELECT 1) SELECT * FROM t",
            "-- SELECT\nDELETE FROM startups",
            "SELEC",
        ] {
            assert!(
                matches!(
                    validate_select_query(sql),
                    Err(SqliteMcpError::PermissionDenied(_))
                ),
                "should reject: {sql}"
            );
        }
    }

    #[test]
    fn test_rejects_multiple_statements() {
        for sql in [
            "SELECT 1; DROP TABLE x;",
            "SELECT 1;SELECT 2",
            "SELECT ';'; DELETE FROM t",
            "SELECT 1; -- c\nDELETE FROM t",
        ] {
            assert!(
                matches!(
                    validate_select_query(sql),
                    Err(SqliteMcpError::PermissionDenied(msg)) if msg.contains("Multiple")
                ),
                "should reject: {sql}"
            );
        }
    }

    #[tokio::test]
    async fn test_run_query_funding_filter() {
        let (db, _temp_dir) = sample_db();
        let result = run_query(&db, "SELECT * FROM startups WHERE funding_amount > 10000000")
            .await
            .unwrap();

        assert_eq!(result.row_count, 2);
        let name_idx = result
            .columns
            .iter()
            .position(|c| c == "startup_name")
            .unwrap();
        let funding_idx = result
            .columns
            .iter()
            .position(|c| c == "funding_amount")
            .unwrap();

        let names: Vec<_> = result.rows.iter().map(|r| r[name_idx].clone()).collect();
        assert_eq!(names, vec![json!("BetaSoft"), json!("Delta Ventures")]);
        for row in &result.rows {
            assert!(row[funding_idx].as_f64().unwrap() > 10_000_000.0);
        }
    }

    #[tokio::test]
    async fn test_run_query_unknown_table_is_query_error() {
        let (db, _temp_dir) = sample_db();
        let result = run_query(&db, "SELECT * FROM nonexistent_table").await;
        match result {
            Err(SqliteMcpError::Query(msg)) => assert!(msg.contains("nonexistent_table")),
            other => panic!("expected query error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_query_rejects_before_database() {
        let (db, _temp_dir) = sample_db();
        let result = run_query(&db, "DELETE FROM startups").await;
        assert!(matches!(result, Err(SqliteMcpError::PermissionDenied(_))));

        let count = run_query(&db, "SELECT COUNT(*) FROM startups").await.unwrap();
        assert_eq!(count.rows[0][0], json!(5));
    }

    #[test]
    fn test_request_accepts_sql_alias() {
        let req: QueryRequest = serde_json::from_value(json!({ "sql": "SELECT 1" })).unwrap();
        assert_eq!(req.query, "SELECT 1");
        let req: QueryRequest = serde_json::from_value(json!({ "query": "SELECT 2" })).unwrap();
        assert_eq!(req.query, "SELECT 2");
    }
}
