use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteMcpError {
    #[error("Cannot open database: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SqliteMcpError {
    /// A failed read of `sqlite_master`. The request carried nothing that
    /// could have caused it, so it surfaces as a server-side error.
    pub fn catalog(err: rusqlite::Error) -> Self {
        Self::Connection(format!("Failed to read schema catalog: {err}"))
    }

    /// Short machine-readable tag attached to protocol errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Query(_) => "query",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<rusqlite::Error> for SqliteMcpError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::MultipleStatement => {
                Self::PermissionDenied("Multiple statements are not allowed".into())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

impl From<SqliteMcpError> for rmcp::ErrorData {
    fn from(err: SqliteMcpError) -> Self {
        let data = Some(json!({ "kind": err.kind() }));
        let message = err.to_string();
        match err {
            SqliteMcpError::NotFound(_) => rmcp::ErrorData::resource_not_found(message, data),
            SqliteMcpError::PermissionDenied(_) => rmcp::ErrorData::invalid_request(message, data),
            SqliteMcpError::Query(_) => rmcp::ErrorData::invalid_params(message, data),
            SqliteMcpError::Connection(_) | SqliteMcpError::Serialization(_) => {
                rmcp::ErrorData::internal_error(message, data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_error_codes() {
        let err: rmcp::ErrorData = SqliteMcpError::NotFound("Table 'x'".into()).into();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
        assert_eq!(err.data, Some(json!({ "kind": "not_found" })));

        let err: rmcp::ErrorData = SqliteMcpError::PermissionDenied("no".into()).into();
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        assert!(err.message.contains("Permission denied"));

        let err: rmcp::ErrorData = SqliteMcpError::Query("no such table: t".into()).into();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("no such table: t"));

        let err: rmcp::ErrorData = SqliteMcpError::Connection("missing".into()).into();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn test_catalog_failure_is_internal() {
        let err = SqliteMcpError::catalog(rusqlite::Error::InvalidQuery);
        assert!(matches!(err, SqliteMcpError::Connection(_)));

        let err: rmcp::ErrorData = err.into();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(err.data, Some(json!({ "kind": "connection" })));
    }

    #[test]
    fn test_multiple_statement_maps_to_permission_denied() {
        let err = SqliteMcpError::from(rusqlite::Error::MultipleStatement);
        assert!(matches!(err, SqliteMcpError::PermissionDenied(_)));
    }
}
