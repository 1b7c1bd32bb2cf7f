use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpannerDbError {
    #[error("SQL statement is not supported: {0}")]
    UnsupportedStatement(String),

    #[error("Unsupported column type: {0}")]
    UnsupportedColumnType(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Cursor error: {0}")]
    CursorError(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
