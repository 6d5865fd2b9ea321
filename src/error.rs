use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("Invalid row rule pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Column '{column}' is listed in both column set '{first}' and column set '{second}'")]
    OverlappingColumnSets {
        column: String,
        first: String,
        second: String,
    },

    #[error("Invalid configuration for table '{table}': {details}")]
    InvalidConfig { table: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatementError>;
