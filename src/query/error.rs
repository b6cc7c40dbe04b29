use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Unsupported filter operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid filter value for {column}: {reason}")]
    InvalidValue { column: String, reason: String },
}
