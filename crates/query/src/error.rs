use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("At least one field must be selected")]
    NoFieldsSelected,

    #[error("Query execution failed: {0}")]
    QueryExecutionFailure(String),

    #[error("Another query is already running on this executor")]
    QueryInProgress,

    #[error("Query was cancelled")]
    Cancelled,

    #[error("Field '{0}' cannot be queried")]
    InvalidField(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] core_types::CoreError),
}
