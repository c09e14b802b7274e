#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Schema invariant broken (e.g. a duplicate metric name for one item).
    /// Programmer error; the engine surfaces it and fails the run.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}
