use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
