use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Failed to read file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to serialize to JSON: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Failed to extract a script from the response: {0}")]
    ScriptGeneration(String),
    #[error("Unusable structure snapshot: {0}")]
    InvalidStructure(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
