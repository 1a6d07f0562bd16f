use thiserror::Error;

#[derive(Error, Debug)]
pub enum MerkledropError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Allocation index mismatch: expected {expected}, got {got}")]
    IndexMismatch { expected: u64, got: u64 },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, MerkledropError>;
