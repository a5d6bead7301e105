use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Document produced no usable text")]
    EmptyContent,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
