use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection failure, timeout or non-2xx status from the chat endpoint.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered 2xx but the message content was not where expected.
    #[error("Unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid model response: {0}")]
    Validation(#[source] Box<Error>),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Configuration problems never heal by trying again; everything else might.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
