use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The model did not answer within the request deadline.
    #[error("model request timed out; retry or upload a smaller image")]
    Timeout,

    #[error("model request failed: {0}")]
    Http(String),

    /// The model ignored the prompt contract and answered with prose or
    /// markdown instead of a bare JSON object.
    #[error("model returned non-JSON output")]
    NonJsonOutput,

    #[error("model JSON parse failed: {0}")]
    ParseFailed(String),
}
