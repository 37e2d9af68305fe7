use thiserror::Error;

/// Request-level failures. Everything finer grained (tiny regions, unreadable
/// regions, failed lookups) is folded into the result instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not read image file: {0}")]
    Input(String),

    #[error("Detector failed: {0}")]
    Detector(String),

    #[error("Region worker aborted: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
