use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid quality label: {0}")]
    InvalidQuality(String),
    #[error("invalid media URL: {0}")]
    InvalidUrl(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
