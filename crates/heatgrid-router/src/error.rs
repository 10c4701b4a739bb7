//! Router error types.

use thiserror::Error;

/// Errors raised while building routing policy.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("release threshold {release} must be below freeze threshold {freeze}")]
    InvalidBand { freeze: i32, release: i32 },
}

pub type RouterResult<T> = Result<T, RouterError>;
