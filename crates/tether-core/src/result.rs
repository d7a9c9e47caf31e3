//! Convenience result type alias for Tether.

use crate::error::AppError;

/// A specialized `Result` type for Tether operations.
pub type AppResult<T> = Result<T, AppError>;
