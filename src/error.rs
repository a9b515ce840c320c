use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Import,
    Storage,
    InvalidInput,
    Io,
    Internal,
}

/// Error type of the data-access core. `Import` and `Storage` are the
/// caller-relevant categories; a zero-row query result is not an error and
/// never produces one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitterError {
    pub code: ErrorCode,
    pub message: String,
}

impl BitterError {
    pub(crate) fn import(message: String) -> Self {
        Self {
            code: ErrorCode::Import,
            message,
        }
    }

    pub(crate) fn storage(message: String) -> Self {
        Self {
            code: ErrorCode::Storage,
            message,
        }
    }
}

impl fmt::Display for BitterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for BitterError {}
