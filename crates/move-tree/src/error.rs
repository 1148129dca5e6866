//! Core error types

use thiserror::Error;

use crate::path::Path;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("illegal move '{san}' in position {fen}")]
    IllegalMove { san: String, fen: String },

    #[error("bad position: {0}")]
    BadPosition(String),
}

impl TreeError {
    pub(crate) fn invalid_path(path: &Path, reason: impl Into<String>) -> Self {
        TreeError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
