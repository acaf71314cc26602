//! Error types shared across the indexing pipeline.
//!
//! Fatal conditions are carried by [`UplinkError`]; recoverable per-entry
//! problems found during a tree walk are [`ScanWarning`]s and ride along in
//! the run report instead of aborting it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UplinkError {
    /// The caller-supplied path could not be resolved to a project identity.
    #[error("invalid project path '{input}': {reason}")]
    InvalidPath { input: String, reason: String },

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// The remote endpoint could not be reached at all (connect, DNS, timeout).
    #[error("remote index unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote endpoint answered with a non-success status.
    #[error("remote index returned {status}: {message}")]
    RemoteApi { status: u16, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("state document is not valid JSON: {0}")]
    StateCorrupted(#[from] serde_json::Error),
}

impl UplinkError {
    pub fn invalid_path(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// A skipped directory entry or unreadable file. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    /// Offending path, when the walker could attribute one.
    pub path: Option<PathBuf>,
    pub message: String,
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}: {}", p.display(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
