//! Core data types that flow through the indexing and search pipeline.

use serde::{Deserialize, Serialize};

/// One fixed window of file lines, the unit of upload and invalidation.
///
/// Serialized in the camelCase wire form expected by the remote index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// Deterministic id: `{file}:{start}-{end}:{fingerprint}`.
    pub id: String,
    /// Path relative to the project root, forward slashes.
    pub file: String,
    /// First line of the window, 1-based.
    pub start_line: usize,
    /// Last line of the window, 1-based inclusive.
    pub end_line: usize,
    pub content: String,
}

/// A ranked hit returned by the remote search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub snippet: String,
}

/// Which remote call a failed batch belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Upload,
    Delete,
}

/// One failed remote batch, kept for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub operation: BatchOperation,
    /// Number of blobs (or blob ids) the batch carried.
    pub blobs: usize,
    pub error: String,
}

/// Outcome of one indexing run.
///
/// `uploaded` and `deleted` count what actually landed in the local record;
/// a run with a non-empty `failures` list completed but left the remote
/// index behind the working tree for the failed batches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub uploaded: usize,
    pub deleted: usize,
    pub failures: Vec<BatchFailure>,
    pub warnings: Vec<String>,
}

impl IndexReport {
    pub fn is_partial_failure(&self) -> bool {
        !self.failures.is_empty()
    }
}
