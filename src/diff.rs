//! Set difference between the current scan and the persisted record.

use std::collections::HashSet;

use crate::models::Blob;

/// Work orders produced by one diff: blobs the remote is missing and ids it
/// should drop.
#[derive(Debug, Default)]
pub struct BlobDiff {
    pub to_upload: Vec<Blob>,
    pub to_delete: Vec<String>,
}

/// Compare freshly chunked blobs against the previously recorded ids.
///
/// Membership is decided purely on blob ids, so an edited window shows up as
/// one delete plus one upload and an untouched window shows up in neither
/// list. Input order is preserved on both sides.
pub fn diff_blobs(current: Vec<Blob>, previous: &[String]) -> BlobDiff {
    let current_ids: HashSet<&str> = current.iter().map(|b| b.id.as_str()).collect();
    let to_delete: Vec<String> = previous
        .iter()
        .filter(|id| !current_ids.contains(id.as_str()))
        .cloned()
        .collect();

    let previous_ids: HashSet<&str> = previous.iter().map(String::as_str).collect();
    let to_upload: Vec<Blob> = current
        .into_iter()
        .filter(|b| !previous_ids.contains(b.id.as_str()))
        .collect();

    BlobDiff {
        to_upload,
        to_delete,
    }
}
