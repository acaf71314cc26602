//! Indexing pipeline.
//!
//! One run of [`index_project`]: scan the tree, chunk every file, diff the
//! blob ids against the stored record, upload the new blobs in batches, then
//! retire the stale ids remotely. Every acknowledged batch is committed to
//! the state store as it lands, so an interrupted run keeps its acknowledged
//! work and a re-run picks up exactly the remainder.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::chunker::chunk_lines;
use crate::config::Config;
use crate::diff::diff_blobs;
use crate::error::{ScanWarning, UplinkError};
use crate::identity::ProjectPath;
use crate::models::{BatchFailure, BatchOperation, Blob, IndexReport};
use crate::remote::RemoteClient;
use crate::scanner::{self, FileEntry};
use crate::store::IndexStore;

/// Bounded parallelism for file reads.
const FILE_CONCURRENCY: usize = 8;
/// In-flight window for upload batches.
const BATCH_CONCURRENCY: usize = 4;

/// Run one full index pass for `project`.
///
/// The returned report is non-fatal about remote trouble: failed batches are
/// listed in `failures` and their blobs stay out of the local record, so the
/// next run retries exactly those. Scan and read problems accumulate in
/// `warnings`.
pub async fn index_project(
    config: &Config,
    store: &mut IndexStore,
    client: &RemoteClient,
    project: &ProjectPath,
) -> Result<IndexReport, UplinkError> {
    if !project.root.is_dir() {
        return Err(UplinkError::invalid_path(
            project.root.display().to_string(),
            "not a directory on this machine",
        ));
    }

    let mut report = IndexReport::default();

    let mut entries = Vec::new();
    for item in scanner::scan(&project.root, config) {
        match item {
            Ok(entry) => entries.push(entry),
            Err(warning) => report.warnings.push(warning.to_string()),
        }
    }

    let (current, read_warnings) = chunk_entries(entries, config.max_lines_per_blob).await;
    report
        .warnings
        .extend(read_warnings.iter().map(|w| w.to_string()));

    let current_ids: Vec<String> = current.iter().map(|b| b.id.clone()).collect();
    let previous = store.get(&project.identity).to_vec();
    let diff = diff_blobs(current, &previous);

    info!(
        project = %project.identity,
        blobs = current_ids.len(),
        to_upload = diff.to_upload.len(),
        to_delete = diff.to_delete.len(),
        "computed index delta"
    );

    if diff.to_upload.is_empty() && diff.to_delete.is_empty() {
        // Nothing changed; leave the record untouched.
        return Ok(report);
    }

    // Ids still present keep their acknowledged status from earlier runs.
    let current_set: HashSet<&str> = current_ids.iter().map(String::as_str).collect();
    let mut acked: HashSet<String> = previous
        .iter()
        .filter(|id| current_set.contains(id.as_str()))
        .cloned()
        .collect();

    // Retired ids leave the record up front. The working tree is the source
    // of truth whether or not the remote delete below succeeds.
    report.deleted = diff.to_delete.len();
    if !diff.to_delete.is_empty() {
        store.set(&project.identity, ordered_record(&current_ids, &acked))?;
    }

    let mut uploads = stream::iter(split_batches(diff.to_upload, config.batch_size).into_iter().map(
        |batch| {
            let client = client.clone();
            let project_id = project.identity.clone();
            async move {
                let ids: Vec<String> = batch.iter().map(|b| b.id.clone()).collect();
                let outcome = client.upload_blobs(&project_id, &batch).await;
                (ids, outcome)
            }
        },
    ))
    .buffer_unordered(BATCH_CONCURRENCY);

    while let Some((ids, outcome)) = uploads.next().await {
        match outcome {
            Ok(()) => {
                debug!(batch = ids.len(), "upload batch acknowledged");
                report.uploaded += ids.len();
                acked.extend(ids);
                store.set(&project.identity, ordered_record(&current_ids, &acked))?;
            }
            Err(e) => {
                warn!(batch = ids.len(), error = %e, "upload batch failed");
                report.failures.push(BatchFailure {
                    operation: BatchOperation::Upload,
                    blobs: ids.len(),
                    error: e.to_string(),
                });
            }
        }
    }

    for batch in split_batches(diff.to_delete, config.batch_size) {
        match client.delete_blobs(&project.identity, &batch).await {
            Ok(()) => debug!(batch = batch.len(), "delete batch acknowledged"),
            Err(e) => {
                warn!(batch = batch.len(), error = %e, "delete batch failed");
                report.failures.push(BatchFailure {
                    operation: BatchOperation::Delete,
                    blobs: batch.len(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        project = %project.identity,
        uploaded = report.uploaded,
        deleted = report.deleted,
        failures = report.failures.len(),
        "index run complete"
    );

    Ok(report)
}

/// Read and chunk `entries` with a bounded worker pool.
///
/// Blob order follows the scan order regardless of which reads finish first.
async fn chunk_entries(
    entries: Vec<FileEntry>,
    max_lines: usize,
) -> (Vec<Blob>, Vec<ScanWarning>) {
    let mut results: Vec<(usize, Result<Vec<Blob>, ScanWarning>)> =
        stream::iter(entries.into_iter().enumerate())
            .map(|(idx, entry)| async move {
                let outcome = match tokio::fs::read_to_string(&entry.absolute).await {
                    Ok(content) => Ok(chunk_lines(&entry.relative, &content, max_lines)),
                    Err(e) => Err(ScanWarning {
                        path: Some(entry.absolute),
                        message: e.to_string(),
                    }),
                };
                (idx, outcome)
            })
            .buffer_unordered(FILE_CONCURRENCY)
            .collect()
            .await;
    results.sort_by_key(|(idx, _)| *idx);

    let mut blobs = Vec::new();
    let mut warnings = Vec::new();
    for (_, outcome) in results {
        match outcome {
            Ok(mut chunked) => blobs.append(&mut chunked),
            Err(warning) => warnings.push(warning),
        }
    }
    (blobs, warnings)
}

/// The store record: every acknowledged id, in scan order.
fn ordered_record(current_ids: &[String], acked: &HashSet<String>) -> Vec<String> {
    current_ids
        .iter()
        .filter(|id| acked.contains(*id))
        .cloned()
        .collect()
}

fn split_batches<T>(mut items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut batches = Vec::new();
    while items.len() > size {
        let tail = items.split_off(size);
        batches.push(items);
        items = tail;
    }
    if !items.is_empty() {
        batches.push(items);
    }
    batches
}
