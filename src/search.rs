use tracing::warn;

use crate::config::Config;
use crate::error::UplinkError;
use crate::identity::ProjectPath;
use crate::indexer;
use crate::models::SearchHit;
use crate::remote::RemoteClient;
use crate::store::IndexStore;

/// Search the remote index for `query` within one project.
///
/// When `auto_index_on_search` is set, an index pass runs first so the
/// results reflect the working tree. A pass that leaves gaps (failed batches,
/// unreachable remote) is downgraded to a logged warning and the search runs
/// against whatever is persisted.
pub async fn search_project(
    config: &Config,
    store: &mut IndexStore,
    client: &RemoteClient,
    project: &ProjectPath,
    query: &str,
) -> Result<Vec<SearchHit>, UplinkError> {
    if config.auto_index_on_search {
        match indexer::index_project(config, store, client, project).await {
            Ok(report) => {
                if report.is_partial_failure() {
                    warn!(
                        project = %project.identity,
                        failures = report.failures.len(),
                        "pre-search index left gaps, searching persisted state"
                    );
                }
            }
            Err(UplinkError::RemoteUnavailable(e)) => {
                warn!(
                    project = %project.identity,
                    error = %e,
                    "remote unreachable during pre-search index, searching persisted state"
                );
            }
            Err(e) => return Err(e),
        }
    }

    client.search(&project.identity, query).await
}

/// Render hits for terminal output, best first.
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results.".to_string();
    }

    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}:{}-{}\n",
            i + 1,
            hit.file,
            hit.start_line,
            hit.end_line
        ));
        for line in hit.snippet.lines() {
            out.push_str(&format!("   {}\n", line));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}
