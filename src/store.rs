//! Project state persistence.
//!
//! One JSON document (`projects.json`) maps each project identity to the
//! ordered list of blob ids last acknowledged by the remote. The in-memory
//! map is authoritative; every mutation rewrites the whole document through
//! a temp file and rename, so a reader never observes a torn document.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::UplinkError;

pub const STATE_FILE: &str = "projects.json";

#[derive(Debug)]
pub struct IndexStore {
    path: PathBuf,
    projects: BTreeMap<String, Vec<String>>,
}

impl IndexStore {
    /// Open the store in `data_dir`, loading `projects.json` when present.
    pub fn open(data_dir: &Path) -> Result<Self, UplinkError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(STATE_FILE);
        let projects = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, projects })
    }

    /// Blob ids recorded for a project. Empty for unknown identities.
    pub fn get(&self, identity: &str) -> &[String] {
        self.projects
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.projects.contains_key(identity)
    }

    /// Replace a project's record and flush the document.
    pub fn set(&mut self, identity: &str, blob_ids: Vec<String>) -> Result<(), UplinkError> {
        self.projects.insert(identity.to_string(), blob_ids);
        self.flush()
    }

    /// Drop a project's record. Returns false when it was not present.
    pub fn remove(&mut self, identity: &str) -> Result<bool, UplinkError> {
        let removed = self.projects.remove(identity).is_some();
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    /// All recorded projects with their blob counts, in identity order.
    pub fn projects(&self) -> impl Iterator<Item = (&str, usize)> {
        self.projects.iter().map(|(k, v)| (k.as_str(), v.len()))
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    fn flush(&self) -> Result<(), UplinkError> {
        let rendered = serde_json::to_string_pretty(&self.projects)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, rendered)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
