use anyhow::Result;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::marketplace::types::scalar_to_string;

/// Upper bound on remembered job ids; the oldest are evicted first.
pub const SEEN_JOBS_CAP: usize = 1000;

#[derive(Serialize)]
struct StateFileOut<'a> {
    seen_jobs: Vec<&'a str>,
}

#[derive(Deserialize)]
struct StateFileIn {
    #[serde(default)]
    seen_jobs: Vec<Value>,
}

/// Durable, insertion-ordered record of job ids this agent has finished with.
#[derive(Debug)]
pub struct SeenJobStore {
    path: PathBuf,
    ids: IndexSet<String>,
    cap: usize,
}

impl SeenJobStore {
    /// Load the store from `path`. A missing or unreadable file yields an empty store.
    pub fn load(path: &Path) -> Self {
        Self::load_with_cap(path, SEEN_JOBS_CAP)
    }

    pub fn load_with_cap(path: &Path, cap: usize) -> Self {
        let mut store = Self {
            path: path.to_path_buf(),
            ids: IndexSet::new(),
            cap,
        };
        if !path.exists() {
            return store;
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| Ok(serde_json::from_str::<StateFileIn>(&raw)?));
        match parsed {
            Ok(state) => {
                store.ids = state
                    .seen_jobs
                    .iter()
                    .map(scalar_to_string)
                    .filter(|id| !id.is_empty())
                    .collect();
                store.trim();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable state file");
            }
        }
        store
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.ids.contains(job_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Record `job_id` and flush the whole set to disk.
    pub fn mark_seen(&mut self, job_id: &str) -> Result<()> {
        self.ids.insert(job_id.to_string());
        self.trim();
        self.persist()
    }

    fn trim(&mut self) {
        if self.ids.len() > self.cap {
            let excess = self.ids.len() - self.cap;
            self.ids = self.ids.split_off(excess);
        }
    }

    /// Rewrite the state file via a temporary sibling so readers never see a partial write.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let state = StateFileOut {
            seen_jobs: self.ids().collect(),
        };
        let json = serde_json::to_string_pretty(&state)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json.as_bytes())?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
