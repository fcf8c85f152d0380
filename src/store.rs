//! Persistence for the task collection.
//!
//! The whole collection is one JSON document. Every mutation reads it, changes
//! it in memory and writes the full document back; there are no partial
//! updates and no version checks, so the last writer wins.
//!
//! `TaskStore::load` deliberately degrades to an empty collection on any
//! failure. Callers that need to tell "empty" from "unavailable" use
//! `try_load`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::task::Task;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("assign-task/", env!("CARGO_PKG_VERSION"));

/// Failure talking to or decoding the task document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store responded with HTTP {0}")]
    Status(u16),
    #[error("document has no file named '{0}'")]
    MissingFile(String),
    #[error("task document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("task file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store is not configured: {0} is empty")]
    NotConfigured(&'static str),
}

/// Whole-document access to the task collection.
pub trait TaskStore {
    /// Fetch the full collection, reporting why it could not be read.
    fn try_load(&self) -> Result<Vec<Task>, StoreError>;

    /// Overwrite the remote document with `tasks`. No retry, no rollback.
    fn save(&self, tasks: &[Task]) -> Result<(), StoreError>;

    /// Fetch the full collection, treating every failure as an empty one.
    fn load(&self) -> Vec<Task> {
        match self.try_load() {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!("event=store_load status=degraded error={e}");
                Vec::new()
            }
        }
    }
}

impl<T: TaskStore + ?Sized> TaskStore for Box<T> {
    fn try_load(&self) -> Result<Vec<Task>, StoreError> {
        (**self).try_load()
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        (**self).save(tasks)
    }
}

#[derive(Deserialize)]
struct GistDocument {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
}

/// Task document kept as one file inside a GitHub gist.
pub struct GistStore {
    client: Client,
    url: String,
    token: String,
    file_name: String,
}

impl GistStore {
    /// Build a client for the configured gist. Fails when the gist id is missing.
    pub fn new(cfg: &StoreConfig) -> Result<Self, StoreError> {
        if cfg.gist_id.trim().is_empty() {
            return Err(StoreError::NotConfigured("store.gist_id"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/gists/{}", cfg.api_base.trim_end_matches('/'), cfg.gist_id.trim()),
            token: cfg.token.clone(),
            file_name: cfg.file_name.clone(),
        })
    }
}

impl TaskStore for GistStore {
    fn try_load(&self) -> Result<Vec<Task>, StoreError> {
        let resp = self
            .client
            .get(&self.url)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GITHUB_ACCEPT)
            .send()?;
        if !resp.status().is_success() {
            return Err(StoreError::Status(resp.status().as_u16()));
        }
        let doc: GistDocument = resp.json()?;
        let content = doc
            .files
            .get(&self.file_name)
            .and_then(|f| f.content.as_deref())
            .ok_or_else(|| StoreError::MissingFile(self.file_name.clone()))?;
        let tasks: Vec<Task> = serde_json::from_str(content)?;
        info!("event=store_load status=ok backend=gist tasks={}", tasks.len());
        Ok(tasks)
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(tasks)?;
        let mut files = serde_json::Map::new();
        files.insert(self.file_name.clone(), serde_json::json!({ "content": content }));
        let body = serde_json::json!({ "files": files });
        let resp = self
            .client
            .patch(&self.url)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GITHUB_ACCEPT)
            .json(&body)
            .send()?;
        if !resp.status().is_success() {
            return Err(StoreError::Status(resp.status().as_u16()));
        }
        info!("event=store_save status=ok backend=gist tasks={}", tasks.len());
        Ok(())
    }
}

/// Task document kept as a local JSON file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TaskStore for FileStore {
    fn try_load(&self) -> Result<Vec<Task>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut buf = String::new();
        File::open(&self.path)?.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    /// Atomic-ish write via temp file + rename.
    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        write_json_atomic(&self.path, &serde_json::to_string_pretty(tasks)?)?;
        info!(
            "event=store_save status=ok backend=file path={} tasks={}",
            self.path.display(),
            tasks.len()
        );
        Ok(())
    }
}

/// Write `data` to `path` through a sibling temp file so readers never see a partial file.
pub fn write_json_atomic(path: &Path, data: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(data.as_bytes())?;
    f.flush()?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(test)]
pub mod memory {
    use std::cell::{Cell, RefCell};

    use super::{StoreError, TaskStore};
    use crate::task::Task;

    /// In-memory store with switchable failures.
    #[derive(Default)]
    pub struct MemoryStore {
        pub tasks: RefCell<Vec<Task>>,
        pub fail_load: Cell<bool>,
        pub fail_save: Cell<bool>,
        pub saves: Cell<usize>,
    }

    impl MemoryStore {
        pub fn with_tasks(tasks: Vec<Task>) -> Self {
            Self {
                tasks: RefCell::new(tasks),
                ..Self::default()
            }
        }

        pub fn snapshot(&self) -> Vec<Task> {
            self.tasks.borrow().clone()
        }
    }

    impl TaskStore for MemoryStore {
        fn try_load(&self) -> Result<Vec<Task>, StoreError> {
            if self.fail_load.get() {
                return Err(StoreError::Status(503));
            }
            Ok(self.tasks.borrow().clone())
        }

        fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
            if self.fail_save.get() {
                return Err(StoreError::Status(500));
            }
            self.saves.set(self.saves.get() + 1);
            *self.tasks.borrow_mut() = tasks.to_vec();
            Ok(())
        }
    }
}
