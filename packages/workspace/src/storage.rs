//! # Storage Providers
//!
//! Where saved forms live. The editor only sees [`StorageProvider`];
//! backends decide how envelopes are kept.
//!
//! | Backend | Keeps | Use |
//! |---------|-------|-----|
//! | [`MemoryStorage`] | envelopes in a map | tests, ephemeral sessions |
//! | [`FileStorage`] | one pretty JSON file per form id | CLI, desktop hosts |

use crate::envelope::{DocumentSummary, Envelope};
use crate::error::{PersistError, PersistResult, StorageError};
use crate::load::Loader;
use formsmith_editor::{Clock, SystemClock};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

pub trait StorageProvider: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Every stored form, most recently updated first
    fn list(&self) -> PersistResult<Vec<DocumentSummary>>;

    fn load(&self, form_id: &str) -> PersistResult<Envelope>;

    /// Insert or overwrite
    fn save(&self, form_id: &str, envelope: &Envelope) -> PersistResult<()>;

    /// Removing an unknown id is not an error
    fn remove(&self, form_id: &str) -> PersistResult<()>;
}

fn newest_first(summaries: &mut [DocumentSummary]) {
    summaries.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.form_id.cmp(&b.form_id))
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, Envelope>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageProvider for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn list(&self) -> PersistResult<Vec<DocumentSummary>> {
        let guard = self.data.read().map_err(|_| StorageError::Poisoned)?;
        let mut summaries: Vec<DocumentSummary> = guard.values().map(Envelope::summary).collect();
        newest_first(&mut summaries);
        Ok(summaries)
    }

    fn load(&self, form_id: &str) -> PersistResult<Envelope> {
        let guard = self.data.read().map_err(|_| StorageError::Poisoned)?;
        guard
            .get(form_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(form_id.to_string()).into())
    }

    fn save(&self, form_id: &str, envelope: &Envelope) -> PersistResult<()> {
        let mut guard = self.data.write().map_err(|_| StorageError::Poisoned)?;
        guard.insert(form_id.to_string(), envelope.clone());
        Ok(())
    }

    fn remove(&self, form_id: &str) -> PersistResult<()> {
        let mut guard = self.data.write().map_err(|_| StorageError::Poisoned)?;
        guard.remove(form_id);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.data.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStorage")
            .field("forms", &count)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage
// ─────────────────────────────────────────────────────────────────────────────

/// `<dir>/<form id>.json`. Loading goes through the full load pipeline, so
/// old files are migrated on read.
pub struct FileStorage {
    dir: PathBuf,
    loader: Loader,
    clock: Arc<dyn Clock>,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            loader: Loader::new(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, form_id: &str) -> PersistResult<PathBuf> {
        let safe = !form_id.is_empty()
            && form_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(PersistError::validation("formId", format!("unusable as a file name: {:?}", form_id)));
        }
        Ok(self.dir.join(format!("{}.json", form_id)))
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl StorageProvider for FileStorage {
    fn name(&self) -> &str {
        "FileStorage"
    }

    fn list(&self) -> PersistResult<Vec<DocumentSummary>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(StorageError::from)? {
            let path = entry.map_err(StorageError::from)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let source = fs::read_to_string(&path).map_err(StorageError::from)?;
            match self.loader.load_str(&source, self.clock.now_ms()) {
                Ok(envelope) => summaries.push(envelope.summary()),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable form");
                }
            }
        }

        newest_first(&mut summaries);
        Ok(summaries)
    }

    fn load(&self, form_id: &str) -> PersistResult<Envelope> {
        let path = self.path_for(form_id)?;
        if !path.exists() {
            return Err(StorageError::NotFound(form_id.to_string()).into());
        }

        let source = fs::read_to_string(&path).map_err(StorageError::from)?;
        let envelope = self.loader.load_str(&source, self.clock.now_ms())?;
        debug!(form_id, path = %path.display(), "Read form");
        Ok(envelope)
    }

    fn save(&self, form_id: &str, envelope: &Envelope) -> PersistResult<()> {
        let path = self.path_for(form_id)?;
        fs::create_dir_all(&self.dir).map_err(StorageError::from)?;

        // Write-then-rename so a crash never leaves a half-written form
        let tmp_path = Self::temp_path(&path);
        {
            let file = fs::File::create(&tmp_path).map_err(StorageError::from)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, envelope).map_err(StorageError::from)?;
            writer.flush().map_err(StorageError::from)?;
        }
        fs::rename(&tmp_path, &path).map_err(StorageError::from)?;

        info!(form_id, path = %path.display(), "Saved form");
        Ok(())
    }

    fn remove(&self, form_id: &str) -> PersistResult<()> {
        let path = self.path_for(form_id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(form_id, "Removed form");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::from(err).into()),
        }
    }
}

impl fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStorage")
            .field("dir", &self.dir)
            .finish()
    }
}
