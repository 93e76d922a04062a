//! Bounded transcript snapshots that survive restarts.
//!
//! Persistence never interrupts a live session: every read, write or decode
//! failure is logged and swallowed here, and callers only ever see a
//! (possibly empty) list of messages.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::message::Message;
use crate::core::session::TranscriptObserver;
use crate::core::transcript::Transcript;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A single keyed entry holding the serialized snapshot.
pub trait SnapshotStore: Send {
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&self, contents: &str) -> io::Result<()>;
    fn remove(&self) -> io::Result<()>;
}

#[derive(Debug)]
pub enum HistoryError {
    Read(io::Error),
    Write(io::Error),
    Remove(io::Error),
    Decode(serde_json::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Read(source) => write!(f, "Failed to read saved history: {source}"),
            HistoryError::Write(source) => write!(f, "Failed to save history: {source}"),
            HistoryError::Remove(source) => write!(f, "Failed to remove saved history: {source}"),
            HistoryError::Decode(source) => write!(f, "Saved history is unreadable: {source}"),
            HistoryError::Encode(source) => write!(f, "Failed to encode history: {source}"),
        }
    }
}

impl StdError for HistoryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            HistoryError::Read(source)
            | HistoryError::Write(source)
            | HistoryError::Remove(source) => Some(source),
            HistoryError::Decode(source) | HistoryError::Encode(source) => Some(source),
        }
    }
}

/// Snapshot kept in a JSON file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        temp_file.write_all(contents.as_bytes())?;
        temp_file.as_file_mut().sync_all()?;
        temp_file.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// In-memory entry, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    entry: Arc<Mutex<Option<String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            entry: Arc::new(Mutex::new(Some(contents.into()))),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.entry.lock().ok().and_then(|entry| entry.clone())
    }

    fn poisoned() -> io::Error {
        io::Error::other("snapshot entry lock poisoned")
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self) -> io::Result<Option<String>> {
        let entry = self.entry.lock().map_err(|_| Self::poisoned())?;
        Ok(entry.clone())
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        let mut entry = self.entry.lock().map_err(|_| Self::poisoned())?;
        *entry = Some(contents.to_string());
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        let mut entry = self.entry.lock().map_err(|_| Self::poisoned())?;
        *entry = None;
        Ok(())
    }
}

/// Loads and snapshots the most recent `limit` messages of a transcript.
pub struct History<S> {
    store: S,
    limit: usize,
}

impl<S: SnapshotStore> History<S> {
    pub fn new(store: S) -> Self {
        Self::with_limit(store, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(store: S, limit: usize) -> Self {
        Self { store, limit }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Last saved transcript, or nothing when none exists or it can't be read.
    pub fn load(&self) -> Vec<Message> {
        match self.try_load() {
            Ok(messages) => messages,
            Err(err) => {
                warn!(error = %err, "Ignoring saved history");
                Vec::new()
            }
        }
    }

    pub fn save(&self, messages: &[Message]) {
        if let Err(err) = self.try_save(messages) {
            warn!(error = %err, "History snapshot skipped");
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove().map_err(HistoryError::Remove) {
            warn!(error = %err, "Saved history could not be removed");
        }
    }

    fn try_load(&self) -> Result<Vec<Message>, HistoryError> {
        let Some(contents) = self.store.read().map_err(HistoryError::Read)? else {
            return Ok(Vec::new());
        };
        let mut messages: Vec<Message> =
            serde_json::from_str(&contents).map_err(HistoryError::Decode)?;
        let excess = messages.len().saturating_sub(self.limit);
        messages.drain(..excess);
        debug!(count = messages.len(), "Loaded saved history");
        Ok(messages)
    }

    fn try_save(&self, messages: &[Message]) -> Result<(), HistoryError> {
        let start = messages.len().saturating_sub(self.limit);
        let contents = serde_json::to_string(&messages[start..]).map_err(HistoryError::Encode)?;
        self.store.write(&contents).map_err(HistoryError::Write)
    }
}

impl<S: SnapshotStore> TranscriptObserver for History<S> {
    fn transcript_changed(&mut self, transcript: &Transcript) {
        self.save(transcript.messages());
    }

    fn transcript_reset(&mut self) {
        self.clear();
    }
}
