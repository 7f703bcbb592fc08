//! JSONL file store for compaction summaries.
//!
//! Each summary is serialized as one [`CompactionRecord`] line, appended via
//! a buffered writer and flushed immediately. The file is only ever appended
//! to, so earlier sessions' records survive restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conductor_application::{ContextPersistence, PersistError};
use conductor_domain::ContextMetrics;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// One persisted compaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionRecord {
    pub session_id: String,
    pub summary: String,
    pub metrics: ContextMetrics,
    pub timestamp: DateTime<Utc>,
}

/// Append-only JSONL store. Thread-safe via `Mutex<BufWriter<File>>`.
pub struct JsonlCompactionStore {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlCompactionStore {
    /// Open (or create) the store at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!("Compaction store opened at {}", path.display());

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &CompactionRecord) -> Result<(), PersistError> {
        let line = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| PersistError::Unavailable("compaction store lock poisoned".into()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    /// Read every record in the file, skipping lines that do not parse.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<CompactionRecord>, PersistError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CompactionRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping malformed line {} in {}: {}",
                    index + 1,
                    path.display(),
                    e
                ),
            }
        }
        Ok(records)
    }

    /// Most recent summary stored for `session_id`.
    pub fn latest_for(
        path: impl AsRef<Path>,
        session_id: &str,
    ) -> Result<Option<CompactionRecord>, PersistError> {
        Ok(Self::read_all(path)?
            .into_iter()
            .rev()
            .find(|r| r.session_id == session_id))
    }
}

#[async_trait]
impl ContextPersistence for JsonlCompactionStore {
    async fn save(
        &self,
        session_id: &str,
        summary: &str,
        metrics: &ContextMetrics,
    ) -> Result<(), PersistError> {
        self.append(&CompactionRecord {
            session_id: session_id.to_string(),
            summary: summary.to_string(),
            metrics: metrics.clone(),
            timestamp: Utc::now(),
        })
    }
}

impl Drop for JsonlCompactionStore {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::context::monitor;
    use conductor_domain::{CompactionConfig, Message};

    fn metrics() -> ContextMetrics {
        monitor(
            &[Message::user("hello"), Message::assistant("hi there")],
            "system",
            &[],
            &CompactionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_store_writes_one_line_per_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("compactions.jsonl");
        let store = JsonlCompactionStore::open(&path).unwrap();

        store.save("s1", "- first", &metrics()).await.unwrap();
        store.save("s2", "- other", &metrics()).await.unwrap();
        store.save("s1", "- second", &metrics()).await.unwrap();
        drop(store);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim().lines().count(), 3);

        let first: serde_json::Value =
            serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(first["session_id"], "s1");
        assert_eq!(first["summary"], "- first");
        assert!(first["metrics"]["totalTokens"].is_number());
        assert!(first.get("timestamp").is_some());

        let latest = JsonlCompactionStore::latest_for(&path, "s1").unwrap().unwrap();
        assert_eq!(latest.summary, "- second");
        assert!(JsonlCompactionStore::latest_for(&path, "s3").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compactions.jsonl");

        JsonlCompactionStore::open(&path)
            .unwrap()
            .save("s1", "- a", &metrics())
            .await
            .unwrap();
        JsonlCompactionStore::open(&path)
            .unwrap()
            .save("s1", "- b", &metrics())
            .await
            .unwrap();

        let records = JsonlCompactionStore::read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].summary, "- b");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compactions.jsonl");
        std::fs::write(&path, "not json\n\n").unwrap();

        let records = JsonlCompactionStore::read_all(&path).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let result = JsonlCompactionStore::open(blocker.join("compactions.jsonl"));
        assert!(matches!(result, Err(PersistError::Io(_))));
    }
}
