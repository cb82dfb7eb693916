//! Index Store
//!
//! Append-only JSON Lines index kept inside each category folder and split
//! into bounded segments `index_000.jsonl`, `index_001.jsonl`, ...
//!
//! Segment selection is a pure function of folder contents: the first
//! segment that does not exist or holds fewer than `max_entries` lines.
//!
//! ## Concurrency Safety
//! Selection and append run under an exclusive `fs2` lock on
//! `<folder>/.index.lock`, so two writers never pick the same tail.

use crate::models::ClassificationResult;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCK_FILE: &str = ".index.lock";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize index entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IndexError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Segmented per-category index writer and reader
#[derive(Debug, Clone, Copy)]
pub struct IndexStore {
    max_entries: usize,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new(crate::config::MAX_INDEX_ENTRIES)
    }
}

impl IndexStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
        }
    }

    /// Path of segment `n` inside `folder`
    pub fn segment_path(folder: &Path, n: usize) -> PathBuf {
        folder.join(format!("index_{:03}.jsonl", n))
    }

    /// First segment with room for one more line.
    ///
    /// A segment whose last line has no trailing newline is treated as
    /// sealed, so a new entry is never glued onto a torn line.
    pub fn next_segment(&self, folder: &Path) -> Result<PathBuf, IndexError> {
        let mut n = 0;
        loop {
            let path = Self::segment_path(folder, n);
            if !path.exists() {
                return Ok(path);
            }

            let content = fs::read(&path).map_err(|e| IndexError::io(&path, e))?;
            let torn = !content.is_empty() && content.last() != Some(&b'\n');
            let lines = content.iter().filter(|b| **b == b'\n').count();

            if !torn && lines < self.max_entries {
                return Ok(path);
            }
            n += 1;
        }
    }

    /// Append one record as a single JSON line; returns the segment written.
    pub fn append(
        &self,
        folder: &Path,
        result: &ClassificationResult,
    ) -> Result<PathBuf, IndexError> {
        fs::create_dir_all(folder).map_err(|e| IndexError::io(folder, e))?;

        let line = serde_json::to_string(result)?;
        let _lock = Self::acquire_lock(folder)?;

        let segment = self.next_segment(folder)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&segment)
            .map_err(|e| IndexError::io(&segment, e))?;

        file.write_all(format!("{}\n", line).as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| IndexError::io(&segment, e))?;

        tracing::debug!("[IndexStore] Appended entry to {}", segment.display());

        Ok(segment)
    }

    /// All records of a category folder in segment order.
    ///
    /// Unparsable lines are skipped and logged.
    pub fn read_folder(&self, folder: &Path) -> Result<Vec<ClassificationResult>, IndexError> {
        let mut records = Vec::new();
        let mut n = 0;

        loop {
            let path = Self::segment_path(folder, n);
            if !path.exists() {
                break;
            }

            let content = fs::read_to_string(&path).map_err(|e| IndexError::io(&path, e))?;
            for (line_no, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClassificationResult>(line) {
                    Ok(record) => records.push(record),
                    Err(e) => tracing::warn!(
                        "[IndexStore] Skipping bad line {} in {}: {}",
                        line_no + 1,
                        path.display(),
                        e
                    ),
                }
            }
            n += 1;
        }

        Ok(records)
    }

    /// Exclusive lock for a category folder.
    /// The returned handle must be kept alive while holding the lock.
    fn acquire_lock(folder: &Path) -> Result<File, IndexError> {
        let lock_path = folder.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| IndexError::io(&lock_path, e))?;

        lock_file
            .lock_exclusive()
            .map_err(|e| IndexError::io(&lock_path, e))?;

        Ok(lock_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use tempfile::TempDir;

    fn record(member: &str) -> ClassificationResult {
        let mut result = ClassificationResult::new(Category::Loans, 0.9);
        result.member_number = member.to_string();
        result.final_location = Some(PathBuf::from(format!("Loans/{}_doc.pdf", member)));
        result
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_segments_fill_to_capacity() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::default();

        for i in 0..25 {
            store.append(temp.path(), &record(&i.to_string())).unwrap();
        }

        assert_eq!(line_count(&IndexStore::segment_path(temp.path(), 0)), 10);
        assert_eq!(line_count(&IndexStore::segment_path(temp.path(), 1)), 10);
        assert_eq!(line_count(&IndexStore::segment_path(temp.path(), 2)), 5);
        assert!(!IndexStore::segment_path(temp.path(), 3).exists());
    }

    #[test]
    fn test_next_segment_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(2);

        assert_eq!(
            store.next_segment(temp.path()).unwrap(),
            temp.path().join("index_000.jsonl")
        );

        store.append(temp.path(), &record("1")).unwrap();
        store.append(temp.path(), &record("2")).unwrap();

        let first = store.next_segment(temp.path()).unwrap();
        let second = store.next_segment(temp.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, temp.path().join("index_001.jsonl"));
    }

    #[test]
    fn test_partial_segment_is_reused() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::default();
        let line = serde_json::to_string(&record("7")).unwrap();
        fs::write(
            IndexStore::segment_path(temp.path(), 0),
            format!("{}\n{}\n{}\n", line, line, line),
        )
        .unwrap();

        let written = store.append(temp.path(), &record("8")).unwrap();
        assert_eq!(written, IndexStore::segment_path(temp.path(), 0));
        assert_eq!(line_count(&written), 4);
    }

    #[test]
    fn test_torn_line_seals_segment() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::default();
        let segment = IndexStore::segment_path(temp.path(), 0);
        fs::write(&segment, "{\"category_name\":\"Loa").unwrap();

        let written = store.append(temp.path(), &record("1")).unwrap();
        assert_eq!(written, IndexStore::segment_path(temp.path(), 1));
        assert_eq!(fs::read_to_string(&segment).unwrap(), "{\"category_name\":\"Loa");
    }

    #[test]
    fn test_read_folder_skips_bad_lines() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(2);
        store.append(temp.path(), &record("1")).unwrap();
        store.append(temp.path(), &record("2")).unwrap();
        store.append(temp.path(), &record("3")).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(IndexStore::segment_path(temp.path(), 1))
            .unwrap();
        writeln!(file, "not json").unwrap();

        let records = store.read_folder(temp.path()).unwrap();
        let members: Vec<_> = records.iter().map(|r| r.member_number.as_str()).collect();
        assert_eq!(members, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_read_missing_folder_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::default();
        assert!(store
            .read_folder(&temp.path().join("Statements"))
            .unwrap()
            .is_empty());
    }
}
