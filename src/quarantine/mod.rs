//! Exception Folder
//!
//! Flat holding area for documents the pipeline could not route with
//! confidence. Files are moved here untouched and wait for an operator.
//! Name collisions get a numeric suffix (`scan_1.pdf`, `scan_2.pdf`, ...);
//! nothing in the folder is ever overwritten.

use crate::fsops::{move_file, unique_path};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Manages the exception (manual review) directory
#[derive(Debug, Clone)]
pub struct ExceptionFolder {
    dir: PathBuf,
}

impl ExceptionFolder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Move `source` into the folder under `filename` (suffixed on collision).
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Where the file now lives
    /// * `Err(io::Error)` - The file stays at `source`
    pub fn quarantine(&self, source: &Path, filename: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let destination = unique_path(&self.dir, filename);
        move_file(source, &destination)?;

        tracing::info!(
            "[Exceptions] Moved {} to {}",
            source.display(),
            destination.display()
        );

        Ok(destination)
    }

    /// Plain files currently awaiting review, sorted by name.
    ///
    /// A missing folder is an empty queue.
    pub fn list(&self) -> io::Result<Vec<PathBuf>> {
        list_plain_files(&self.dir)
    }

    pub fn count(&self) -> io::Result<usize> {
        Ok(self.list()?.len())
    }
}

/// Sorted plain files directly inside `dir` (hidden files skipped)
pub(crate) fn list_plain_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    list_files(dir, false)
}

/// Sorted plain files directly inside `dir`, dotfiles included
pub(crate) fn list_input_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    list_files(dir, true)
}

fn list_files(dir: &Path, include_hidden: bool) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if (include_hidden || !hidden) && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_folder() -> (TempDir, ExceptionFolder) {
        let temp = TempDir::new().unwrap();
        let folder = ExceptionFolder::new(temp.path().join("exceptions"));
        (temp, folder)
    }

    #[test]
    fn test_quarantine_moves_file_untouched() {
        let (temp, folder) = create_test_folder();
        let source = temp.path().join("scan.bin");
        fs::write(&source, [0u8, 1, 2, 3]).unwrap();

        let moved = folder.quarantine(&source, "scan.bin").unwrap();

        assert!(!source.exists());
        assert_eq!(moved, folder.dir().join("scan.bin"));
        assert_eq!(fs::read(&moved).unwrap(), vec![0u8, 1, 2, 3]);
    }

    #[test]
    fn test_collision_gets_suffix() {
        let (temp, folder) = create_test_folder();

        for content in ["first", "second", "third"] {
            let source = temp.path().join("scan.pdf");
            fs::write(&source, content).unwrap();
            folder.quarantine(&source, "scan.pdf").unwrap();
        }

        let names: Vec<_> = folder
            .list()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["scan.pdf", "scan_1.pdf", "scan_2.pdf"]);
        assert_eq!(
            fs::read_to_string(folder.dir().join("scan.pdf")).unwrap(),
            "first"
        );
    }

    #[test]
    fn test_list_skips_dirs_and_hidden_files() {
        let (_temp, folder) = create_test_folder();
        fs::create_dir_all(folder.dir().join("nested")).unwrap();
        fs::write(folder.dir().join(".DS_Store"), "x").unwrap();
        fs::write(folder.dir().join("b.pdf"), "x").unwrap();
        fs::write(folder.dir().join("a.pdf"), "x").unwrap();

        assert_eq!(
            folder.list().unwrap(),
            vec![folder.dir().join("a.pdf"), folder.dir().join("b.pdf")]
        );
        assert_eq!(folder.count().unwrap(), 2);
    }

    #[test]
    fn test_missing_folder_is_empty() {
        let (_temp, folder) = create_test_folder();
        assert!(folder.list().unwrap().is_empty());
    }
}
