//! Terminal routing step
//!
//! Shared by the automatic pipeline and manual review: name the file, move it
//! into its category folder, record where it landed and append the index
//! entry. A routed file without an index entry is never left behind.

use crate::config::RouterConfig;
use crate::fsops::{move_file, unique_path};
use crate::index::{IndexError, IndexStore};
use crate::models::ClassificationResult;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to prepare {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Routed name '{name}' would leave {folder}")]
    UnsafeName { name: String, folder: PathBuf },

    #[error("Index append failed: {0}")]
    Index(#[from] IndexError),

    #[error("Index append failed ({index}) and rollback to {source_path} failed: {rollback}")]
    Rollback {
        index: IndexError,
        source_path: PathBuf,
        rollback: std::io::Error,
    },
}

/// Routed file name: `<member_number>_<filename>`, or `filename` when the
/// member number is blank.
pub fn destination_name(member_number: &str, filename: &str) -> String {
    let member = member_number.trim();
    if member.is_empty() {
        filename.to_string()
    } else {
        format!("{}_{}", member, filename)
    }
}

/// A plain file name that stays inside the folder it is joined onto
fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Moves classified files into category folders and indexes them
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: RouterConfig,
    index: IndexStore,
}

impl Dispatcher {
    pub fn new(config: RouterConfig) -> Self {
        let index = IndexStore::new(config.max_index_entries);
        Self { config, index }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    /// Route `source` (originally named `filename`) per `result`.
    ///
    /// Returns the record as written to the index, with `final_location` set.
    pub fn dispatch(
        &self,
        source: &Path,
        filename: &str,
        result: ClassificationResult,
    ) -> Result<ClassificationResult, DispatchError> {
        let folder = self.config.category_dir(result.category);
        fs::create_dir_all(&folder).map_err(|source| DispatchError::CreateDir {
            path: folder.clone(),
            source,
        })?;

        let name = destination_name(&result.member_number, filename);
        if !is_single_component(&name) {
            return Err(DispatchError::UnsafeName { name, folder });
        }
        let destination = unique_path(&folder, &name);
        if destination.parent() != Some(folder.as_path()) {
            return Err(DispatchError::UnsafeName { name, folder });
        }

        move_file(source, &destination).map_err(|e| DispatchError::Move {
            from: source.to_path_buf(),
            to: destination.clone(),
            source: e,
        })?;

        let record = result.with_final_location(destination.clone());

        if let Err(index_err) = self.index.append(&folder, &record) {
            tracing::error!(
                "[Dispatcher] Index append failed for {}, moving file back: {}",
                destination.display(),
                index_err
            );
            return match move_file(&destination, source) {
                Ok(()) => Err(DispatchError::Index(index_err)),
                Err(rollback) => Err(DispatchError::Rollback {
                    index: index_err,
                    source_path: source.to_path_buf(),
                    rollback,
                }),
            };
        }

        tracing::info!(
            "[Dispatcher] {} -> {} ({})",
            filename,
            destination.display(),
            record.category
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use tempfile::TempDir;

    fn create_test_dispatcher() -> (TempDir, Dispatcher) {
        let temp = TempDir::new().unwrap();
        let config = RouterConfig::rooted_at(temp.path());
        (temp, Dispatcher::new(config))
    }

    #[test]
    fn test_destination_name() {
        assert_eq!(destination_name("12345", "statement.pdf"), "12345_statement.pdf");
        assert_eq!(destination_name("", "statement.pdf"), "statement.pdf");
        assert_eq!(destination_name("   ", "statement.pdf"), "statement.pdf");
        assert_eq!(destination_name(" 42 ", "a.pdf"), "42_a.pdf");
    }

    #[test]
    fn test_dispatch_moves_and_indexes() {
        let (temp, dispatcher) = create_test_dispatcher();
        let source = temp.path().join("statement.pdf");
        fs::write(&source, b"%PDF-1.4").unwrap();

        let mut result = ClassificationResult::new(Category::Statements, 0.92);
        result.member_number = "12345".to_string();

        let record = dispatcher.dispatch(&source, "statement.pdf", result).unwrap();

        let expected = temp
            .path()
            .join("classified_output/Statements/12345_statement.pdf");
        assert!(!source.exists());
        assert!(expected.exists());
        assert_eq!(record.final_location, Some(expected.clone()));

        let folder = dispatcher.config().category_dir(Category::Statements);
        let indexed = dispatcher.index().read_folder(&folder).unwrap();
        assert_eq!(indexed, vec![record]);
    }

    #[test]
    fn test_dispatch_suffixes_collisions() {
        let (temp, dispatcher) = create_test_dispatcher();

        for _ in 0..2 {
            let source = temp.path().join("doc.pdf");
            fs::write(&source, b"x").unwrap();
            dispatcher
                .dispatch(&source, "doc.pdf", ClassificationResult::new(Category::Loans, 0.9))
                .unwrap();
        }

        let folder = dispatcher.config().category_dir(Category::Loans);
        assert!(folder.join("doc.pdf").exists());
        assert!(folder.join("doc_1.pdf").exists());
        assert_eq!(dispatcher.index().read_folder(&folder).unwrap().len(), 2);
    }

    #[test]
    fn test_operator_member_number_cannot_escape_category() {
        let (temp, dispatcher) = create_test_dispatcher();
        let source = temp.path().join("loan.txt");
        fs::write(&source, b"x").unwrap();

        for member in ["../../..", "a/b", "/abs"] {
            let mut result = ClassificationResult::new(Category::Loans, 1.0);
            result.member_number = member.to_string();

            let err = dispatcher.dispatch(&source, "loan.txt", result).unwrap_err();
            assert!(matches!(err, DispatchError::UnsafeName { .. }));
        }

        assert!(source.exists());
        let loans = dispatcher.config().category_dir(Category::Loans);
        assert!(dispatcher.index().read_folder(&loans).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_append_moves_file_back() {
        let (temp, dispatcher) = create_test_dispatcher();
        let folder = dispatcher.config().category_dir(Category::Memberdoc);
        fs::create_dir_all(&folder).unwrap();
        // A directory where the lock file should be makes the append fail
        fs::create_dir_all(folder.join(".index.lock")).unwrap();

        let source = temp.path().join("card.pdf");
        fs::write(&source, b"x").unwrap();

        let err = dispatcher
            .dispatch(
                &source,
                "card.pdf",
                ClassificationResult::new(Category::Memberdoc, 0.95),
            )
            .unwrap_err();

        assert!(matches!(err, DispatchError::Index(_)));
        assert!(source.exists());
        assert!(!folder.join("card.pdf").exists());
    }
}
