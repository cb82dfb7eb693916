//! Read-only processing statistics over the output and exception folders

use crate::config::RouterConfig;
use crate::index::{IndexError, IndexStore};
use crate::models::Category;
use crate::quarantine::ExceptionFolder;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Failed to count exceptions: {0}")]
    Exceptions(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    /// Indexed records per category, in `Category::ALL` order
    pub per_category: Vec<(Category, usize)>,
    pub total_routed: usize,
    pub exception_count: usize,
}

pub fn collect(config: &RouterConfig) -> Result<ProcessingStats, StatsError> {
    let store = IndexStore::new(config.max_index_entries);

    let mut per_category = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        let count = store.read_folder(&config.category_dir(category))?.len();
        per_category.push((category, count));
    }

    let total_routed = per_category.iter().map(|(_, n)| n).sum();
    let exception_count = ExceptionFolder::new(config.exception_dir.clone()).count()?;

    Ok(ProcessingStats {
        per_category,
        total_routed,
        exception_count,
    })
}
