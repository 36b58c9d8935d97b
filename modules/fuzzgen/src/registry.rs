use std::collections::{BTreeMap, HashSet};

use crate::category::Category;
use crate::error::{FuzzgenError, Result};

/// Category → source URL mapping for one run. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<Category, Vec<String>>,
}

impl SourceRegistry {
    /// Build from decoded (category, urls) pairs. Repeated categories are
    /// concatenated; blank entries are dropped.
    pub fn new(entries: impl IntoIterator<Item = (Category, Vec<String>)>) -> Self {
        let mut sources: BTreeMap<Category, Vec<String>> = BTreeMap::new();
        for (category, urls) in entries {
            let list = sources.entry(category).or_default();
            list.extend(
                urls.into_iter()
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty()),
            );
        }
        Self { sources }
    }

    /// URLs exactly as configured, duplicates included.
    pub fn urls(&self, category: Category) -> &[String] {
        self.sources
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Unique URLs for a category in first-seen order.
    /// A category with nothing configured is a configuration error.
    pub fn sources(&self, category: Category) -> Result<Vec<String>> {
        let urls = self.urls(category);
        if urls.is_empty() {
            return Err(FuzzgenError::NoSources(category));
        }

        let mut seen = HashSet::new();
        Ok(urls
            .iter()
            .filter(|u| seen.insert(u.as_str()))
            .cloned()
            .collect())
    }

    /// Categories that have at least one configured URL.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.sources
            .iter()
            .filter(|(_, urls)| !urls.is_empty())
            .map(|(category, _)| *category)
    }
}
