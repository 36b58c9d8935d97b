use crate::category::Category;

/// Counters for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub category: Category,
    pub sources_configured: usize,
    pub sources_unique: usize,
    pub sources_valid: usize,
    pub sources_fetched: usize,
    pub sources_failed: usize,
    pub tokens_offered: usize,
    pub entries_stored: usize,
    pub commits: usize,
}

impl RunStats {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            sources_configured: 0,
            sources_unique: 0,
            sources_valid: 0,
            sources_fetched: 0,
            sources_failed: 0,
            tokens_offered: 0,
            entries_stored: 0,
            commits: 0,
        }
    }

    /// Offered tokens that were already present.
    pub fn duplicates(&self) -> usize {
        self.tokens_offered.saturating_sub(self.entries_stored)
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Wordlist Run Complete ({}) ===", self.category)?;
        writeln!(f, "Sources configured: {}", self.sources_configured)?;
        writeln!(f, "Sources unique:     {}", self.sources_unique)?;
        writeln!(f, "Sources valid:      {}", self.sources_valid)?;
        writeln!(f, "Sources fetched:    {}", self.sources_fetched)?;
        writeln!(f, "Sources failed:     {}", self.sources_failed)?;
        writeln!(f, "Tokens offered:     {}", self.tokens_offered)?;
        writeln!(f, "Duplicates skipped: {}", self.duplicates())?;
        writeln!(f, "Entries stored:     {}", self.entries_stored)?;
        write!(f, "Commits:            {}", self.commits)
    }
}
