// Deduplication store: token → origin URL, first writer wins.
//
// Writes are staged in a WriteBatch and committed to the backend in groups.
// Only the writer task (see `writer`) mutates a TokenStore during a run, so the
// contains-then-insert in `put_if_absent` cannot race.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::Result;

// ---------------------------------------------------------------------------
// WriteBatch
// ---------------------------------------------------------------------------

/// Entries staged for the next commit.
#[derive(Debug, Default)]
pub struct WriteBatch {
    entries: HashMap<String, Arc<str>>,
}

impl WriteBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert(&mut self, token: String, origin: Arc<str>) -> bool {
        match self.entries.entry(token) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(origin);
                true
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// StoreBackend
// ---------------------------------------------------------------------------

/// Committed entry storage. `commit` applies a whole batch or nothing, and
/// never replaces a token that is already present.
pub trait StoreBackend: Send + std::fmt::Debug {
    fn contains(&self, token: &str) -> bool;

    fn commit(&mut self, batch: &WriteBatch) -> Result<()>;

    fn len(&self) -> usize;

    /// Committed entries in token order.
    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_>;
}

/// Ordered in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, Arc<str>>,
}

impl StoreBackend for MemoryBackend {
    fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    fn commit(&mut self, batch: &WriteBatch) -> Result<()> {
        for (token, origin) in batch.iter() {
            self.entries
                .entry(token.to_string())
                .or_insert_with(|| origin.clone());
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref())))
    }
}

// ---------------------------------------------------------------------------
// TokenStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct TokenStore<B: StoreBackend = MemoryBackend> {
    backend: B,
    pending: WriteBatch,
    batch_size: usize,
    commits: usize,
}

impl TokenStore<MemoryBackend> {
    pub fn in_memory(batch_size: usize) -> Self {
        Self::new(MemoryBackend::default(), batch_size)
    }
}

impl<B: StoreBackend> TokenStore<B> {
    pub fn new(backend: B, batch_size: usize) -> Self {
        Self {
            backend,
            pending: WriteBatch::default(),
            batch_size: batch_size.max(1),
            commits: 0,
        }
    }

    /// Stage `(token, origin)` unless the token is already committed or
    /// staged. Returns whether it was staged.
    pub fn put_if_absent(&mut self, token: String, origin: &Arc<str>) -> bool {
        if self.backend.contains(&token) {
            return false;
        }
        self.pending.insert(token, origin.clone())
    }

    pub fn is_batch_full(&self) -> bool {
        self.pending.len() >= self.batch_size
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Commit staged entries. On failure they stay staged so the commit can be
    /// retried as-is.
    pub fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.backend.commit(&self.pending)?;
        self.pending.clear();
        self.commits += 1;
        Ok(())
    }

    /// Committed entries in token order. Staged entries are not visible.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.backend.entries()
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(url: &str) -> Arc<str> {
        Arc::from(url)
    }

    #[test]
    fn first_writer_wins() {
        let mut store = TokenStore::in_memory(10);
        let a = origin("https://a.test/list");
        let b = origin("https://b.test/list");

        assert!(store.put_if_absent("login".into(), &a));
        assert!(!store.put_if_absent("login".into(), &b));
        store.commit().unwrap();
        assert!(!store.put_if_absent("login".into(), &b));
        store.commit().unwrap();

        let entries: Vec<_> = store.iter().collect();
        assert_eq!(entries, vec![("login", "https://a.test/list")]);
    }

    #[test]
    fn staged_entries_are_invisible_until_commit() {
        let mut store = TokenStore::in_memory(10);
        let a = origin("https://a.test/list");
        store.put_if_absent("admin".into(), &a);

        assert!(store.is_empty());
        assert_eq!(store.pending_len(), 1);

        store.commit().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.pending_len(), 0);
        assert_eq!(store.commits(), 1);
    }

    #[test]
    fn batch_fills_at_batch_size() {
        let mut store = TokenStore::in_memory(3);
        let a = origin("https://a.test/list");
        for token in ["a", "b"] {
            store.put_if_absent(token.into(), &a);
        }
        assert!(!store.is_batch_full());
        // duplicates don't count towards the batch
        store.put_if_absent("a".into(), &a);
        assert!(!store.is_batch_full());
        store.put_if_absent("c".into(), &a);
        assert!(store.is_batch_full());
    }

    #[test]
    fn empty_commit_is_a_noop() {
        let mut store = TokenStore::in_memory(3);
        store.commit().unwrap();
        assert_eq!(store.commits(), 0);
    }

    #[test]
    fn iteration_is_key_ordered() {
        let mut store = TokenStore::in_memory(2);
        let a = origin("https://a.test/list");
        for token in ["b", "a", "c"] {
            store.put_if_absent(token.into(), &a);
            if store.is_batch_full() {
                store.commit().unwrap();
            }
        }
        store.commit().unwrap();

        let tokens: Vec<_> = store.iter().map(|(t, _)| t).collect();
        assert_eq!(tokens, vec!["a", "b", "c"]);
        assert_eq!(store.commits(), 2);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let mut store = TokenStore::in_memory(0);
        store.put_if_absent("x".into(), &origin("https://a.test/list"));
        assert!(store.is_batch_full());
    }
}
