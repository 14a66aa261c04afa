//! The lexicon: a bijection from surface token to compact term ID, with
//! corpus frequency bookkeeping.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::index::{load_container, save_container};
use crate::types::TermId;

/// Lexicon entry: the permanent term ID and the running corpus frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub id: TermId,
    pub frequency: u64,
}

/// Token → `{id, frequency}` map.
///
/// IDs are assigned monotonically in first-observation order and never
/// reused, so they form a bijection with `[0, len)`. Frequency counts one
/// increment per token occurrence, over every section of every document
/// ever admitted, and is monotonically non-decreasing.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Lexicon {
    entries: AHashMap<String, LexiconEntry>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or assign the term ID for `token`, counting one occurrence.
    ///
    /// A new token receives id `len` with frequency 1; an existing token has
    /// its frequency incremented.
    pub fn get_or_add(&mut self, token: &str) -> TermId {
        if let Some(entry) = self.entries.get_mut(token) {
            entry.frequency += 1;
            return entry.id;
        }
        let id = self.entries.len() as TermId;
        self.entries
            .insert(token.to_string(), LexiconEntry { id, frequency: 1 });
        id
    }

    /// The term ID for `token`, if it has ever been observed.
    pub fn get_id(&self, token: &str) -> Option<TermId> {
        self.entries.get(token).map(|e| e.id)
    }

    /// The corpus frequency for `token`.
    pub fn frequency(&self, token: &str) -> Option<u64> {
        self.entries.get(token).map(|e| e.frequency)
    }

    /// Iterate over every token in the lexicon (unordered).
    ///
    /// The autocomplete trie and the typo suggester are built from this.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the lexicon to `path`.
    pub fn persist(&self, path: &Path) -> Result<()> {
        save_container(path, &self.entries)?;
        tracing::info!(tokens = self.entries.len(), path = %path.display(), "Persisted lexicon");
        Ok(())
    }

    /// Load a previously persisted lexicon.
    pub fn load(path: &Path) -> Result<Self> {
        let entries: AHashMap<String, LexiconEntry> = load_container(path)?;
        tracing::debug!(tokens = entries.len(), path = %path.display(), "Loaded lexicon");
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn ids_are_dense_and_stable() {
        let mut lexicon = Lexicon::new();
        let machine = lexicon.get_or_add("machine");
        let learning = lexicon.get_or_add("learning");
        let again = lexicon.get_or_add("machine");

        check!(machine == 0);
        check!(learning == 1);
        check!(again == machine);
        check!(lexicon.len() == 2);
    }

    #[test]
    fn frequency_counts_every_occurrence() {
        let mut lexicon = Lexicon::new();
        lexicon.get_or_add("neural");
        lexicon.get_or_add("neural");
        lexicon.get_or_add("neural");
        check!(lexicon.frequency("neural") == Some(3));
    }

    #[test]
    fn unknown_tokens_have_no_id() {
        let lexicon = Lexicon::new();
        check!(lexicon.get_id("absent") == None);
    }

    #[test]
    fn ids_survive_a_persist_load_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.bin");

        let mut lexicon = Lexicon::new();
        for token in ["graph", "neural", "search", "barrel"] {
            lexicon.get_or_add(token);
        }
        lexicon.persist(&path).unwrap();

        let reloaded = Lexicon::load(&path).unwrap();
        check!(reloaded.len() == lexicon.len());
        for token in ["graph", "neural", "search", "barrel"] {
            check!(reloaded.get_id(token) == lexicon.get_id(token));
        }
    }

    #[test]
    fn ids_form_a_bijection_with_zero_to_len() {
        let mut lexicon = Lexicon::new();
        for token in ["one", "two", "three", "four", "five"] {
            lexicon.get_or_add(token);
        }
        let mut seen: Vec<_> = lexicon.keys().map(|k| lexicon.get_id(k).unwrap()).collect();
        seen.sort_unstable();
        check!(seen == vec![0, 1, 2, 3, 4]);
    }
}
