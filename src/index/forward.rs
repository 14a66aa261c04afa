//! The forward index: per-document term occurrence data.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EngineError, IndexError, Result};
use crate::index::{Lexicon, load_container, save_container};
use crate::types::{DocId, Section, TermId, WordData};

/// One document's entry: its BM25 length and per-term occurrence data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardEntry {
    /// Token count of title plus abstract. Keywords are excluded from the
    /// length so keyword-stuffed records do not look long to the ranker.
    pub length: u32,
    pub word_data: AHashMap<TermId, WordData>,
}

impl ForwardEntry {
    /// Accumulate an entry from the three normalized section token streams,
    /// assigning term IDs through `lexicon`.
    ///
    /// Positions are global offsets over the concatenation
    /// title ‖ abstract ‖ keywords: `(position within section) + sum of
    /// prior section lengths`.
    pub fn from_sections(lexicon: &mut Lexicon, sections: [&[String]; 3]) -> Self {
        let mut entry = ForwardEntry {
            length: (sections[Section::Title.index()].len()
                + sections[Section::Abstract.index()].len()) as u32,
            word_data: AHashMap::new(),
        };

        let mut base_position = 0u32;
        for section in Section::ALL {
            let tokens = sections[section.index()];
            for (position, token) in tokens.iter().enumerate() {
                let term_id = lexicon.get_or_add(token);
                let data = entry.word_data.entry(term_id).or_default();
                data.frequency[section.index()] += 1;
                data.positions.push(base_position + position as u32);
            }
            base_position += tokens.len() as u32;
        }
        entry
    }
}

/// Document ID → forward entry, persisted as one postcard container.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ForwardIndex {
    entries: AHashMap<DocId, ForwardEntry>,
}

impl ForwardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document's entry. Never overwrites: an existing `doc_id`
    /// fails with `DuplicateDoc`.
    pub fn add(&mut self, doc_id: DocId, entry: ForwardEntry) -> Result<()> {
        if self.entries.contains_key(&doc_id) {
            return Err(EngineError::from(IndexError::DuplicateDoc { doc_id }).into());
        }
        self.entries.insert(doc_id, entry);
        Ok(())
    }

    pub fn get(&self, doc_id: &str) -> Option<&ForwardEntry> {
        self.entries.get(doc_id)
    }

    pub fn contains(&self, doc_id: &str) -> bool {
        self.entries.contains_key(doc_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(doc_id, entry)` pairs (unordered).
    pub fn iter(&self) -> impl Iterator<Item = (&DocId, &ForwardEntry)> {
        self.entries.iter()
    }

    /// Sum of document lengths, used to cross-check the metadata record.
    pub fn total_length(&self) -> u64 {
        self.entries.values().map(|e| u64::from(e.length)).sum()
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        save_container(path, &self.entries)?;
        tracing::info!(documents = self.entries.len(), path = %path.display(), "Persisted forward index");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let entries: AHashMap<DocId, ForwardEntry> = load_container(path)?;
        tracing::debug!(documents = entries.len(), path = %path.display(), "Loaded forward index");
        Ok(Self { entries })
    }
}
