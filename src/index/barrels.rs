//! The inverted index, materialized as size-bounded on-disk barrels.
//!
//! A barrel is a postcard container mapping term IDs to posting lists,
//! small enough to load wholesale on demand. A companion metadata container
//! records which barrel owns each term ID, and the engine metadata record
//! carries the allocation cursor (`last_barrel`). Writers serialize barrel
//! files before the term→barrel map, so a crash in between leaves stale
//! metadata over durable barrel content rather than the reverse.

use ahash::AHashMap;
use anyhow::Context;
use lru::LruCache;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{EngineError, IndexError, Result};
use crate::index::{ForwardIndex, load_container, save_container};
use crate::types::{Posting, TermId};

/// Default target serialized barrel size.
pub const DEFAULT_BARREL_SIZE: usize = 2 * 1024 * 1024;

/// A barrel may overshoot the target by this much for the entry that
/// triggers rollover.
const OVERSHOOT_ALLOWANCE: usize = 500 * 1024;

/// Loaded barrels kept in memory. Barrels are ~2 MiB, so this bounds the
/// cache near the working set of a multi-term query.
const BARREL_CACHE_SIZE: usize = 8;

type BarrelMap = AHashMap<TermId, Vec<Posting>>;

/// On-disk inverted index: sequential barrel files plus the term→barrel map.
pub struct BarrelStore {
    dir: PathBuf,
    metadata_path: PathBuf,
    target_size: usize,
    term_to_barrel: AHashMap<TermId, u32>,
    last_barrel: u32,
    cache: Mutex<LruCache<u32, Arc<BarrelMap>>>,
}

impl BarrelStore {
    /// Bulk-build barrels from a fully built forward index.
    ///
    /// Entries stream in ascending term-ID order, so for a fixed forward
    /// index the term→barrel assignment is a pure function.
    pub fn build(
        forward: &ForwardIndex,
        dir: &Path,
        metadata_path: &Path,
        target_size: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create barrel directory {}", dir.display()))?;

        // Invert the forward index. BTreeMap gives the deterministic
        // ascending emission order; posting lists are sorted by doc_id so
        // rebuilt barrel files are byte-stable.
        let mut inverted: BTreeMap<TermId, Vec<Posting>> = BTreeMap::new();
        for (doc_id, entry) in forward.iter() {
            for (term_id, data) in &entry.word_data {
                inverted.entry(*term_id).or_default().push(Posting {
                    doc_id: doc_id.clone(),
                    frequency: data.frequency,
                    positions: data.positions.clone(),
                    length: entry.length,
                });
            }
        }
        for postings in inverted.values_mut() {
            postings.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
        }

        let mut store = Self {
            dir: dir.to_path_buf(),
            metadata_path: metadata_path.to_path_buf(),
            target_size,
            term_to_barrel: AHashMap::new(),
            last_barrel: 0,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(BARREL_CACHE_SIZE).unwrap(),
            )),
        };

        let mut barrel_id = 0u32;
        let mut current: Vec<(TermId, Vec<Posting>)> = Vec::new();
        let mut current_size = 0usize;

        for (term_id, postings) in inverted {
            let added = postcard::to_allocvec(&(term_id, &postings))
                .context("failed to measure posting-list entry")?
                .len();

            // Rollover check before writing the entry. A single oversized
            // entry still lands in a fresh barrel alone, the one case
            // allowed past the overshoot allowance.
            if !current.is_empty() && current_size + added >= target_size + OVERSHOOT_ALLOWANCE {
                store.write_barrel(barrel_id, &current)?;
                barrel_id += 1;
                current.clear();
                current_size = 0;
            }

            store.term_to_barrel.insert(term_id, barrel_id);
            current.push((term_id, postings));
            current_size += added;
        }

        store.write_barrel(barrel_id, &current)?;
        store.last_barrel = barrel_id;
        store.persist_metadata()?;

        tracing::info!(
            barrels = barrel_id + 1,
            terms = store.term_to_barrel.len(),
            dir = %dir.display(),
            "Built inverted index barrels"
        );
        Ok(store)
    }

    /// Open a previously built store.
    ///
    /// `last_barrel` comes from the engine metadata record, which is the
    /// cursor's persistent home.
    pub fn open(
        dir: &Path,
        metadata_path: &Path,
        target_size: usize,
        last_barrel: u32,
    ) -> Result<Self> {
        let raw: Vec<(TermId, u32)> = load_container(metadata_path)?;
        let term_to_barrel: AHashMap<TermId, u32> = raw.into_iter().collect();
        tracing::debug!(terms = term_to_barrel.len(), last_barrel, "Loaded barrel metadata");
        Ok(Self {
            dir: dir.to_path_buf(),
            metadata_path: metadata_path.to_path_buf(),
            target_size,
            term_to_barrel,
            last_barrel,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(BARREL_CACHE_SIZE).unwrap(),
            )),
        })
    }

    /// Highest allocated barrel ID, for the engine metadata record.
    pub fn last_barrel(&self) -> u32 {
        self.last_barrel
    }

    /// Number of terms with a barrel assignment.
    pub fn term_count(&self) -> usize {
        self.term_to_barrel.len()
    }

    /// The barrel owning `term_id`, if any.
    pub fn barrel_of(&self, term_id: TermId) -> Option<u32> {
        self.term_to_barrel.get(&term_id).copied()
    }

    /// Fetch the posting list for `term_id`. Unknown terms and terms whose
    /// barrel file has gone missing yield an empty list; the latter is
    /// logged.
    pub fn postings_for(&self, term_id: TermId) -> Result<Vec<Posting>> {
        let Some(barrel_id) = self.barrel_of(term_id) else {
            return Ok(vec![]);
        };
        let barrel = match self.load_barrel(barrel_id) {
            Ok(barrel) => barrel,
            Err(err) => {
                if Self::is_missing(&err) {
                    tracing::warn!(term_id, barrel_id, "Barrel file missing; treating posting list as empty");
                    return Ok(vec![]);
                }
                return Err(err);
            }
        };
        Ok(barrel.get(&term_id).cloned().unwrap_or_default())
    }

    /// Append one posting for `term_id`, placing the term in a barrel if it
    /// has none yet.
    ///
    /// Existing terms rewrite their owning barrel in place (temp file plus
    /// atomic rename). New terms land in `last_barrel` while its file is
    /// under the target size, otherwise in a freshly allocated barrel. The
    /// term→barrel map is persisted after the barrel write in both cases.
    pub fn add_posting(&mut self, term_id: TermId, posting: Posting) -> Result<()> {
        let barrel_id = match self.barrel_of(term_id) {
            Some(existing) => existing,
            None => {
                if self.barrel_file_size(self.last_barrel) < self.target_size as u64 {
                    self.last_barrel
                } else {
                    self.last_barrel += 1;
                    tracing::debug!(barrel_id = self.last_barrel, "Allocated new barrel");
                    self.last_barrel
                }
            }
        };

        // Writes go through the full map so the barrel file stays one
        // self-contained container.
        let mut barrel = match self.load_barrel(barrel_id) {
            Ok(barrel) => (*barrel).clone(),
            // A brand-new barrel has no file yet.
            Err(err) if Self::is_missing(&err) && self.barrel_of(term_id).is_none() => {
                BarrelMap::new()
            }
            Err(err) => return Err(err),
        };
        barrel.entry(term_id).or_default().push(posting);

        let mut entries: Vec<(TermId, Vec<Posting>)> = barrel.into_iter().collect();
        entries.sort_by_key(|(id, _)| *id);
        self.write_barrel(barrel_id, &entries)?;

        self.term_to_barrel.insert(term_id, barrel_id);
        self.persist_metadata()?;
        Ok(())
    }

    /// Document frequency (posting-list length) of every term, walking all
    /// barrels once.
    pub fn document_frequencies(&self) -> Result<AHashMap<TermId, usize>> {
        let mut frequencies = AHashMap::with_capacity(self.term_to_barrel.len());
        for barrel_id in 0..=self.last_barrel {
            let barrel = match self.load_barrel(barrel_id) {
                Ok(barrel) => barrel,
                Err(err) if Self::is_missing(&err) => continue,
                Err(err) => return Err(err),
            };
            for (term_id, postings) in barrel.iter() {
                frequencies.insert(*term_id, postings.len());
            }
        }
        Ok(frequencies)
    }

    /// Per-barrel key counts, ascending by barrel ID.
    pub fn key_counts(&self) -> Result<Vec<(u32, usize)>> {
        let mut counts = Vec::with_capacity(self.last_barrel as usize + 1);
        for barrel_id in 0..=self.last_barrel {
            let count = match self.load_barrel(barrel_id) {
                Ok(barrel) => barrel.len(),
                Err(err) if Self::is_missing(&err) => 0,
                Err(err) => return Err(err),
            };
            counts.push((barrel_id, count));
        }
        Ok(counts)
    }

    fn barrel_path(&self, barrel_id: u32) -> PathBuf {
        self.dir.join(format!("barrel_{barrel_id}"))
    }

    fn barrel_file_size(&self, barrel_id: u32) -> u64 {
        std::fs::metadata(self.barrel_path(barrel_id))
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Load a barrel through the cache.
    fn load_barrel(&self, barrel_id: u32) -> Result<Arc<BarrelMap>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(barrel) = cache.get(&barrel_id) {
            return Ok(Arc::clone(barrel));
        }
        drop(cache);

        let path = self.barrel_path(barrel_id);
        if !path.exists() {
            return Err(EngineError::from(IndexError::MissingBarrel { barrel_id }).into());
        }
        let entries: Vec<(TermId, Vec<Posting>)> = load_container(&path)?;
        let barrel: Arc<BarrelMap> = Arc::new(entries.into_iter().collect());
        tracing::debug!(barrel_id, terms = barrel.len(), "Loaded barrel");

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(barrel_id, Arc::clone(&barrel));
        Ok(barrel)
    }

    /// Write a barrel file and drop any cached copy.
    fn write_barrel(&self, barrel_id: u32, entries: &[(TermId, Vec<Posting>)]) -> Result<()> {
        save_container(&self.barrel_path(barrel_id), &entries)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(&barrel_id);
        Ok(())
    }

    /// Whether `err` is a `MissingBarrel`, which read paths downgrade to an
    /// empty posting list.
    fn is_missing(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Index(IndexError::MissingBarrel { .. }))
        )
    }

    fn persist_metadata(&self) -> Result<()> {
        let mut entries: Vec<(TermId, u32)> = self
            .term_to_barrel
            .iter()
            .map(|(term, barrel)| (*term, *barrel))
            .collect();
        entries.sort_unstable();
        save_container(&self.metadata_path, &entries)
    }
}
