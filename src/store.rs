//! The document store: a byte-offset index over the corpus CSV giving O(1)
//! record fetch by document ID.
//!
//! Records may span multiple lines inside quoted fields, so both the build
//! scan and the fetch path go through a CSV reader rather than line-wise
//! I/O. Fetches seek to the recorded offset and re-parse exactly one
//! record.

use ahash::AHashMap;
use anyhow::Context;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{EngineError, Result, StoreError};
use crate::index::{load_container, save_container};
use crate::types::{DocId, DocRecord};

/// Offset index over the corpus CSV plus the shared read handle.
///
/// Fetches require the handle to be open (`open`/`close`); the handle is
/// mutex-protected so parallel read paths may share one store.
pub struct DocumentStore {
    csv_path: PathBuf,
    index_path: PathBuf,
    offsets: AHashMap<DocId, u64>,
    handle: Mutex<Option<File>>,
}

impl DocumentStore {
    /// Build the offset index by scanning the corpus once, skipping the
    /// header row, and persist it.
    pub fn build(csv_path: &Path, index_path: &Path) -> Result<Self> {
        let file = File::open(csv_path)
            .with_context(|| format!("failed to open corpus {}", csv_path.display()))?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

        let mut offsets = AHashMap::new();
        let mut record = csv::StringRecord::new();
        while reader
            .read_record(&mut record)
            .with_context(|| format!("failed to scan corpus {}", csv_path.display()))?
        {
            let offset = record
                .position()
                .map(csv::Position::byte)
                .context("corpus record has no position")?;
            if !record.is_empty() {
                offsets.insert(record[0].to_string(), offset);
            }
        }

        tracing::info!(
            documents = offsets.len(),
            corpus = %csv_path.display(),
            "Built document offset index"
        );

        let store = Self {
            csv_path: csv_path.to_path_buf(),
            index_path: index_path.to_path_buf(),
            offsets,
            handle: Mutex::new(None),
        };
        store.persist()?;
        Ok(store)
    }

    /// Load a previously persisted offset index.
    pub fn load(csv_path: &Path, index_path: &Path) -> Result<Self> {
        let entries: Vec<(DocId, u64)> = load_container(index_path)?;
        let offsets: AHashMap<DocId, u64> = entries.into_iter().collect();
        tracing::debug!(documents = offsets.len(), "Loaded document offset index");
        Ok(Self {
            csv_path: csv_path.to_path_buf(),
            index_path: index_path.to_path_buf(),
            offsets,
            handle: Mutex::new(None),
        })
    }

    /// Acquire the read handle. Idempotent.
    pub fn open(&self) -> Result<()> {
        let mut handle = self.lock_handle();
        if handle.is_none() {
            let file = File::open(&self.csv_path)
                .with_context(|| format!("failed to open corpus {}", self.csv_path.display()))?;
            *handle = Some(file);
        }
        Ok(())
    }

    /// Release the read handle. Fetches fail with `NotOpen` until the next
    /// `open`.
    pub fn close(&self) {
        *self.lock_handle() = None;
    }

    pub fn contains(&self, doc_id: &str) -> bool {
        self.offsets.contains_key(doc_id)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Fetch one record by ID. Unknown IDs yield `None`.
    pub fn get(&self, doc_id: &str) -> Result<Option<DocRecord>> {
        let Some(&offset) = self.offsets.get(doc_id) else {
            return Ok(None);
        };

        let mut handle = self.lock_handle();
        let file = handle.as_mut().ok_or(EngineError::Store(StoreError::NotOpen))?;
        file.seek(SeekFrom::Start(offset))
            .with_context(|| format!("failed to seek to record for '{doc_id}'"))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(&*file);
        let mut record = csv::StringRecord::new();
        let found = reader
            .read_record(&mut record)
            .with_context(|| format!("failed to re-parse record for '{doc_id}'"))?;
        if !found {
            return Ok(None);
        }
        Ok(DocRecord::from_fields(&record))
    }

    /// Fetch many records, preserving input order; unknown IDs map to
    /// `None`.
    pub fn get_many(&self, doc_ids: &[DocId]) -> Result<Vec<Option<DocRecord>>> {
        doc_ids.iter().map(|id| self.get(id)).collect()
    }

    /// Append a record to the corpus and index its offset.
    ///
    /// The offset is the end of file before the write; fields are escaped
    /// by the CSV writer. The offset index is persisted after the corpus
    /// write.
    pub fn append(&mut self, record: &DocRecord) -> Result<u64> {
        let mut row = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut row);
            writer
                .write_record(record.to_fields())
                .context("failed to encode appended record")?;
            writer.flush().context("failed to flush appended record")?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("failed to open corpus {}", self.csv_path.display()))?;
        let mut offset = file.metadata().context("failed to stat corpus")?.len();

        // A corpus not ending in a newline would glue the new row onto the
        // previous record.
        if offset > 0 {
            file.seek(SeekFrom::Start(offset - 1))?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last)?;
            if last != [b'\n'] {
                file.write_all(b"\n").context("failed to terminate corpus")?;
                offset += 1;
            }
        }

        file.write_all(&row).context("failed to append record")?;
        file.flush().context("failed to flush corpus")?;

        self.offsets.insert(record.id.clone(), offset);
        self.persist()?;
        tracing::debug!(doc_id = %record.id, offset, "Appended corpus record");
        Ok(offset)
    }

    fn persist(&self) -> Result<()> {
        let mut entries: Vec<(&DocId, u64)> =
            self.offsets.iter().map(|(id, off)| (id, *off)).collect();
        entries.sort_unstable();
        save_container(&self.index_path, &entries)
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<File>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
