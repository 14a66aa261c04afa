//! The search engine: explicit owner of every index state object, and the
//! query/insertion API consumed by callers.

use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{EngineError, IndexError, QueryError, Result};
use crate::index::{
    BarrelStore, DEFAULT_BARREL_SIZE, EngineMetadata, ForwardEntry, ForwardIndex, Lexicon,
};
use crate::normalize::Normalizer;
use crate::rank::Ranker;
use crate::store::DocumentStore;
use crate::trie::Trie;
use crate::types::{DocId, DocRecord, NewDocument, Posting, TermId};

/// Ranked results returned per search, after truncation.
pub const MAX_RESULTS: usize = 50;

/// Autocomplete and typo suggestions returned per query.
pub const MAX_SUGGESTIONS: usize = 5;

/// Minimum fuzzy-match score (0-100) for a typo suggestion.
pub const TYPO_SCORE_CUTOFF: f64 = 70.0;

/// Abstracts are previewed at this many characters in search hits.
const ABSTRACT_PREVIEW_CHARS: usize = 500;

/// Locations of the corpus and the persistent index containers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub corpus_path: PathBuf,
    pub barrel_size: usize,
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>, corpus_path: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            corpus_path: corpus_path.into(),
            barrel_size: DEFAULT_BARREL_SIZE,
        }
    }

    pub fn with_barrel_size(mut self, barrel_size: usize) -> Self {
        self.barrel_size = barrel_size;
        self
    }

    fn lexicon_path(&self) -> PathBuf {
        self.data_dir.join("lexicon")
    }

    fn forward_index_path(&self) -> PathBuf {
        self.data_dir.join("forward_index")
    }

    fn barrels_dir(&self) -> PathBuf {
        self.data_dir.join("barrels")
    }

    fn barrel_metadata_path(&self) -> PathBuf {
        self.data_dir.join("barrel_metadata")
    }

    fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata.json")
    }

    fn doc_index_path(&self) -> PathBuf {
        self.data_dir.join("document_index")
    }
}

/// One ranked search hit with its display fields.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: String,
    pub year: String,
    pub venue: String,
    pub citations: String,
    pub url: String,
}

/// The full search response.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Total matching documents before truncation.
    pub results_count: usize,
    pub normalized_query: String,
    pub results: Vec<SearchHit>,
}

/// Outcome of one document insertion.
#[derive(Debug, Clone, Serialize)]
pub struct AddResponse {
    pub success: bool,
    pub message: String,
    pub doc_id: Option<DocId>,
}

/// Index statistics for operators.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub documents: usize,
    pub lexicon_terms: usize,
    pub total_doc_length: u64,
    pub avg_doc_length: f64,
    pub last_barrel: u32,
    /// `(barrel_id, key count)` pairs, ascending by barrel ID.
    pub barrel_key_counts: Vec<(u32, usize)>,
}

/// The engine: lexicon, forward index, barrels, document store, trie, and
/// metadata, owned together and passed explicitly to the ranker and writer
/// paths.
///
/// Queries take `&self` and may run from parallel threads; insertion takes
/// `&mut self`, so writers are serialized by construction.
pub struct SearchEngine {
    config: EngineConfig,
    normalizer: Normalizer,
    lexicon: Lexicon,
    forward: ForwardIndex,
    barrels: BarrelStore,
    store: DocumentStore,
    trie: Trie,
    metadata: EngineMetadata,
}

impl SearchEngine {
    /// Build every index from the corpus CSV, persist them under the data
    /// directory, and return the ready engine.
    pub fn build(config: EngineConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let start = std::time::Instant::now();
        let normalizer = Normalizer::new();

        let mut lexicon = Lexicon::new();
        let mut forward = ForwardIndex::new();
        let mut metadata = EngineMetadata::default();

        let file = std::fs::File::open(&config.corpus_path)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut raw = csv::StringRecord::new();
        while reader.read_record(&mut raw)? {
            let Some(record) = DocRecord::from_fields(&raw) else {
                tracing::warn!(fields = raw.len(), "Skipping malformed corpus row");
                continue;
            };
            if forward.contains(&record.id) {
                tracing::warn!(doc_id = %record.id, "Skipping duplicate corpus row");
                continue;
            }

            let title = normalizer.tokens(&record.title);
            let abstract_ = normalizer.tokens(&record.abstract_text);
            let keywords = normalizer.tokens(&record.keywords);
            let entry = ForwardEntry::from_sections(&mut lexicon, [&title, &abstract_, &keywords]);

            metadata.total_doc_length += u64::from(entry.length);
            metadata.forward_index_length += 1;
            forward.add(record.id, entry)?;
        }

        lexicon.persist(&config.lexicon_path())?;
        forward.persist(&config.forward_index_path())?;

        let barrels = BarrelStore::build(
            &forward,
            &config.barrels_dir(),
            &config.barrel_metadata_path(),
            config.barrel_size,
        )?;
        metadata.last_barrel = barrels.last_barrel();
        metadata.persist(&config.metadata_path())?;

        let store = DocumentStore::build(&config.corpus_path, &config.doc_index_path())?;
        store.open()?;
        let trie = Trie::from_words(lexicon.keys());

        tracing::info!(
            documents = metadata.forward_index_length,
            terms = lexicon.len(),
            elapsed = ?start.elapsed(),
            "Built search engine indexes"
        );

        Ok(Self {
            config,
            normalizer,
            lexicon,
            forward,
            barrels,
            store,
            trie,
            metadata,
        })
    }

    /// Open previously built indexes from the data directory.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let lexicon = Lexicon::load(&config.lexicon_path())?;
        let forward = ForwardIndex::load(&config.forward_index_path())?;
        let metadata = EngineMetadata::load(&config.metadata_path())?;
        let barrels = BarrelStore::open(
            &config.barrels_dir(),
            &config.barrel_metadata_path(),
            config.barrel_size,
            metadata.last_barrel,
        )?;
        let store = DocumentStore::load(&config.corpus_path, &config.doc_index_path())?;
        store.open()?;
        let trie = Trie::from_words(lexicon.keys());

        tracing::info!(
            documents = metadata.forward_index_length,
            terms = lexicon.len(),
            "Opened search engine indexes"
        );

        Ok(Self {
            config,
            normalizer: Normalizer::new(),
            lexicon,
            forward,
            barrels,
            store,
            trie,
            metadata,
        })
    }

    /// Ranked retrieval over the corpus.
    ///
    /// The query is normalized through the same pipeline as indexed text.
    /// An empty trimmed query fails with `EmptyQuery`; a query whose tokens
    /// all normalize away returns zero results.
    pub fn search(&self, query: &str) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(EngineError::from(QueryError::EmptyQuery).into());
        }

        let normalized_query = self.normalizer.normalize(query);
        let tokens: Vec<String> = normalized_query
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if tokens.is_empty() {
            return Ok(SearchResponse {
                results_count: 0,
                normalized_query,
                results: vec![],
            });
        }

        let start = std::time::Instant::now();
        let ranked = Ranker::new(&self.lexicon, &self.barrels, &self.metadata).rank(&tokens)?;
        let results_count = ranked.len();
        tracing::debug!(
            query = %normalized_query,
            results = results_count,
            elapsed = ?start.elapsed(),
            "Ranked query"
        );

        let top: Vec<(DocId, f64)> = ranked.into_iter().take(MAX_RESULTS).collect();
        let ids: Vec<DocId> = top.iter().map(|(id, _)| id.clone()).collect();
        let records = self.store.get_many(&ids)?;

        let results = top
            .into_iter()
            .zip(records)
            .filter_map(|((doc_id, score), record)| {
                let Some(record) = record else {
                    tracing::warn!(doc_id = %doc_id, "Ranked document missing from store");
                    return None;
                };
                Some(SearchHit {
                    doc_id,
                    score,
                    title: record.title,
                    abstract_text: preview(&record.abstract_text),
                    keywords: record.keywords,
                    year: record.year,
                    venue: record.venue,
                    citations: record.n_citation,
                    url: record.url,
                })
            })
            .collect();

        Ok(SearchResponse {
            results_count,
            normalized_query,
            results,
        })
    }

    /// Prefix completions for the final token of `query`, with the leading
    /// tokens re-prefixed onto each suggestion.
    pub fn autocomplete(&self, query: &str) -> Vec<String> {
        // A trailing separator means the last token is empty: nothing to
        // complete yet.
        if query.is_empty() || query.ends_with(char::is_whitespace) {
            return vec![];
        }
        let mut parts: Vec<&str> = query.split_whitespace().collect();
        let Some(prefix) = parts.pop() else {
            return vec![];
        };
        let leading = parts.join(" ");

        self.trie
            .suggest(prefix, MAX_SUGGESTIONS)
            .into_iter()
            .map(|completion| {
                if leading.is_empty() {
                    completion
                } else {
                    format!("{leading} {completion}")
                }
            })
            .collect()
    }

    /// Fuzzy alternatives for a likely-mistyped query, ranked by
    /// edit-distance score over the lexicon keys.
    pub fn suggest_typo(&self, query: &str) -> Vec<String> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return vec![];
        }

        let mut scored: Vec<(f64, &str)> = self
            .lexicon
            .keys()
            .filter_map(|key| {
                let score = rapidfuzz::fuzz::ratio(needle.chars(), key.chars());
                (score >= TYPO_SCORE_CUTOFF).then_some((score, key))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, key)| key.to_string())
            .collect()
    }

    /// Insert one document, updating the lexicon, forward index, barrels,
    /// corpus CSV, document store, trie, and metadata.
    ///
    /// Not globally atomic: a failure part-way leaves a best-effort state
    /// that a retry resolves by deduplicating on doc_id. Index containers
    /// are persisted before the metadata record.
    pub fn add_document(&mut self, doc: &NewDocument) -> Result<AddResponse> {
        if let Some(missing) = first_missing_field(doc) {
            return Ok(AddResponse {
                success: false,
                message: format!("missing required field '{missing}'"),
                doc_id: None,
            });
        }

        // One regenerate-and-retry on collision, then give up.
        let mut doc_id = generate_doc_id();
        if self.document_exists(&doc_id) {
            tracing::warn!(doc_id = %doc_id, "Generated ID collides; regenerating");
            doc_id = generate_doc_id();
            if self.document_exists(&doc_id) {
                return Err(EngineError::from(IndexError::DuplicateDoc { doc_id }).into());
            }
        }

        let title = self.normalizer.tokens(&doc.title);
        let abstract_ = self.normalizer.tokens(&doc.abstract_text);
        let flat_keywords = Normalizer::flatten_keywords(&doc.keywords);
        let keywords = self.normalizer.tokens(&flat_keywords);

        let entry =
            ForwardEntry::from_sections(&mut self.lexicon, [&title, &abstract_, &keywords]);
        let length = entry.length;
        self.forward.add(doc_id.clone(), entry.clone())?;

        // Barrels take postings in ascending term order so repeated inserts
        // of the same document shape are reproducible.
        let mut term_ids: Vec<TermId> = entry.word_data.keys().copied().collect();
        term_ids.sort_unstable();
        for term_id in term_ids {
            let data = &entry.word_data[&term_id];
            self.barrels.add_posting(
                term_id,
                Posting {
                    doc_id: doc_id.clone(),
                    frequency: data.frequency,
                    positions: data.positions.clone(),
                    length,
                },
            )?;
        }

        self.store.append(&doc_record(&doc_id, doc))?;

        for token in title.iter().chain(&abstract_).chain(&keywords) {
            self.trie.insert(token);
        }

        self.lexicon.persist(&self.config.lexicon_path())?;
        self.forward.persist(&self.config.forward_index_path())?;

        self.metadata.forward_index_length += 1;
        self.metadata.total_doc_length += u64::from(length);
        self.metadata.last_barrel = self.barrels.last_barrel();
        self.metadata.persist(&self.config.metadata_path())?;

        tracing::info!(doc_id = %doc_id, length, "Added document");
        Ok(AddResponse {
            success: true,
            message: "document added".to_string(),
            doc_id: Some(doc_id),
        })
    }

    /// Insert a batch of documents, reporting one outcome per document.
    pub fn add_documents(&mut self, docs: &[NewDocument]) -> Vec<AddResponse> {
        docs.iter()
            .map(|doc| {
                self.add_document(doc).unwrap_or_else(|err| AddResponse {
                    success: false,
                    message: format!("{err:#}"),
                    doc_id: None,
                })
            })
            .collect()
    }

    /// The `n` terms appearing in the most documents, descending; ties
    /// break on the token itself.
    pub fn top_terms(&self, n: usize) -> Result<Vec<(String, usize)>> {
        let frequencies = self.barrels.document_frequencies()?;
        let mut terms: Vec<(String, usize)> = self
            .lexicon
            .keys()
            .filter_map(|token| {
                let term_id = self.lexicon.get_id(token)?;
                let df = frequencies.get(&term_id).copied().unwrap_or(0);
                Some((token.to_string(), df))
            })
            .collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(n);
        Ok(terms)
    }

    /// Index statistics, including per-barrel key counts.
    pub fn stats(&self) -> Result<EngineStats> {
        Ok(EngineStats {
            documents: self.forward.len(),
            lexicon_terms: self.lexicon.len(),
            total_doc_length: self.metadata.total_doc_length,
            avg_doc_length: self.metadata.avg_doc_length(),
            last_barrel: self.metadata.last_barrel,
            barrel_key_counts: self.barrels.key_counts()?,
        })
    }

    /// The engine metadata record (for tests and operators).
    pub fn metadata(&self) -> EngineMetadata {
        self.metadata
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn forward_index(&self) -> &ForwardIndex {
        &self.forward
    }

    pub fn barrels(&self) -> &BarrelStore {
        &self.barrels
    }

    /// Fetch one corpus record by ID.
    pub fn document(&self, doc_id: &str) -> Result<Option<DocRecord>> {
        self.store.get(doc_id)
    }

    fn document_exists(&self, doc_id: &str) -> bool {
        self.store.contains(doc_id) || self.forward.contains(doc_id)
    }
}

fn generate_doc_id() -> DocId {
    format!("doc_{}", Uuid::new_v4())
}

fn first_missing_field(doc: &NewDocument) -> Option<&'static str> {
    if doc.title.trim().is_empty() {
        return Some("title");
    }
    if doc.abstract_text.trim().is_empty() {
        return Some("abstract");
    }
    if doc.keywords.is_empty() {
        return Some("keywords");
    }
    if doc.venue.trim().is_empty() {
        return Some("venue");
    }
    if doc.year.trim().is_empty() {
        return Some("year");
    }
    None
}

fn doc_record(doc_id: &str, doc: &NewDocument) -> DocRecord {
    DocRecord {
        id: doc_id.to_string(),
        title: doc.title.clone(),
        keywords: doc.keywords.join(", "),
        venue: doc.venue.clone(),
        year: doc.year.clone(),
        n_citation: doc.n_citation.clone(),
        url: doc.url.clone(),
        abstract_text: doc.abstract_text.clone(),
        authors: doc.authors.clone(),
        doc_type: doc.doc_type.clone(),
        references: doc.references.clone(),
    }
}

/// Truncate an abstract to its display preview. The ellipsis is always
/// appended, even when nothing was cut.
fn preview(abstract_text: &str) -> String {
    let cut: String = abstract_text.chars().take(ABSTRACT_PREVIEW_CHARS).collect();
    format!("{cut}...")
}
