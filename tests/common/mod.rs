//! Shared fixtures: a small scholarly corpus CSV and engines built over it.

use scholar_search::engine::{EngineConfig, SearchEngine};
use scholar_search::types::DocRecord;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A corpus row reduced to the fields the fixtures vary.
pub struct Doc {
    pub id: &'static str,
    pub title: &'static str,
    pub keywords: &'static str,
    pub venue: &'static str,
    pub year: &'static str,
    pub abstract_text: &'static str,
}

impl Doc {
    pub fn new(id: &'static str, title: &'static str, abstract_text: &'static str) -> Self {
        Self {
            id,
            title,
            keywords: "",
            venue: "TestConf",
            year: "2020",
            abstract_text,
        }
    }

    pub fn keywords(mut self, keywords: &'static str) -> Self {
        self.keywords = keywords;
        self
    }
}

/// Write `docs` as a corpus CSV with the canonical eleven-column header.
pub fn write_corpus(dir: &Path, docs: &[Doc]) -> PathBuf {
    let path = dir.join("corpus.csv");
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer.write_record(DocRecord::HEADER).unwrap();
    for doc in docs {
        writer
            .write_record([
                doc.id,
                doc.title,
                doc.keywords,
                doc.venue,
                doc.year,
                "1",
                "http://example.org",
                doc.abstract_text,
                "Test Author",
                "Conference",
                "",
            ])
            .unwrap();
    }
    writer.flush().unwrap();
    path
}

/// Build an engine over `docs` in a fresh temp dir. The `TempDir` must
/// outlive the engine.
pub fn build_engine(docs: &[Doc]) -> (TempDir, SearchEngine) {
    build_engine_with_barrel_size(docs, scholar_search::index::DEFAULT_BARREL_SIZE)
}

pub fn build_engine_with_barrel_size(docs: &[Doc], barrel_size: usize) -> (TempDir, SearchEngine) {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(dir.path(), docs);
    let config = EngineConfig::new(dir.path().join("data"), corpus).with_barrel_size(barrel_size);
    let engine = SearchEngine::build(config).unwrap();
    (dir, engine)
}

/// Reopen an engine over the same data directory.
pub fn reopen_engine(dir: &TempDir) -> SearchEngine {
    let config = EngineConfig::new(dir.path().join("data"), dir.path().join("corpus.csv"));
    SearchEngine::open(config).unwrap()
}

/// A small scholarly corpus exercising every section.
pub fn sample_corpus() -> Vec<Doc> {
    vec![
        Doc::new(
            "d1",
            "Machine Learning",
            "Neural networks at practical scale.",
        )
        .keywords("supervised learning"),
        Doc::new(
            "d2",
            "Deep Learning Methods",
            "Gradient descent training of deep architectures.",
        )
        .keywords("optimization"),
        Doc::new(
            "d3",
            "Query Optimization in Relational Engines",
            "Cost models and cardinality estimation for query planners.",
        )
        .keywords("databases"),
        Doc::new(
            "d4",
            "Suffix Arrays Revisited",
            "Construction algorithms for compressed text indexes.",
        )
        .keywords("stringology"),
    ]
}
