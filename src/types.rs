//! Shared types for the index containers and the corpus record schema.

use serde::{Deserialize, Serialize};

/// Compact integer term identifier assigned by the lexicon.
///
/// IDs are dense: after a clean build they form a bijection with
/// `[0, lexicon.len())`. Once assigned, an ID is permanent.
pub type TermId = u32;

/// Opaque unique document identifier (the CSV `id` column, or a generated
/// `doc_<uuid>` for inserted documents).
pub type DocId = String;

/// The three indexed sections of a document, in concatenation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Title = 0,
    Abstract = 1,
    Keywords = 2,
}

impl Section {
    /// All sections in position-concatenation order (title ‖ abstract ‖ keywords).
    pub const ALL: [Section; 3] = [Section::Title, Section::Abstract, Section::Keywords];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Per-term, per-document occurrence data inside the forward index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordData {
    /// Occurrence counts per section: `[title, abstract, keywords]`.
    pub frequency: [u32; 3],
    /// Global token offsets over the concatenated section streams, ascending.
    pub positions: Vec<u32>,
}

/// One document's occurrence of a term, as stored in a barrel.
///
/// `length` duplicates the forward-index document length so the ranker never
/// has to open the forward index at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: [u32; 3],
    pub positions: Vec<u32>,
    pub length: u32,
}

/// A corpus record, one row of the eleven-column CSV.
///
/// Header order: `id,title,keywords,venue,year,n_citation,url,abstract,authors,doc_type,references`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRecord {
    pub id: String,
    pub title: String,
    pub keywords: String,
    pub venue: String,
    pub year: String,
    pub n_citation: String,
    pub url: String,
    pub abstract_text: String,
    pub authors: String,
    pub doc_type: String,
    pub references: String,
}

impl DocRecord {
    /// Column count of the corpus schema.
    pub const FIELDS: usize = 11;

    /// The corpus CSV header row.
    pub const HEADER: [&'static str; Self::FIELDS] = [
        "id",
        "title",
        "keywords",
        "venue",
        "year",
        "n_citation",
        "url",
        "abstract",
        "authors",
        "doc_type",
        "references",
    ];

    pub(crate) fn from_fields(fields: &csv::StringRecord) -> Option<Self> {
        if fields.len() != Self::FIELDS {
            return None;
        }
        Some(Self {
            id: fields[0].to_string(),
            title: fields[1].to_string(),
            keywords: fields[2].to_string(),
            venue: fields[3].to_string(),
            year: fields[4].to_string(),
            n_citation: fields[5].to_string(),
            url: fields[6].to_string(),
            abstract_text: fields[7].to_string(),
            authors: fields[8].to_string(),
            doc_type: fields[9].to_string(),
            references: fields[10].to_string(),
        })
    }

    pub(crate) fn to_fields(&self) -> [&str; Self::FIELDS] {
        [
            &self.id,
            &self.title,
            &self.keywords,
            &self.venue,
            &self.year,
            &self.n_citation,
            &self.url,
            &self.abstract_text,
            &self.authors,
            &self.doc_type,
            &self.references,
        ]
    }
}

/// An incoming document for insertion.
///
/// `title`, `abstract`, `keywords`, `venue`, and `year` are required by the
/// insertion API; the remaining columns default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewDocument {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub venue: String,
    pub year: String,
    pub n_citation: String,
    pub url: String,
    pub authors: String,
    pub doc_type: String,
    pub references: String,
}
