#![warn(unreachable_pub)]
#![warn(dead_code)]

pub mod cli;
pub mod engine;
pub mod error;
pub mod index;
pub mod logging;
pub mod normalize;
pub mod rank;
pub mod store;
pub mod trie;
pub mod types;

// Re-export common types
pub use engine::{AddResponse, EngineConfig, SearchEngine, SearchHit, SearchResponse};
pub use error::{EngineError, IndexError, QueryError, Result, StoreError};
pub use index::{BarrelStore, EngineMetadata, ForwardIndex, Lexicon};
pub use normalize::Normalizer;
pub use store::DocumentStore;
pub use types::{DocId, DocRecord, NewDocument, Posting, Section, TermId};
