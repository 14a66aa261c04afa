use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::index::DEFAULT_BARREL_SIZE;

#[derive(Parser)]
#[command(name = "scholar-search")]
#[command(about = "Full-text search over a scholarly document corpus", long_about = None)]
pub struct Cli {
    /// Directory holding the persistent index containers
    #[arg(short, long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Corpus CSV path
    #[arg(short, long, default_value = "data/corpus.csv")]
    pub corpus: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every index from the corpus CSV
    Build {
        /// Target serialized barrel size in bytes
        #[arg(short = 's', long, default_value_t = DEFAULT_BARREL_SIZE)]
        barrel_size: usize,
    },
    /// Ranked retrieval; omit the query for an interactive loop
    Search {
        query: Option<String>,
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// Prefix completions for the final query token
    Autocomplete { query: String },
    /// Fuzzy alternatives for a mistyped term
    Suggest { query: String },
    /// Insert a document given as a JSON object (argument or stdin)
    Add {
        /// JSON document; read from stdin when omitted
        json: Option<String>,
    },
    /// Index statistics
    Stats,
    /// Terms appearing in the most documents
    TopTerms {
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}
