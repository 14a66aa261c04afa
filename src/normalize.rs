//! Text normalization: the deterministic token-stream producer behind every
//! index and query path.
//!
//! The pipeline is fixed: non-alphanumeric runs collapse to a single space,
//! lowercase, whitespace split, stopword drop, short-token drop, stemming,
//! then WordNet-style lemmatization. For a fixed stopword table and stemmer
//! the output is byte-deterministic, and `normalize` is idempotent up to
//! whitespace splitting.

use ahash::AHashSet;
use rust_stemmers::{Algorithm, Stemmer};

/// Minimum token length kept by the pipeline. Scholarly prose gains nothing
/// from one- and two-character fragments.
const MIN_TOKEN_LENGTH: usize = 3;

/// English stop words filtered out before stemming.
///
/// The apostrophe forms of the usual list ("you're", "isn't") never survive
/// punctuation stripping, so only the bare forms are listed.
pub(crate) const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such",
    "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
    "will", "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain",
    "aren", "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn",
    "mustn", "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

/// Reusable normalizer holding the stemmer and the stopword set.
///
/// Construction is cheap enough for ad-hoc use but query paths keep one
/// instance alive per engine.
pub struct Normalizer {
    stemmer: Stemmer,
    stop_words: AHashSet<&'static str>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `text` into a whitespace-joined string of index tokens.
    ///
    /// Empty input yields empty output.
    pub fn normalize(&self, text: &str) -> String {
        self.tokens(text).join(" ")
    }

    /// Normalize `text` and return the token stream itself.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let mut tokens = vec![];
        // Scanning alphanumeric spans is equivalent to replacing every
        // non-alphanumeric run with a space and splitting on whitespace.
        let mut span = String::new();
        for c in text.chars() {
            if c.is_alphanumeric() {
                span.extend(c.to_lowercase());
            } else if !span.is_empty() {
                self.push_token(&span, &mut tokens);
                span.clear();
            }
        }
        if !span.is_empty() {
            self.push_token(&span, &mut tokens);
        }
        tokens
    }

    /// Flatten a keyword list to the space-joined surface form fed to
    /// `normalize`.
    pub fn flatten_keywords(keywords: &[String]) -> String {
        keywords.join(" ")
    }

    /// Filter and reduce one lowercased span: stopword drop, short-token
    /// drop, stem, lemmatize.
    fn push_token(&self, span: &str, tokens: &mut Vec<String>) {
        if self.stop_words.contains(span) {
            return;
        }
        if span.chars().count() < MIN_TOKEN_LENGTH {
            return;
        }
        let stemmed = self.stemmer.stem(span);
        tokens.push(lemmatize(&stemmed));
    }
}

/// WordNet-style noun lemmatization by suffix detachment.
///
/// The Snowball stemmer already strips most plural morphology, so these
/// rules catch the survivors (irregular "men", residual "-es"/"-ies"
/// spellings). Each rule keeps the remainder at `MIN_TOKEN_LENGTH` or more,
/// which makes a second application a no-op.
fn lemmatize(word: &str) -> String {
    const RULES: &[(&str, &str)] = &[
        ("ches", "ch"),
        ("shes", "sh"),
        ("ses", "s"),
        ("xes", "x"),
        ("zes", "z"),
        ("ves", "f"),
        ("ies", "y"),
        ("men", "man"),
    ];
    for (suffix, replacement) in RULES {
        if let Some(stem) = word.strip_suffix(suffix) {
            let candidate = format!("{stem}{replacement}");
            if candidate.chars().count() >= MIN_TOKEN_LENGTH {
                return candidate;
            }
        }
    }
    // Bare plural "s", but never "-ss" ("class"), "-us" ("corpus"), or
    // "-is" ("axis"), and never below the minimum token length.
    if let Some(stem) = word.strip_suffix('s') {
        let keeps_length = stem.chars().count() >= MIN_TOKEN_LENGTH;
        let exempt = word.ends_with("ss") || word.ends_with("us") || word.ends_with("is");
        if keeps_length && !exempt {
            return stem.to_string();
        }
    }
    word.to_string()
}
