//! Ranked retrieval: section-weighted BM25 with a positional proximity
//! boost.

use ahash::AHashMap;

use crate::error::Result;
use crate::index::{BarrelStore, EngineMetadata, Lexicon};
use crate::types::DocId;

/// Term-frequency saturation parameter.
pub const K1: f64 = 1.5;
/// Document-length normalization parameter.
pub const B: f64 = 0.8;

/// Section weights applied to raw frequencies before saturation.
pub const TITLE_WEIGHT: f64 = 1.1;
pub const ABSTRACT_WEIGHT: f64 = 0.2;
pub const KEYWORDS_WEIGHT: f64 = 0.25;

/// Multipliers for the proximity pass.
pub const PROXIMITY_BOOST: f64 = 2.0;
pub const TITLE_PROXIMITY_BOOST: f64 = 3.0;

/// Positional gap under which two query terms count as near, before length
/// scaling.
pub const SAFE_DISTANCE_BASE: u32 = 5;
pub const MAX_SAFE_DISTANCE: u32 = 20;

/// Positions below this offset approximate the title region in the
/// proximity pass.
const TITLE_REGION: u32 = 100;

/// Read-only view over the index state needed to score a query.
///
/// The engine hands the ranker explicit state objects; the ranker owns no
/// storage of its own.
pub struct Ranker<'a> {
    lexicon: &'a Lexicon,
    barrels: &'a BarrelStore,
    metadata: &'a EngineMetadata,
}

impl<'a> Ranker<'a> {
    pub fn new(
        lexicon: &'a Lexicon,
        barrels: &'a BarrelStore,
        metadata: &'a EngineMetadata,
    ) -> Self {
        Self {
            lexicon,
            barrels,
            metadata,
        }
    }

    /// Score every document containing at least one query token.
    ///
    /// Returns `(doc_id, score)` pairs sorted by score descending, ties
    /// broken by doc_id ascending, so two invocations over identical index
    /// state are byte-identical. Tokens missing from the lexicon are
    /// silently skipped.
    pub fn rank(&self, query_tokens: &[String]) -> Result<Vec<(DocId, f64)>> {
        let n = self.metadata.forward_index_length as f64;
        let avg_doc_length = self.metadata.avg_doc_length();

        let mut scores: AHashMap<DocId, f64> = AHashMap::new();
        // Per-document positions of each query token, indexed by the
        // token's place in the query.
        let mut term_positions: AHashMap<DocId, Vec<Option<Vec<u32>>>> = AHashMap::new();
        let mut doc_lengths: AHashMap<DocId, u32> = AHashMap::new();

        // Pass 1: per-term BM25 contributions.
        for (qi, token) in query_tokens.iter().enumerate() {
            let Some(term_id) = self.lexicon.get_id(token) else {
                tracing::debug!(%token, "Query token not in lexicon; skipped");
                continue;
            };
            let postings = self.barrels.postings_for(term_id)?;
            if postings.is_empty() {
                continue;
            }

            let df = postings.len() as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for posting in postings {
                term_positions
                    .entry(posting.doc_id.clone())
                    .or_insert_with(|| vec![None; query_tokens.len()])[qi] =
                    Some(posting.positions);
                doc_lengths.insert(posting.doc_id.clone(), posting.length);

                let f = f64::from(posting.frequency[0]) * TITLE_WEIGHT
                    + f64::from(posting.frequency[1]) * ABSTRACT_WEIGHT
                    + f64::from(posting.frequency[2]) * KEYWORDS_WEIGHT;
                let numerator = f * (K1 + 1.0);
                let denominator = f
                    + K1 * (1.0 - B + B * (f64::from(posting.length) / avg_doc_length));
                *scores.entry(posting.doc_id).or_insert(0.0) += idf * numerator / denominator;
            }
        }

        // Pass 2: proximity boost, skipped for single-term queries.
        if query_tokens.len() >= 2 {
            for (doc_id, score) in &mut scores {
                let Some(positions) = term_positions.get(doc_id) else {
                    continue;
                };
                let doc_length = doc_lengths.get(doc_id).copied().unwrap_or(0);
                let safe = (SAFE_DISTANCE_BASE + doc_length / 1000).min(MAX_SAFE_DISTANCE);

                let mut boost = 0.0;
                for i in 0..positions.len() {
                    for j in (i + 1)..positions.len() {
                        let (Some(pos_i), Some(pos_j)) = (&positions[i], &positions[j]) else {
                            continue;
                        };
                        boost += pair_boost(pos_i, pos_j, safe);
                    }
                }
                *score *= 1.0 + boost;
            }
        }

        let mut ranked: Vec<(DocId, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }
}

/// Proximity contribution of one query-token pair within one document.
fn pair_boost(pos_i: &[u32], pos_j: &[u32], safe: u32) -> f64 {
    let mut boost = 0.0;

    // Title proximity first, restricted to the approximate title region.
    let title_i: Vec<u32> = pos_i.iter().copied().filter(|&p| p < TITLE_REGION).collect();
    let title_j: Vec<u32> = pos_j.iter().copied().filter(|&p| p < TITLE_REGION).collect();
    if !title_i.is_empty() && !title_j.is_empty() {
        boost += proximity(min_distance(&title_i, &title_j), safe) * TITLE_PROXIMITY_BOOST;
    }

    boost += proximity(min_distance(pos_i, pos_j), safe) * PROXIMITY_BOOST;
    boost
}

/// `1 − d/safe` when the gap is within the safe distance, else zero.
fn proximity(d_min: u32, safe: u32) -> f64 {
    if d_min <= safe {
        1.0 - f64::from(d_min) / f64::from(safe)
    } else {
        0.0
    }
}

/// Minimum absolute gap between two ascending position lists.
fn min_distance(a: &[u32], b: &[u32]) -> u32 {
    let (mut i, mut j) = (0, 0);
    let mut best = u32::MAX;
    while i < a.len() && j < b.len() {
        best = best.min(a[i].abs_diff(b[j]));
        if a[i] <= b[j] {
            i += 1;
        } else {
            j += 1;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DEFAULT_BARREL_SIZE, ForwardEntry, ForwardIndex};
    use assert2::check;
    use rstest::rstest;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        lexicon: Lexicon,
        barrels: BarrelStore,
        metadata: EngineMetadata,
    }

    impl Fixture {
        fn rank(&self, query: &[&str]) -> Vec<(DocId, f64)> {
            Ranker::new(&self.lexicon, &self.barrels, &self.metadata)
                .rank(&tokens(query))
                .unwrap()
        }
    }

    /// Build an index over `(doc_id, title tokens, abstract tokens)` rows.
    fn fixture(docs: &[(&str, &[&str], &[&str])]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut lexicon = Lexicon::new();
        let mut forward = ForwardIndex::new();
        let mut metadata = EngineMetadata::default();

        for (doc_id, title, abstract_) in docs {
            let entry = ForwardEntry::from_sections(
                &mut lexicon,
                [&tokens(title), &tokens(abstract_), &[]],
            );
            metadata.total_doc_length += u64::from(entry.length);
            metadata.forward_index_length += 1;
            forward.add((*doc_id).to_string(), entry).unwrap();
        }

        let barrels = BarrelStore::build(
            &forward,
            &dir.path().join("barrels"),
            &dir.path().join("barrel_metadata"),
            DEFAULT_BARREL_SIZE,
        )
        .unwrap();
        metadata.last_barrel = barrels.last_barrel();

        Fixture {
            _dir: dir,
            lexicon,
            barrels,
            metadata,
        }
    }

    #[test]
    fn single_doc_single_term_matches_the_closed_form() {
        let fx = fixture(&[("d1", &["machin", "learn"], &["neural", "network"])]);
        let ranked = fx.rank(&["machin"]);

        check!(ranked.len() == 1);
        check!(ranked[0].0 == "d1");

        // df = 1, N = 1, doc_length = avg_doc_length
        let idf = ((1.0 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0_f64).ln();
        let f = TITLE_WEIGHT;
        let expected = idf * (f * (K1 + 1.0)) / (f + K1 * (1.0 - B + B));
        check!((ranked[0].1 - expected).abs() < 1e-12);
    }

    #[test]
    fn unknown_terms_are_skipped_silently() {
        let fx = fixture(&[("d1", &["machin"], &[])]);
        check!(fx.rank(&["nonexistent"]).is_empty());
        let mixed = fx.rank(&["nonexistent", "machin"]);
        check!(mixed.len() == 1);
    }

    #[test]
    fn adjacency_outranks_separation() {
        // "deep learn" adjacent in d1's title; far apart in d2's abstract.
        let fx = fixture(&[
            ("d1", &["deep", "learn"], &["neural", "network", "train"]),
            (
                "d2",
                &["deep", "convolut"],
                &["wide", "tabl", "survey", "learn", "method"],
            ),
        ]);
        let ranked = fx.rank(&["deep", "learn"]);
        check!(ranked.len() == 2);
        check!(ranked[0].0 == "d1");
        check!(ranked[0].1 > ranked[1].1);
    }

    #[test]
    fn single_term_queries_skip_the_proximity_pass() {
        let fx = fixture(&[("d1", &["deep", "learn"], &[])]);
        let single = fx.rank(&["deep"]);

        // Raw BM25: no (1 + boost) multiplier even though "learn" is
        // adjacent in the document.
        let idf = ((1.0 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0_f64).ln();
        let f = TITLE_WEIGHT;
        let expected = idf * (f * (K1 + 1.0)) / (f + K1 * (1.0 - B + B));
        check!((single[0].1 - expected).abs() < 1e-12);
    }

    #[test]
    fn ties_break_by_doc_id_ascending() {
        let fx = fixture(&[
            ("zeta", &["graph"], &["common"]),
            ("alpha", &["graph"], &["common"]),
        ]);
        let ranked = fx.rank(&["graph"]);
        check!(ranked.len() == 2);
        check!((ranked[0].1 - ranked[1].1).abs() < 1e-12);
        check!(ranked[0].0 == "alpha");
        check!(ranked[1].0 == "zeta");
    }

    #[test]
    fn ranking_is_deterministic_across_invocations() {
        let fx = fixture(&[
            ("d1", &["inform", "retriev"], &["rank", "function", "probabilist"]),
            ("d2", &["retriev", "augment"], &["rank", "languag", "model"]),
            ("d3", &["rank", "learn"], &["inform", "need"]),
        ]);
        let first = fx.rank(&["inform", "retriev", "rank"]);
        let second = fx.rank(&["inform", "retriev", "rank"]);
        check!(first == second);
    }

    #[rstest]
    #[case(&[0, 10, 20], &[12, 40], 2)]
    #[case(&[5], &[5], 0)]
    #[case(&[1, 2, 3], &[100], 97)]
    fn min_distance_finds_the_closest_pair(
        #[case] a: &[u32],
        #[case] b: &[u32],
        #[case] expected: u32,
    ) {
        check!(min_distance(a, b) == expected);
    }

    #[rstest]
    #[case(0, 5, 1.0)]
    #[case(5, 5, 0.0)]
    #[case(6, 5, 0.0)]
    #[case(2, 5, 0.6)]
    fn proximity_decays_linearly_to_the_safe_distance(
        #[case] d: u32,
        #[case] safe: u32,
        #[case] expected: f64,
    ) {
        check!((proximity(d, safe) - expected).abs() < 1e-12);
    }
}
