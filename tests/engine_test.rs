//! End-to-end query-path tests over a freshly built corpus.

mod common;

use assert2::{check, let_assert};
use common::{Doc, build_engine, build_engine_with_barrel_size, reopen_engine, sample_corpus};
use scholar_search::error::{EngineError, QueryError};
use scholar_search::rank::{B, K1, TITLE_WEIGHT};

#[test]
fn single_term_search_matches_the_closed_form_score() {
    let docs = vec![Doc::new("d1", "Machine Learning", "Neural Networks")];
    let (_dir, engine) = build_engine(&docs);

    let response = engine.search("machine").unwrap();
    check!(response.results_count == 1);
    check!(response.normalized_query == "machin");

    let hit = &response.results[0];
    check!(hit.doc_id == "d1");
    check!(hit.title == "Machine Learning");

    // One document, one occurrence in the title, doc_length == avg.
    let idf = ((1.0 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0_f64).ln();
    let expected = idf * (TITLE_WEIGHT * (K1 + 1.0)) / (TITLE_WEIGHT + K1 * (1.0 - B + B));
    check!((hit.score - expected).abs() < 1e-12);
}

#[test]
fn proximity_boost_ranks_adjacent_terms_first() {
    // Both documents contain "deep" and "learning"; they are adjacent only
    // in d1.
    let docs = vec![
        Doc::new(
            "d1",
            "Deep Learning Methods",
            "Training procedures for modern architectures.",
        ),
        Doc::new(
            "d2",
            "Deep Networks Evaluated",
            "Benchmarks examined across transfer scenarios with learning rates.",
        ),
    ];
    let (_dir, engine) = build_engine(&docs);

    let response = engine.search("deep learning").unwrap();
    check!(response.results_count == 2);
    check!(response.results[0].doc_id == "d1");
    check!(response.results[0].score > response.results[1].score);
}

#[test]
fn discriminating_tokens_recall_their_document() {
    let (_dir, engine) = build_engine(&sample_corpus());

    for (query, doc_id) in [
        ("cardinality", "d3"),
        ("suffix", "d4"),
        ("gradient", "d2"),
        ("supervised", "d1"),
    ] {
        let response = engine.search(query).unwrap();
        check!(
            response.results.iter().any(|hit| hit.doc_id == doc_id),
            "query '{query}' should recall {doc_id}"
        );
    }
}

#[test]
fn empty_query_fails_with_empty_query() {
    let (_dir, engine) = build_engine(&sample_corpus());

    for query in ["", "   ", "\t\n"] {
        let result = engine.search(query);
        let_assert!(Err(err) = result);
        let_assert!(
            Some(EngineError::Query(QueryError::EmptyQuery)) = err.downcast_ref::<EngineError>()
        );
    }
}

#[test]
fn stopword_only_queries_return_zero_results_without_error() {
    let (_dir, engine) = build_engine(&sample_corpus());

    let response = engine.search("the of is at").unwrap();
    check!(response.results_count == 0);
    check!(response.results.is_empty());

    // Tokens under three characters normalize away too.
    let response = engine.search("ab xy").unwrap();
    check!(response.results_count == 0);
}

#[test]
fn autocomplete_completes_the_final_token_only() {
    let docs = vec![
        Doc::new("d1", "Machine Learning", "Neural networks."),
        Doc::new("d2", "Machinery Maintenance", "Industrial macro planning."),
    ];
    let (_dir, engine) = build_engine(&docs);

    // Lexicon keys are normalized tokens: machin, machineri, macro, ...
    let suggestions = engine.autocomplete("mach");
    check!(suggestions == vec!["machin", "machineri"]);

    // Leading tokens are prefixed back onto each completion.
    let suggestions = engine.autocomplete("neural mach");
    check!(suggestions == vec!["neural machin", "neural machineri"]);

    // Every suggestion extends the normalized prefix.
    for suggestion in engine.autocomplete("ma") {
        check!(suggestion.starts_with("ma"));
    }
}

#[test]
fn autocomplete_with_empty_last_token_yields_nothing() {
    let (_dir, engine) = build_engine(&sample_corpus());
    check!(engine.autocomplete("").is_empty());
    check!(engine.autocomplete("machine ").is_empty());
    check!(engine.autocomplete("zzzzz").is_empty());
}

#[test]
fn typo_suggestions_come_from_the_lexicon() {
    let (_dir, engine) = build_engine(&sample_corpus());

    let suggestions = engine.suggest_typo("gradiant");
    check!(!suggestions.is_empty());
    check!(suggestions[0] == "gradient");
    check!(suggestions.len() <= 5);
    for suggestion in &suggestions {
        check!(engine.lexicon().get_id(suggestion).is_some());
    }

    check!(engine.suggest_typo("").is_empty());
}

#[test]
fn term_ids_are_stable_across_restarts() {
    let (dir, engine) = build_engine(&sample_corpus());
    let before: Vec<(String, _)> = engine
        .lexicon()
        .keys()
        .map(|k| (k.to_string(), engine.lexicon().get_id(k)))
        .collect();
    drop(engine);

    let reopened = reopen_engine(&dir);
    for (token, id) in before {
        check!(reopened.lexicon().get_id(&token) == id);
    }
}

#[test]
fn search_is_deterministic_after_reopen() {
    let (dir, engine) = build_engine(&sample_corpus());
    let first = engine.search("learning query optimization").unwrap();
    drop(engine);

    let reopened = reopen_engine(&dir);
    let second = reopened.search("learning query optimization").unwrap();

    check!(first.results_count == second.results_count);
    let firsts: Vec<_> = first.results.iter().map(|h| (&h.doc_id, h.score)).collect();
    let seconds: Vec<_> = second.results.iter().map(|h| (&h.doc_id, h.score)).collect();
    check!(firsts == seconds);
}

#[test]
fn metadata_counters_match_the_forward_index() {
    let (_dir, engine) = build_engine(&sample_corpus());
    let metadata = engine.metadata();
    check!(metadata.forward_index_length == engine.forward_index().len() as u64);
    check!(metadata.total_doc_length == engine.forward_index().total_length());
}

#[test]
fn every_posting_names_a_stored_document() {
    let (_dir, engine) = build_engine(&sample_corpus());

    for token in engine.lexicon().keys() {
        let term_id = engine.lexicon().get_id(token).unwrap();
        for posting in engine.barrels().postings_for(term_id).unwrap() {
            check!(
                engine.document(&posting.doc_id).unwrap().is_some(),
                "posting for '{token}' names unknown doc {}",
                posting.doc_id
            );
        }
    }
}

#[test]
fn tiny_barrels_still_cover_the_full_lexicon() {
    let (_dir, engine) = build_engine_with_barrel_size(&sample_corpus(), 1024);

    let mut covered = 0usize;
    for (_, count) in engine.barrels().key_counts().unwrap() {
        covered += count;
    }
    check!(covered == engine.lexicon().len());

    // Queries behave identically under the small-barrel layout.
    let response = engine.search("suffix").unwrap();
    check!(response.results[0].doc_id == "d4");
}

#[test]
fn concurrent_searches_agree() {
    let (_dir, engine) = build_engine(&sample_corpus());

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| engine.search("deep learning optimization").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let reference: Vec<_> = results[0]
        .results
        .iter()
        .map(|h| (h.doc_id.clone(), h.score))
        .collect();
    for response in &results {
        let this: Vec<_> = response
            .results
            .iter()
            .map(|h| (h.doc_id.clone(), h.score))
            .collect();
        check!(this == reference);
    }
}

#[test]
fn top_terms_rank_by_document_frequency() {
    let (_dir, engine) = build_engine(&sample_corpus());

    // "learn" (d1 keywords, d2 title) and "optim" (d2 keywords, d3 title)
    // are the only terms present in two documents.
    let top = engine.top_terms(2).unwrap();
    check!(top == vec![("learn".to_string(), 2), ("optim".to_string(), 2)]);

    let all = engine.top_terms(usize::MAX).unwrap();
    check!(all.len() == engine.lexicon().len());
    for (_, df) in &all[2..] {
        check!(*df == 1);
    }
}

#[test]
fn long_abstracts_are_previewed() {
    let long_abstract: &'static str =
        Box::leak(format!("lengthy explanation {}", "detail ".repeat(120)).into_boxed_str());
    let docs = vec![Doc::new("d1", "Verbose Paper", long_abstract)];
    let (_dir, engine) = build_engine(&docs);

    let response = engine.search("verbose").unwrap();
    let hit = &response.results[0];
    check!(hit.abstract_text.len() < long_abstract.len());
    check!(hit.abstract_text.ends_with("..."));
}
