//! The retrieval pipeline behind every answered question.
//!
//! A query flows through five stages:
//!
//! 1. embed the query,
//! 2. run vector search and keyword search independently,
//! 3. merge the two candidate lists, deduplicating by passage id,
//! 4. re-score every candidate with a keyword boost,
//! 5. order keyword-matching candidates ahead of the rest and truncate.
//!
//! [`should_answer`] then decides whether the surviving candidates are
//! strong enough to ground a generated answer at all. The thresholds are
//! two-stage on purpose: the vector fetch floor stays near zero so the
//! re-ranker sees a broad slate, while acceptance is gated at 0.6 — see
//! `test_two_stage_thresholds_are_pinned`.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::RetrievalConfig;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::lexicon::Lexicon;
use crate::models::{RankedResult, SearchResult};
use crate::store;

/// Run the full pipeline and return at most `top_k` ranked passages.
///
/// An embedding failure aborts the search; the chat layer turns that into
/// an apology rather than a raw error.
pub async fn retrieve(
    pool: &SqlitePool,
    provider: &dyn EmbeddingProvider,
    lexicon: &Lexicon,
    config: &RetrievalConfig,
    query: &str,
) -> Result<Vec<RankedResult>> {
    let query_vector = embed_query(provider, query).await?;
    retrieve_with_vector(pool, lexicon, config, query, &query_vector).await
}

/// Search, merge and rank with an already-computed query embedding.
///
/// Callers that need to tell provider failures apart from store failures
/// embed first and hand the vector in; errors from this function are store
/// errors.
pub async fn retrieve_with_vector(
    pool: &SqlitePool,
    lexicon: &Lexicon,
    config: &RetrievalConfig,
    query: &str,
    query_vector: &[f32],
) -> Result<Vec<RankedResult>> {
    let matched_terms = lexicon.matched_domain_terms(query);
    let keyword_hits = store::keyword_candidates(
        pool,
        &matched_terms,
        config.keyword_score,
        config.candidate_limit,
    )
    .await?;
    let vector_hits =
        store::vector_candidates(pool, query_vector, config.candidate_limit, config.vector_floor)
            .await?;

    tracing::debug!(
        keyword = keyword_hits.len(),
        vector = vector_hits.len(),
        terms = ?matched_terms,
        "candidate search complete"
    );

    let merged = merge_candidates(keyword_hits, vector_hits);
    let ranked = rank_candidates(lexicon, config, query, merged);

    for (i, result) in ranked.iter().enumerate() {
        tracing::debug!(
            rank = i + 1,
            title = %result.hit.document_title,
            similarity = result.hit.similarity,
            boosted = result.boosted_score,
            matches = result.keyword_matches,
            "ranked candidate"
        );
    }

    Ok(ranked)
}

/// Union the two candidate lists, deduplicating by passage id.
///
/// Keyword hits come first so a passage found by both searches keeps the
/// keyword flat score; those scores are constructed to dominate vector
/// similarity.
pub fn merge_candidates(
    keyword_hits: Vec<SearchResult>,
    vector_hits: Vec<SearchResult>,
) -> Vec<SearchResult> {
    let mut merged: Vec<SearchResult> = Vec::with_capacity(keyword_hits.len() + vector_hits.len());
    for candidate in keyword_hits.into_iter().chain(vector_hits) {
        if !merged.iter().any(|c| c.passage_id == candidate.passage_id) {
            merged.push(candidate);
        }
    }
    merged
}

/// Re-score candidates with the keyword boost, then order them.
///
/// Candidates with at least one keyword match always precede those with
/// none, whatever their raw similarity. Exact-term grounding beats
/// embedding drift.
pub fn rank_candidates(
    lexicon: &Lexicon,
    config: &RetrievalConfig,
    query: &str,
    candidates: Vec<SearchResult>,
) -> Vec<RankedResult> {
    let keywords = lexicon.query_keywords(query);

    let ranked: Vec<RankedResult> = candidates
        .into_iter()
        .map(|hit| {
            let text = hit.text.to_lowercase();
            let matches = keywords.iter().filter(|kw| text.contains(kw.as_str())).count();
            let boost = (config.boost_per_match * matches as f64).min(config.boost_cap);
            RankedResult {
                boosted_score: hit.similarity + boost,
                keyword_matches: matches,
                hit,
            }
        })
        .collect();

    let (mut matched, mut unmatched): (Vec<RankedResult>, Vec<RankedResult>) =
        ranked.into_iter().partition(|r| r.keyword_matches > 0);

    matched.sort_by(|a, b| {
        b.keyword_matches.cmp(&a.keyword_matches).then(
            b.boosted_score
                .partial_cmp(&a.boosted_score)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    unmatched.sort_by(|a, b| {
        b.boosted_score
            .partial_cmp(&a.boosted_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    matched.extend(unmatched);
    matched.truncate(config.top_k);
    matched
}

/// Decide whether the candidates can ground an answer.
///
/// Three ways to say no: nothing was retrieved, the best raw similarity is
/// below the acceptance threshold (the boost never counts here), or the
/// query carries checkable keywords and none of them appear anywhere in
/// the candidate texts. The last rule catches high-similarity but
/// wrong-topic embedding hits.
pub fn should_answer(
    lexicon: &Lexicon,
    config: &RetrievalConfig,
    query: &str,
    results: &[RankedResult],
) -> bool {
    if results.is_empty() {
        tracing::debug!("confidence gate: no candidates");
        return false;
    }

    let max_similarity = results
        .iter()
        .map(|r| r.hit.similarity)
        .fold(f64::MIN, f64::max);
    if max_similarity < config.min_similarity {
        tracing::debug!(
            max_similarity,
            threshold = config.min_similarity,
            "confidence gate: best candidate below threshold"
        );
        return false;
    }

    let mut gate_keywords: Vec<String> = lexicon
        .query_keywords(query)
        .into_iter()
        .filter(|kw| kw.chars().all(|c| c.is_ascii_alphabetic()))
        .collect();
    gate_keywords.extend(lexicon.matched_domain_terms(query));

    if !gate_keywords.is_empty() {
        let haystack: String = results
            .iter()
            .map(|r| r.hit.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        let grounded = gate_keywords
            .iter()
            .any(|kw| haystack.contains(&kw.to_lowercase()));
        if !grounded {
            tracing::debug!(?gate_keywords, "confidence gate: no query keyword in candidate texts");
            return false;
        }
    }

    true
}
