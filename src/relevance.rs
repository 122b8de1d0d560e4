//! Relevance gate: decides whether a visitor message is about the
//! exhibition before any retrieval work is spent.
//!
//! Purely lexical, zero network calls. The decision order is fixed:
//! blocklist beats allowlist beats everything else, and a bare question
//! word with no domain term is refused. Earlier revisions accepted any
//! question-shaped message; that let "what should I eat?" through, so the
//! stricter rule stands.

use crate::lexicon::Lexicon;

/// Returns true when the message is worth a retrieval pass.
pub fn is_relevant(lexicon: &Lexicon, message: &str) -> bool {
    let normalized = message.to_lowercase();
    let normalized = normalized.trim();

    if normalized.is_empty() {
        return false;
    }

    // Blocklist wins over everything, including allowlist hits.
    if let Some(term) = lexicon
        .blocklist
        .iter()
        .find(|term| normalized.contains(term.as_str()))
    {
        tracing::debug!(term = %term, "message refused by blocklist");
        return false;
    }

    if lexicon
        .allowlist
        .iter()
        .any(|term| normalized.contains(term.as_str()))
    {
        return true;
    }

    // Inflected forms: retry with particle-stripped allowlist stems.
    for term in &lexicon.allowlist {
        if term.chars().count() < 3 {
            continue;
        }
        let stem = lexicon.strip_particle(term);
        if stem != term && normalized.contains(stem) {
            tracing::debug!(term = %term, stem = %stem, "message accepted via stemmed allowlist term");
            return true;
        }
    }

    // A question word alone is not evidence of topicality.
    if lexicon
        .interrogatives
        .iter()
        .any(|word| normalized.contains(word.as_str()))
    {
        tracing::debug!("message refused: interrogative with no domain term");
        return false;
    }

    false
}
