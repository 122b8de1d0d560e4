//! Domain vocabulary and query token analysis.
//!
//! The exhibition corpus is bilingual: artifact names and most passage text
//! are Korean, visitor questions arrive in Korean or English. Everything
//! here is plain substring/token work; no model calls.
//!
//! Korean nouns inflect with grammatical particles (조사) glued onto the
//! word, so "호랑이가" and "호랑이" are the same noun.
//! [`Lexicon::strip_particle`] removes one trailing particle so token
//! matching survives inflection.
//!
//! The built-in lists cover the Tiger Exhibition. Curators can override any
//! of them with a TOML file (`lexicon.file` in the configuration) without
//! touching code.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Artifact and exhibition nouns used by keyword search. A query must
/// contain one of these verbatim for keyword search to run at all.
const DOMAIN_TERMS: &[&str] = &[
    "호작도",
    "용호도",
    "산신도",
    "호렵도",
    "월하송림호족도",
    "호호도",
    "호랑이",
    "범",
    "호",
    "까치",
    "호족도",
];

/// Visitors often call 호작도 by its colloquial name 호호도. When the
/// colloquial form matches, the canonical term joins the search set.
const DOMAIN_ALIASES: &[(&str, &str)] = &[("호호도", "호작도")];

/// Terms that mark a message as on-topic for the relevance gate.
const ALLOWLIST: &[&str] = &[
    // Exhibition related
    "tiger",
    "tigers",
    "exhibition",
    "museum",
    "national museum",
    "korean museum",
    "art",
    "artwork",
    "painting",
    "paintings",
    "traditional",
    "culture",
    // Tiger art specific
    "hwachodo",
    "yonghodo",
    "sanshindo",
    "horyeopdo",
    "tiger painting",
    "tiger art",
    "korean tiger",
    "traditional tiger",
    "tiger symbolism",
    // Museum and cultural terms
    "joseon",
    "dynasty",
    "korean art",
    "korean culture",
    "traditional art",
    "folk art",
    "minhwa",
    "korean painting",
    "east asian art",
    // Character and modern connection
    "kpop demon hunters",
    "character",
    "characters",
    "cute tiger",
    "modern interpretation",
    "contemporary",
    "pop culture",
    // General museum terms
    "visit",
    "tour",
    "gallery",
    "display",
    "collection",
    "artifact",
    "history",
    "heritage",
    "cultural",
    "exhibition hall",
    // Korean artifact names
    "호작도",
    "용호도",
    "산신도",
    "호렵도",
    "월하송림호족도",
    "호호도",
    "호족도",
    "호랑이",
    "까치",
    // Korean exhibition and culture vocabulary
    "전시",
    "전시회",
    "박물관",
    "국립중앙박물관",
    "미술",
    "예술",
    "작품",
    "그림",
    "민화",
    "전통",
    "문화",
    "조선",
    "문양",
    "화가",
    "유물",
    "관람",
    "수호신",
    "케이팝",
    "캐릭터",
];

/// Off-topic domains. A blocklist hit refuses the message outright, even
/// when an allowlisted term is also present.
const BLOCKLIST: &[&str] = &[
    "weather",
    "restaurant",
    "hotel",
    "shopping",
    "transportation",
    "날씨",
    "식당",
    "맛집",
    "호텔",
    "쇼핑",
    "교통",
    "지하철",
    "버스",
    "주차",
    "정치",
    "주식",
    "부동산",
];

/// Question words. A question shape alone is not evidence of topicality;
/// the gate uses these only to recognize (and refuse) bare interrogatives.
const INTERROGATIVES: &[&str] = &[
    "what",
    "how",
    "when",
    "where",
    "why",
    "tell me",
    "explain",
    "show",
    "describe",
    "about",
    "information",
    "details",
    "뭐",
    "무엇",
    "뭔가",
    "어떤",
    "어디",
    "언제",
    "누구",
    "왜",
    "어떻게",
    "알려줘",
    "설명해",
    "보여줘",
];

/// Korean grammatical particles.
const PARTICLES: &[&str] = &[
    "에서", "으로", "이나", "라도", "부터", "까지", "처럼", "한테", "에게", "께서", "은", "는",
    "이", "가", "을", "를", "의", "에", "로", "와", "과", "도", "만", "나",
];

fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// The vocabulary tables driving the relevance gate and keyword scoring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub domain_terms: Vec<String>,
    /// Pairs of (colloquial, canonical): a colloquial hit pulls the
    /// canonical term into the keyword search set.
    pub aliases: Vec<(String, String)>,
    pub allowlist: Vec<String>,
    pub blocklist: Vec<String>,
    pub interrogatives: Vec<String>,
    pub particles: Vec<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            domain_terms: DOMAIN_TERMS.iter().map(|s| s.to_string()).collect(),
            aliases: DOMAIN_ALIASES
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            allowlist: ALLOWLIST.iter().map(|s| s.to_string()).collect(),
            blocklist: BLOCKLIST.iter().map(|s| s.to_string()).collect(),
            interrogatives: INTERROGATIVES.iter().map(|s| s.to_string()).collect(),
            particles: PARTICLES.iter().map(|s| s.to_string()).collect(),
        }
        .normalized()
    }
}

impl Lexicon {
    /// Built-in vocabulary, or the override file when `[lexicon].file` is
    /// configured.
    pub fn from_config(config: &crate::config::LexiconConfig) -> Result<Self> {
        match &config.file {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load vocabulary overrides from a TOML file. Omitted tables keep the
    /// built-in lists.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lexicon file: {}", path.display()))?;
        let lexicon: Lexicon =
            toml::from_str(&raw).with_context(|| "Failed to parse lexicon file")?;
        Ok(lexicon.normalized())
    }

    /// Particles must be tried longest-first or "에서" would never strip
    /// (the shorter "에" matches its tail).
    fn normalized(mut self) -> Self {
        self.particles
            .sort_by_key(|p| std::cmp::Reverse(p.chars().count()));
        self
    }

    /// Strip one trailing particle, keeping at least two characters of
    /// stem. Tokens that would shrink below that come back unchanged.
    pub fn strip_particle<'a>(&self, token: &'a str) -> &'a str {
        for particle in &self.particles {
            if let Some(stem) = token.strip_suffix(particle.as_str()) {
                if stem.chars().count() >= 2 {
                    return stem;
                }
            }
        }
        token
    }

    /// Domain terms present verbatim in the query, with aliases expanded.
    /// ASCII is matched case-insensitively; Korean has no case to fold.
    pub fn matched_domain_terms(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let mut matched: Vec<String> = self
            .domain_terms
            .iter()
            .filter(|term| lowered.contains(&term.to_lowercase()))
            .cloned()
            .collect();

        for (colloquial, canonical) in &self.aliases {
            if matched.iter().any(|t| t == colloquial) && !matched.iter().any(|t| t == canonical)
            {
                matched.push(canonical.clone());
            }
        }

        matched
    }

    /// Extract content keywords from a raw query for boost scoring.
    ///
    /// - Korean tokens: particle-stripped, kept when the stem is ≥ 2 chars.
    /// - ASCII alphabetic tokens: kept when ≥ 3 chars, lowercased.
    /// - Alphanumeric tokens containing a digit: kept when ≥ 2 chars.
    ///
    /// Duplicates are dropped, first occurrence wins.
    pub fn query_keywords(&self, query: &str) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();

        for token in query.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }

            let keyword = if token.chars().any(is_hangul) {
                let stem = self.strip_particle(token);
                if stem.chars().count() < 2 {
                    continue;
                }
                stem.to_string()
            } else if token.chars().all(|c| c.is_ascii_alphabetic()) {
                if token.len() < 3 {
                    continue;
                }
                token.to_lowercase()
            } else if token.chars().all(|c| c.is_ascii_alphanumeric())
                && token.chars().any(|c| c.is_ascii_digit())
            {
                if token.len() < 2 {
                    continue;
                }
                token.to_lowercase()
            } else {
                continue;
            };

            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }

        keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_domain_terms_matched_verbatim() {
        let lexicon = Lexicon::default();
        let terms = lexicon.matched_domain_terms("호작도에 대해 알려줘");
        assert!(terms.contains(&"호작도".to_string()));
        // "호" is a substring of "호작도", so it matches too
        assert!(terms.contains(&"호".to_string()));
    }

    #[test]
    fn test_no_domain_terms_no_matches() {
        let lexicon = Lexicon::default();
        assert!(lexicon
            .matched_domain_terms("What's the weather today?")
            .is_empty());
    }

    #[test]
    fn test_colloquial_alias_adds_canonical_term() {
        let lexicon = Lexicon::default();
        let terms = lexicon.matched_domain_terms("호호도가 뭐야?");
        assert!(terms.contains(&"호호도".to_string()));
        assert!(terms.contains(&"호작도".to_string()));
    }

    #[test]
    fn test_strip_particle_subject_marker() {
        let lexicon = Lexicon::default();
        assert_eq!(lexicon.strip_particle("호랑이가"), "호랑이");
        assert_eq!(lexicon.strip_particle("까치는"), "까치");
        assert_eq!(lexicon.strip_particle("박물관에서"), "박물관");
    }

    #[test]
    fn test_strip_particle_keeps_short_stems_intact() {
        // Stripping would leave a single char, so the token stays whole.
        let lexicon = Lexicon::default();
        assert_eq!(lexicon.strip_particle("범이"), "범이");
        assert_eq!(lexicon.strip_particle("곰은"), "곰은");
    }

    #[test]
    fn test_query_keywords_korean() {
        let lexicon = Lexicon::default();
        let keywords = lexicon.query_keywords("호랑이가 조선시대에 어떤 의미였어?");
        assert!(keywords.contains(&"호랑이".to_string()));
        assert!(keywords.contains(&"조선시대".to_string()));
    }

    #[test]
    fn test_query_keywords_english_length_filter() {
        let lexicon = Lexicon::default();
        let keywords = lexicon.query_keywords("What is a tiger painting?");
        assert!(keywords.contains(&"what".to_string()));
        assert!(keywords.contains(&"tiger".to_string()));
        assert!(keywords.contains(&"painting".to_string()));
        // "is" and "a" are below the 3-char floor
        assert!(!keywords.contains(&"is".to_string()));
        assert!(!keywords.contains(&"a".to_string()));
    }

    #[test]
    fn test_query_keywords_alphanumeric_with_digit() {
        let lexicon = Lexicon::default();
        let keywords = lexicon.query_keywords("Is gallery B2 open?");
        assert!(keywords.contains(&"b2".to_string()));
    }

    #[test]
    fn test_query_keywords_deduplicated() {
        let lexicon = Lexicon::default();
        let keywords = lexicon.query_keywords("tiger tiger tiger");
        assert_eq!(keywords, vec!["tiger".to_string()]);
    }

    #[test]
    fn test_lexicon_file_overrides_one_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "blocklist = [\"politics\"]").unwrap();
        let lexicon = Lexicon::from_file(file.path()).unwrap();
        assert_eq!(lexicon.blocklist, vec!["politics".to_string()]);
        // Untouched tables keep the built-ins
        assert!(lexicon.domain_terms.contains(&"호작도".to_string()));
    }
}
