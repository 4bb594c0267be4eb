//! Read-only similarity index over one or more controlled vocabularies.
//!
//! [`TermIndex::load`] validates and indexes a set of [`Vocabulary`]
//! snapshots once, eagerly; the index is immutable afterwards, so concurrent
//! [`TermIndex::query`] calls need no locking. Queries are pure and
//! idempotent: identical inputs always yield identical output.
//!
//! # Scoring
//!
//! Labels and synonyms are normalized (case-folded, punctuation stripped,
//! stop words removed, whitespace tokenized) and the raw similarity between
//! a query and a term is pinned as:
//!
//! - `1.0` when the normalized strings are equal, with exact label matches
//!   ranked above exact synonym matches;
//! - otherwise `0.6 × token-set Jaccard + 0.4 × Jaro-Winkler`, taking the
//!   maximum across the preferred label and every synonym.
//!
//! The blend weights are fixed, not configurable — reproducibility of match
//! output across runs takes precedence over tunability here.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{FieldKind, Term, TermRef, Vocabulary};

const TOKEN_WEIGHT: f64 = 0.6;
const EDIT_WEIGHT: f64 = 0.4;

/// Words dropped during normalization.
const STOP_WORDS: [&str; 10] = ["a", "an", "and", "for", "in", "of", "on", "the", "to", "with"];

static PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]+").expect("invalid punctuation regex"));

/// Errors returned when [`TermIndex::load`] rejects a vocabulary.
///
/// Construction is all-or-nothing: on error no partial index is produced.
#[derive(Debug, Error, PartialEq)]
pub enum LoadError {
    #[error("vocabulary id must not be empty")]
    EmptyVocabularyId,

    #[error("vocabulary {vocabulary:?} contains duplicate term identifier {iri:?}")]
    DuplicateTerm { vocabulary: String, iri: String },

    #[error("vocabulary {vocabulary:?} contains a term with an empty identifier")]
    EmptyTermIri { vocabulary: String },

    #[error("term {iri:?} in vocabulary {vocabulary:?} has an empty label")]
    EmptyTermLabel { vocabulary: String, iri: String },
}

/// How a query matched a term. Variant order is ranking order: exact label
/// matches always sort above exact synonym matches, which sort above
/// partial matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Exactness {
    /// The normalized query equals the normalized preferred label.
    Label,
    /// The normalized query equals a normalized synonym.
    Synonym,
    /// Token or edit-distance overlap only.
    Partial,
}

/// One ranked result from [`TermIndex::query`].
#[derive(Debug, Clone)]
pub struct QueryHit {
    /// The matched term, with vocabulary provenance.
    pub term: TermRef,
    /// The matched term's sub-vocabulary hint, if any.
    pub kind_hint: Option<FieldKind>,
    /// Raw lexical similarity in `[0.0, 1.0]`.
    pub similarity: f64,
    /// Whether the match was exact (label or synonym) or partial.
    pub exactness: Exactness,
    /// The normalized label or synonym that produced `similarity`. Callers
    /// comparing lengths (e.g. for mismatch penalties) should use this, not
    /// the preferred label — a short synonym may be what actually matched.
    pub matched_text: String,
}

struct IndexedTerm {
    term: Term,
    vocabulary: String,
    version: String,
    norm_label: String,
    label_tokens: Vec<String>,
    norm_synonyms: Vec<String>,
    synonym_tokens: Vec<Vec<String>>,
}

impl IndexedTerm {
    fn term_ref(&self) -> TermRef {
        TermRef {
            iri: self.term.iri.clone(),
            label: self.term.label.clone(),
            vocabulary: self.vocabulary.clone(),
            version: self.version.clone(),
        }
    }
}

/// An immutable, queryable index over one or more vocabularies.
///
/// Build it once with [`TermIndex::load`], then share it freely — every
/// query method takes `&self` and mutates nothing.
pub struct TermIndex {
    entries: Vec<IndexedTerm>,
    /// Normalized label/synonym → entry indices, for exact lookup.
    exact: HashMap<String, Vec<usize>>,
    /// Normalized token → entry indices, for approximate candidate selection.
    postings: HashMap<String, Vec<usize>>,
    /// Term IRI → entry index. First occurrence wins when the same IRI
    /// appears in two different vocabularies.
    by_iri: HashMap<String, usize>,
    /// (id, version) of every loaded vocabulary, in load order.
    vocabularies: Vec<(String, String)>,
}

impl TermIndex {
    /// Build an index over the given vocabularies.
    ///
    /// Fails with [`LoadError`] on an empty vocabulary id, a term with an
    /// empty identifier or label, or a duplicate identifier within one
    /// vocabulary. Broader-term links pointing outside every loaded
    /// vocabulary are tolerated (they are weak references) and logged.
    pub fn load(vocabularies: Vec<Vocabulary>) -> Result<Self, LoadError> {
        let mut index = TermIndex {
            entries: Vec::new(),
            exact: HashMap::new(),
            postings: HashMap::new(),
            by_iri: HashMap::new(),
            vocabularies: Vec::new(),
        };

        for vocab in vocabularies {
            if vocab.id.is_empty() {
                return Err(LoadError::EmptyVocabularyId);
            }
            let mut seen: HashSet<&str> = HashSet::new();
            for term in &vocab.terms {
                if term.iri.is_empty() {
                    return Err(LoadError::EmptyTermIri {
                        vocabulary: vocab.id.clone(),
                    });
                }
                if term.label.is_empty() {
                    return Err(LoadError::EmptyTermLabel {
                        vocabulary: vocab.id.clone(),
                        iri: term.iri.clone(),
                    });
                }
                if !seen.insert(&term.iri) {
                    return Err(LoadError::DuplicateTerm {
                        vocabulary: vocab.id.clone(),
                        iri: term.iri.clone(),
                    });
                }
            }
            index.vocabularies.push((vocab.id.clone(), vocab.version.clone()));
            for term in vocab.terms {
                index.add_entry(term, &vocab.id, &vocab.version);
            }
        }

        for entry in &index.entries {
            if let Some(broader) = &entry.term.broader {
                if !index.by_iri.contains_key(broader) {
                    warn!(
                        term = %entry.term.iri,
                        broader = %broader,
                        "broader term not present in any loaded vocabulary"
                    );
                }
            }
        }

        debug!(
            vocabularies = index.vocabularies.len(),
            terms = index.entries.len(),
            tokens = index.postings.len(),
            "term index loaded"
        );

        Ok(index)
    }

    fn add_entry(&mut self, term: Term, vocabulary: &str, version: &str) {
        let label_tokens = normalize(&term.label);
        let norm_label = label_tokens.join(" ");
        let synonym_tokens: Vec<Vec<String>> =
            term.synonyms.iter().map(|s| normalize(s)).collect();
        let norm_synonyms: Vec<String> =
            synonym_tokens.iter().map(|t| t.join(" ")).collect();

        let idx = self.entries.len();
        if !norm_label.is_empty() {
            self.exact.entry(norm_label.clone()).or_default().push(idx);
        }
        for syn in &norm_synonyms {
            if !syn.is_empty() {
                self.exact.entry(syn.clone()).or_default().push(idx);
            }
        }
        for token in label_tokens.iter().chain(synonym_tokens.iter().flatten()) {
            let ids = self.postings.entry(token.clone()).or_default();
            if ids.last() != Some(&idx) {
                ids.push(idx);
            }
        }
        self.by_iri.entry(term.iri.clone()).or_insert(idx);

        self.entries.push(IndexedTerm {
            term,
            vocabulary: vocabulary.to_string(),
            version: version.to_string(),
            norm_label,
            label_tokens,
            norm_synonyms,
            synonym_tokens,
        });
    }

    /// Return up to `limit` terms similar to `text`, most similar first.
    ///
    /// When `kind` is given, terms hinted to a *different* kind are excluded;
    /// unhinted terms always participate. Ordering is exactness, then
    /// similarity descending, then term IRI ascending — ties never depend on
    /// hash or insertion order, so output is reproducible.
    ///
    /// Text that normalizes to nothing (empty, punctuation-only, or all stop
    /// words) yields an empty result, not an error.
    pub fn query(&self, text: &str, kind: Option<FieldKind>, limit: usize) -> Vec<QueryHit> {
        let query_tokens = normalize(text);
        if query_tokens.is_empty() {
            return Vec::new();
        }
        let query_norm = query_tokens.join(" ");

        // Candidate pool: exact hits plus every term sharing at least one
        // token. BTreeSet keeps the scan order deterministic.
        let mut pool: BTreeSet<usize> = BTreeSet::new();
        if let Some(ids) = self.exact.get(&query_norm) {
            pool.extend(ids.iter().copied());
        }
        for token in &query_tokens {
            if let Some(ids) = self.postings.get(token) {
                pool.extend(ids.iter().copied());
            }
        }

        let mut hits: Vec<QueryHit> = Vec::new();
        for idx in pool {
            let entry = &self.entries[idx];
            if let (Some(query_kind), Some(hint)) = (kind, entry.term.kind_hint) {
                if hint != query_kind {
                    continue;
                }
            }
            if let Some(hit) = score_entry(entry, &query_norm, &query_tokens) {
                hits.push(hit);
            }
        }

        hits.sort_by(|a, b| {
            a.exactness
                .cmp(&b.exactness)
                .then_with(|| {
                    b.similarity
                        .partial_cmp(&a.similarity)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.term.iri.cmp(&b.term.iri))
        });
        hits.truncate(limit);
        hits
    }

    /// Retrieve a term by IRI.
    pub fn get(&self, iri: &str) -> Option<&Term> {
        self.by_iri.get(iri).map(|&idx| &self.entries[idx].term)
    }

    /// Retrieve a provenance handle for a term by IRI.
    pub fn term_ref(&self, iri: &str) -> Option<TermRef> {
        self.by_iri.get(iri).map(|&idx| self.entries[idx].term_ref())
    }

    /// Resolve a term's broader-term link through the index.
    ///
    /// Returns `None` if the term is unknown, has no broader link, or the
    /// link points outside every loaded vocabulary.
    pub fn broader(&self, iri: &str) -> Option<&Term> {
        let term = self.get(iri)?;
        self.get(term.broader.as_deref()?)
    }

    /// Total number of indexed terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(id, version)` of every loaded vocabulary, in load order.
    pub fn vocabularies(&self) -> &[(String, String)] {
        &self.vocabularies
    }
}

// --- helpers -----------------------------------------------------------------

fn score_entry(entry: &IndexedTerm, query_norm: &str, query_tokens: &[String]) -> Option<QueryHit> {
    if query_norm == entry.norm_label {
        return Some(QueryHit {
            term: entry.term_ref(),
            kind_hint: entry.term.kind_hint,
            similarity: 1.0,
            exactness: Exactness::Label,
            matched_text: entry.norm_label.clone(),
        });
    }
    if let Some(syn) = entry.norm_synonyms.iter().find(|s| s.as_str() == query_norm) {
        return Some(QueryHit {
            term: entry.term_ref(),
            kind_hint: entry.term.kind_hint,
            similarity: 1.0,
            exactness: Exactness::Synonym,
            matched_text: syn.clone(),
        });
    }

    // Partial match: best blend across label and synonyms. Strict greater-than
    // keeps the label preferred over an equally scoring synonym.
    let mut best = blend(query_norm, query_tokens, &entry.norm_label, &entry.label_tokens);
    let mut matched = &entry.norm_label;
    for (syn, tokens) in entry.norm_synonyms.iter().zip(&entry.synonym_tokens) {
        let s = blend(query_norm, query_tokens, syn, tokens);
        if s > best {
            best = s;
            matched = syn;
        }
    }
    if best <= 0.0 {
        return None;
    }
    Some(QueryHit {
        term: entry.term_ref(),
        kind_hint: entry.term.kind_hint,
        similarity: best,
        exactness: Exactness::Partial,
        matched_text: matched.clone(),
    })
}

fn blend(query_norm: &str, query_tokens: &[String], cand_norm: &str, cand_tokens: &[String]) -> f64 {
    if cand_norm.is_empty() {
        return 0.0;
    }
    TOKEN_WEIGHT * jaccard(query_tokens, cand_tokens)
        + EDIT_WEIGHT * strsim::jaro_winkler(query_norm, cand_norm)
}

fn jaccard(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Case-fold, strip punctuation, drop stop words, split on whitespace.
pub(crate) fn normalize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = PUNCT_RE.replace_all(&lowered, " ");
    cleaned
        .split_whitespace()
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Term;

    fn units_vocab() -> Vocabulary {
        Vocabulary::new(
            "units",
            "1.0",
            vec![
                Term::new("u:cm", "centimeter")
                    .with_synonyms(["cm"])
                    .with_kind_hint(FieldKind::Unit),
                Term::new("u:m", "meter")
                    .with_synonyms(["m"])
                    .with_kind_hint(FieldKind::Unit),
            ],
        )
    }

    fn concepts_vocab() -> Vocabulary {
        Vocabulary::new(
            "eco",
            "2024-01",
            vec![
                Term::new("e:temp", "water temperature").with_broader("e:water"),
                Term::new("e:water", "water"),
                Term::new("e:site", "site"),
                Term::new("e:site-id", "site id"),
            ],
        )
    }

    #[test]
    fn normalize_strips_punctuation_and_stop_words() {
        assert_eq!(
            normalize("Depth of the Water-Column (m)"),
            vec!["depth", "water", "column", "m"]
        );
        assert!(normalize("of the").is_empty());
        assert!(normalize("!!!").is_empty());
    }

    #[test]
    fn duplicate_term_rejected() {
        let vocab = Vocabulary::new(
            "v",
            "1",
            vec![Term::new("v:a", "alpha"), Term::new("v:a", "alef")],
        );
        assert_eq!(
            TermIndex::load(vec![vocab]).err(),
            Some(LoadError::DuplicateTerm {
                vocabulary: "v".into(),
                iri: "v:a".into()
            })
        );
    }

    #[test]
    fn same_iri_in_two_vocabularies_allowed() {
        let a = Vocabulary::new("a", "1", vec![Term::new("x:t", "tree")]);
        let b = Vocabulary::new("b", "1", vec![Term::new("x:t", "tree")]);
        let index = TermIndex::load(vec![a, b]).unwrap();
        assert_eq!(index.len(), 2);
        // First occurrence wins for direct lookup.
        assert_eq!(index.term_ref("x:t").unwrap().vocabulary, "a");
    }

    #[test]
    fn empty_label_rejected() {
        let vocab = Vocabulary::new("v", "1", vec![Term::new("v:a", "")]);
        assert!(matches!(
            TermIndex::load(vec![vocab]),
            Err(LoadError::EmptyTermLabel { .. })
        ));
    }

    #[test]
    fn exact_label_ranks_first() {
        let index = TermIndex::load(vec![concepts_vocab()]).unwrap();
        let hits = index.query("water", None, 10);
        assert_eq!(hits[0].term.iri, "e:water");
        assert_eq!(hits[0].exactness, Exactness::Label);
        assert_eq!(hits[0].similarity, 1.0);
    }

    #[test]
    fn exact_synonym_scores_full_but_ranks_below_label() {
        let vocab = Vocabulary::new(
            "v",
            "1",
            vec![
                // "z:syn" sorts after "a:label" by IRI, so only the exactness
                // rank can put the label match first.
                Term::new("z:syn", "other").with_synonyms(["water"]),
                Term::new("a:label", "water"),
            ],
        );
        let index = TermIndex::load(vec![vocab]).unwrap();
        let hits = index.query("water", None, 10);
        assert_eq!(hits[0].term.iri, "a:label");
        assert_eq!(hits[1].term.iri, "z:syn");
        assert_eq!(hits[1].similarity, 1.0);
        assert_eq!(hits[1].exactness, Exactness::Synonym);
    }

    #[test]
    fn ties_broken_by_iri_ascending() {
        let vocab = Vocabulary::new(
            "v",
            "1",
            vec![Term::new("v:b", "shrub layer"), Term::new("v:a", "shrub layer")],
        );
        let index = TermIndex::load(vec![vocab]).unwrap();
        let hits = index.query("shrub layer", None, 10);
        assert_eq!(hits[0].term.iri, "v:a");
        assert_eq!(hits[1].term.iri, "v:b");
    }

    #[test]
    fn query_is_idempotent() {
        let index = TermIndex::load(vec![concepts_vocab()]).unwrap();
        let first: Vec<String> = index
            .query("site", None, 10)
            .into_iter()
            .map(|h| h.term.iri)
            .collect();
        for _ in 0..3 {
            let again: Vec<String> = index
                .query("site", None, 10)
                .into_iter()
                .map(|h| h.term.iri)
                .collect();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn kind_filter_excludes_differently_hinted_terms() {
        let index = TermIndex::load(vec![units_vocab(), concepts_vocab()]).unwrap();
        // "m" is a unit synonym; a keyword query must not see unit-hinted terms.
        let hits = index.query("m", Some(FieldKind::Keyword), 10);
        assert!(hits.iter().all(|h| h.kind_hint.is_none()));
        let hits = index.query("m", Some(FieldKind::Unit), 10);
        assert_eq!(hits[0].term.iri, "u:m");
    }

    #[test]
    fn unhinted_terms_match_any_kind() {
        let index = TermIndex::load(vec![concepts_vocab()]).unwrap();
        let hits = index.query("water temperature", Some(FieldKind::AttributeName), 10);
        assert_eq!(hits[0].term.iri, "e:temp");
    }

    #[test]
    fn matched_text_is_the_synonym_that_matched() {
        let index = TermIndex::load(vec![units_vocab()]).unwrap();
        let hits = index.query("cm", Some(FieldKind::Unit), 10);
        assert_eq!(hits[0].matched_text, "cm");
    }

    #[test]
    fn no_shared_tokens_means_no_hits() {
        let index = TermIndex::load(vec![concepts_vocab()]).unwrap();
        assert!(index.query("flurblewidget", None, 10).is_empty());
    }

    #[test]
    fn empty_query_text_yields_nothing() {
        let index = TermIndex::load(vec![concepts_vocab()]).unwrap();
        assert!(index.query("", None, 10).is_empty());
        assert!(index.query("of the", None, 10).is_empty());
    }

    #[test]
    fn broader_resolved_through_index() {
        let index = TermIndex::load(vec![concepts_vocab()]).unwrap();
        assert_eq!(index.broader("e:temp").map(|t| t.iri.as_str()), Some("e:water"));
        assert!(index.broader("e:water").is_none());
    }

    #[test]
    fn unknown_broader_tolerated() {
        let vocab = Vocabulary::new(
            "v",
            "1",
            vec![Term::new("v:leaf", "leaf").with_broader("elsewhere:plant")],
        );
        let index = TermIndex::load(vec![vocab]).unwrap();
        assert!(index.broader("v:leaf").is_none());
    }

    #[test]
    fn limit_respected() {
        let index = TermIndex::load(vec![concepts_vocab()]).unwrap();
        assert!(index.query("site", None, 1).len() <= 1);
    }
}
