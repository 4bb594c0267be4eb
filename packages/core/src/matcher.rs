//! Candidate scoring against a [`TermIndex`].
//!
//! [`match_field`] turns raw index hits into ranked [`Candidate`]s by
//! layering field-aware adjustments on top of the index's lexical
//! similarity: a boost when the field's kind agrees with a term's
//! sub-vocabulary hint, and a penalty when the matched label's length is far
//! out of proportion to the field text (guards against spurious short-token
//! matches). Output is deterministic for a fixed (field, index) pair.

use serde::{Deserialize, Serialize};

use crate::index::{Exactness, TermIndex};
use crate::types::{AnnotatableField, Candidate};

/// Upper bound on raw hits pulled from the index per field. Generous enough
/// that the floor filter, not this cap, decides what survives.
const MAX_HITS: usize = 64;

/// Tuning knobs for candidate scoring.
///
/// The lexical blend itself (token Jaccard vs Jaro-Winkler weights) is
/// pinned inside the index and deliberately not configurable; only the
/// field-aware adjustments live here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum adjusted score a candidate must reach to be emitted.
    pub floor: f64,
    /// Added when the field's kind equals the term's kind hint.
    pub kind_boost: f64,
    /// Length ratio (longer ÷ shorter, over normalized text) above which the
    /// mismatch penalty applies.
    pub max_length_ratio: f64,
    /// Subtracted when the length ratio exceeds `max_length_ratio`.
    pub length_penalty: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            floor: 0.35,
            kind_boost: 0.10,
            max_length_ratio: 3.0,
            length_penalty: 0.15,
        }
    }
}

/// Score vocabulary terms against one field, highest score first.
///
/// Returns an empty vector (not an error) when nothing clears
/// [`MatchConfig::floor`]. Ordering: exact label matches first, then
/// adjusted score descending, then term IRI ascending.
pub fn match_field(
    field: &AnnotatableField,
    index: &TermIndex,
    config: &MatchConfig,
) -> Vec<Candidate> {
    let hits = index.query(&field.text, Some(field.kind), MAX_HITS);
    let field_len = crate::index::normalize(&field.text).join(" ").chars().count();

    let mut scored: Vec<(Exactness, f64, Candidate)> = Vec::new();
    for hit in hits {
        let mut score = hit.similarity;

        if hit.kind_hint == Some(field.kind) {
            score += config.kind_boost;
        }

        let matched_len = hit.matched_text.chars().count();
        if field_len > 0 && matched_len > 0 {
            let (longer, shorter) = if field_len >= matched_len {
                (field_len, matched_len)
            } else {
                (matched_len, field_len)
            };
            if longer as f64 / shorter as f64 > config.max_length_ratio {
                score -= config.length_penalty;
            }
        }

        let score = score.clamp(0.0, 1.0);
        if score < config.floor {
            continue;
        }
        scored.push((
            hit.exactness,
            score,
            Candidate {
                term: hit.term,
                score,
            },
        ));
    }

    scored.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.2.term.iri.cmp(&b.2.term.iri))
    });
    scored.into_iter().map(|(_, _, c)| c).collect()
}

// --- tests -------------------------------------------------------------------
