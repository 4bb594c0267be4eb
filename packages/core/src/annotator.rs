//! Acceptance policy over matcher output.
//!
//! [`Annotator::annotate`] walks every field of a package through a small
//! state machine: `Pending → Accepted | Deferred(Ambiguous) |
//! Deferred(NoCandidate)`. Deferred is terminal at this layer — leaving it
//! takes a widened policy or a human decision in a later run, via
//! [`Annotator::resolve`] or [`Annotation::manual`].
//!
//! The annotator is pure with respect to its inputs: no shared state, no
//! side effects beyond the returned outcome, so re-runs over the same
//! (package, index, policy) are deterministic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::TermIndex;
use crate::matcher::{match_field, MatchConfig};
use crate::types::{
    Annotation, DataPackage, Decision, UnresolvedField, UnresolvedReason,
};

/// Acceptance thresholds for turning candidates into annotations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Policy {
    /// Score at or above which the top candidate may be accepted without
    /// human review.
    pub auto_accept_threshold: f64,
    /// Minimum score gap between the top two candidates; anything closer is
    /// routed to manual resolution as ambiguous.
    pub disambiguation_window: f64,
    /// Cap on how many matcher candidates are inspected (and carried by an
    /// ambiguous field).
    pub max_candidates_considered: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            auto_accept_threshold: 0.90,
            disambiguation_window: 0.05,
            max_candidates_considered: 5,
        }
    }
}

/// Errors returned when a deferred field cannot be resolved as requested.
#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("field {field_id:?} was deferred with no candidates; use a manual override instead")]
    NoCandidates { field_id: String },

    #[error("term {iri:?} is not among the candidates carried by field {field_id:?}")]
    UnknownCandidate { field_id: String, iri: String },
}

/// Everything the annotator produced for one package. Every field of the
/// package lands in exactly one of the two sequences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageOutcome {
    /// Identifier of the annotated package.
    pub package_id: String,
    /// Accepted field-to-term bindings.
    pub annotations: Vec<Annotation>,
    /// Fields deferred for external resolution.
    pub unresolved: Vec<UnresolvedField>,
}

// Per-field decision, matched exhaustively below.
enum FieldOutcome {
    Accepted(Annotation),
    Deferred(UnresolvedField),
}

/// Applies a [`Policy`] to matcher output, field by field.
#[derive(Debug, Clone, Default)]
pub struct Annotator {
    pub match_config: MatchConfig,
    pub policy: Policy,
}

impl Annotator {
    pub fn new(match_config: MatchConfig, policy: Policy) -> Self {
        Self {
            match_config,
            policy,
        }
    }

    /// Annotate every field of `package` against `index`.
    ///
    /// Per field: no candidates ⇒ deferred as `NoCandidate`; a top candidate
    /// at or above the threshold with a clear gap to the runner-up ⇒
    /// accepted; anything else ⇒ deferred as `Ambiguous`, carrying the
    /// considered candidates.
    pub fn annotate(&self, package: &DataPackage, index: &TermIndex) -> PackageOutcome {
        let mut annotations = Vec::new();
        let mut unresolved = Vec::new();

        for field in &package.fields {
            match self.decide(field, index) {
                FieldOutcome::Accepted(annotation) => annotations.push(annotation),
                FieldOutcome::Deferred(field) => unresolved.push(field),
            }
        }

        PackageOutcome {
            package_id: package.id.clone(),
            annotations,
            unresolved,
        }
    }

    fn decide(
        &self,
        field: &crate::types::AnnotatableField,
        index: &TermIndex,
    ) -> FieldOutcome {
        let mut candidates = match_field(field, index, &self.match_config);
        candidates.truncate(self.policy.max_candidates_considered);

        let Some(top) = candidates.first() else {
            return FieldOutcome::Deferred(UnresolvedField {
                field_id: field.id.clone(),
                reason: UnresolvedReason::NoCandidate,
                candidates: Vec::new(),
            });
        };

        let clear_gap = match candidates.get(1) {
            Some(second) => top.score - second.score >= self.policy.disambiguation_window,
            None => true,
        };

        if top.score >= self.policy.auto_accept_threshold && clear_gap {
            FieldOutcome::Accepted(Annotation::new(
                field.id.clone(),
                top.term.clone(),
                top.score,
                Decision::AutoAccepted,
            ))
        } else {
            FieldOutcome::Deferred(UnresolvedField {
                field_id: field.id.clone(),
                reason: UnresolvedReason::Ambiguous,
                candidates,
            })
        }
    }

    /// Resolve an ambiguous field by choosing one of its carried candidates.
    ///
    /// The returned annotation records [`Decision::Disambiguated`]. Terms
    /// outside the carried candidate set are rejected; a curator wanting a
    /// term the matcher never proposed should use [`Annotation::manual`].
    pub fn resolve(
        &self,
        unresolved: &UnresolvedField,
        chosen_iri: &str,
    ) -> Result<Annotation, ResolveError> {
        if unresolved.candidates.is_empty() {
            return Err(ResolveError::NoCandidates {
                field_id: unresolved.field_id.clone(),
            });
        }
        let chosen = unresolved
            .candidates
            .iter()
            .find(|c| c.term.iri == chosen_iri)
            .ok_or_else(|| ResolveError::UnknownCandidate {
                field_id: unresolved.field_id.clone(),
                iri: chosen_iri.to_string(),
            })?;
        Ok(Annotation::new(
            unresolved.field_id.clone(),
            chosen.term.clone(),
            chosen.score,
            Decision::Disambiguated,
        ))
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotatableField, FieldKind, Term, Vocabulary};

    fn index() -> TermIndex {
        TermIndex::load(vec![
            Vocabulary::new(
                "units",
                "1.0",
                vec![Term::new("u:cm", "centimeter")
                    .with_synonyms(["cm"])
                    .with_kind_hint(FieldKind::Unit)],
            ),
            Vocabulary::new(
                "eco",
                "2024-01",
                vec![
                    Term::new("e:site-id", "site id"),
                    Term::new("e:site-name", "site name"),
                    Term::new("e:water", "water"),
                ],
            ),
        ])
        .unwrap()
    }

    fn annotator() -> Annotator {
        Annotator::new(
            MatchConfig::default(),
            Policy {
                auto_accept_threshold: 0.8,
                ..Policy::default()
            },
        )
    }

    #[test]
    fn exact_unit_field_auto_accepted() {
        let package = DataPackage::new(
            "edi.1.1",
            vec![AnnotatableField::new("f1", "cm", FieldKind::Unit)],
        );
        let outcome = annotator().annotate(&package, &index());
        assert_eq!(outcome.annotations.len(), 1);
        assert!(outcome.unresolved.is_empty());
        let a = &outcome.annotations[0];
        assert_eq!(a.term.iri, "u:cm");
        assert!(a.score >= 0.8);
        assert_eq!(a.decision, Decision::AutoAccepted);
    }

    #[test]
    fn close_candidates_deferred_as_ambiguous() {
        let package = DataPackage::new(
            "edi.1.1",
            vec![AnnotatableField::new("f1", "site", FieldKind::Keyword)],
        );
        let outcome = annotator().annotate(&package, &index());
        assert!(outcome.annotations.is_empty());
        assert_eq!(outcome.unresolved.len(), 1);
        let u = &outcome.unresolved[0];
        assert_eq!(u.reason, UnresolvedReason::Ambiguous);
        let iris: Vec<&str> = u.candidates.iter().map(|c| c.term.iri.as_str()).collect();
        assert!(iris.contains(&"e:site-id"));
        assert!(iris.contains(&"e:site-name"));
    }

    #[test]
    fn unmatched_field_deferred_as_no_candidate() {
        let package = DataPackage::new(
            "edi.1.1",
            vec![AnnotatableField::new(
                "f1",
                "flurblewidget",
                FieldKind::Keyword,
            )],
        );
        let outcome = annotator().annotate(&package, &index());
        assert!(outcome.annotations.is_empty());
        assert_eq!(outcome.unresolved[0].reason, UnresolvedReason::NoCandidate);
        assert!(outcome.unresolved[0].candidates.is_empty());
    }

    #[test]
    fn every_field_lands_in_exactly_one_output() {
        let package = DataPackage::new(
            "edi.1.1",
            vec![
                AnnotatableField::new("f1", "cm", FieldKind::Unit),
                AnnotatableField::new("f2", "site", FieldKind::Keyword),
                AnnotatableField::new("f3", "flurblewidget", FieldKind::Keyword),
            ],
        );
        let outcome = annotator().annotate(&package, &index());
        assert_eq!(
            outcome.annotations.len() + outcome.unresolved.len(),
            package.fields.len()
        );
    }

    #[test]
    fn raising_threshold_never_accepts_more() {
        let package = DataPackage::new(
            "edi.1.1",
            vec![
                AnnotatableField::new("f1", "cm", FieldKind::Unit),
                AnnotatableField::new("f2", "water", FieldKind::AttributeName),
                AnnotatableField::new("f3", "site", FieldKind::Keyword),
            ],
        );
        let idx = index();
        let mut previous = usize::MAX;
        for threshold in [0.5, 0.8, 0.95, 1.0] {
            let annotator = Annotator::new(
                MatchConfig::default(),
                Policy {
                    auto_accept_threshold: threshold,
                    ..Policy::default()
                },
            );
            let accepted = annotator.annotate(&package, &idx).annotations.len();
            assert!(accepted <= previous);
            previous = accepted;
        }
    }

    #[test]
    fn max_candidates_caps_carried_candidates() {
        let annotator = Annotator::new(
            MatchConfig::default(),
            Policy {
                max_candidates_considered: 1,
                ..Policy::default()
            },
        );
        let package = DataPackage::new(
            "edi.1.1",
            vec![AnnotatableField::new("f1", "site", FieldKind::Keyword)],
        );
        let outcome = annotator.annotate(&package, &index());
        // With only one candidate in view the gap test passes, but the score
        // is still below the threshold, so the field stays ambiguous.
        assert_eq!(outcome.unresolved[0].candidates.len(), 1);
    }

    #[test]
    fn resolve_picks_a_carried_candidate() {
        let package = DataPackage::new(
            "edi.1.1",
            vec![AnnotatableField::new("f1", "site", FieldKind::Keyword)],
        );
        let annotator = annotator();
        let outcome = annotator.annotate(&package, &index());
        let u = &outcome.unresolved[0];
        let annotation = annotator.resolve(u, "e:site-id").unwrap();
        assert_eq!(annotation.decision, Decision::Disambiguated);
        assert_eq!(annotation.term.iri, "e:site-id");
        assert_eq!(annotation.field_id, "f1");
    }

    #[test]
    fn resolve_rejects_terms_outside_the_candidate_set() {
        let package = DataPackage::new(
            "edi.1.1",
            vec![AnnotatableField::new("f1", "site", FieldKind::Keyword)],
        );
        let annotator = annotator();
        let outcome = annotator.annotate(&package, &index());
        let err = annotator.resolve(&outcome.unresolved[0], "u:cm").unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnknownCandidate {
                field_id: "f1".into(),
                iri: "u:cm".into()
            }
        );
    }

    #[test]
    fn manual_override_usable_where_resolve_is_not() {
        let idx = index();
        let term = idx.term_ref("e:water").unwrap();
        let annotation = Annotation::manual("f9", term, 1.0);
        assert_eq!(annotation.decision, Decision::Manual);
        assert_eq!(annotation.term.iri, "e:water");
    }

    #[test]
    fn resolve_rejects_no_candidate_fields() {
        let u = UnresolvedField {
            field_id: "f9".into(),
            reason: UnresolvedReason::NoCandidate,
            candidates: vec![],
        };
        assert_eq!(
            annotator().resolve(&u, "e:water").unwrap_err(),
            ResolveError::NoCandidates { field_id: "f9".into() }
        );
    }
}
