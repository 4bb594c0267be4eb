//! Knowledge-graph fragment assembly from accepted annotations.
//!
//! [`build`] turns a package's annotations into an ordered, deduplicated set
//! of subject–predicate–object [`Statement`]s, each tagged with provenance
//! (the originating annotation, the vocabulary snapshot, the score).
//! Rebuilding from the same inputs yields an identical fragment — statements
//! are deduplicated by (subject, predicate, object), never repeated.
//!
//! Serialising a fragment to a concrete RDF syntax is a collaborator's job;
//! this module only guarantees the statement set and its provenance.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Annotation, DataPackage, Decision};

/// Namespace for the fixed predicates and derived subject URIs.
pub const NS: &str = "https://w3id.org/vocalign/ns#";

/// Fixed predicate IRIs emitted by [`build`].
pub mod predicate {
    /// Binds a field subject to the matched term.
    pub const IS_ANNOTATED_BY: &str = "https://w3id.org/vocalign/ns#isAnnotatedBy";
    /// Binds a field subject to its annotation node.
    pub const HAS_ANNOTATION: &str = "https://w3id.org/vocalign/ns#hasAnnotation";
    /// Annotation node → vocabulary id the term came from.
    pub const USED_VOCABULARY: &str = "https://w3id.org/vocalign/ns#usedVocabulary";
    /// Annotation node → vocabulary version tag.
    pub const VOCABULARY_VERSION: &str = "https://w3id.org/vocalign/ns#vocabularyVersion";
    /// Annotation node → similarity score of the accepted candidate.
    pub const MATCH_SCORE: &str = "https://w3id.org/vocalign/ns#matchScore";
    /// Annotation node → how the decision was made.
    pub const DECIDED_BY: &str = "https://w3id.org/vocalign/ns#decidedBy";
    /// Field subject → the broader element it sits in.
    pub const HAS_CONTEXT: &str = "https://w3id.org/vocalign/ns#hasContext";
    /// Field subject → its raw metadata text.
    pub const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
}

/// Absolute-IRI shape: a scheme followed by a non-empty, whitespace-free body.
static IRI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$").expect("invalid IRI regex"));

/// Errors returned when [`build`] hits an internal consistency violation.
///
/// Fatal to the single call only — a surrounding batch isolates it and
/// continues with other packages.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("annotation {annotation_id:?} references field {field_id:?}, which is not in package {package_id:?}")]
    UnknownField {
        package_id: String,
        annotation_id: String,
        field_id: String,
    },

    #[error("annotation for field {field_id:?} references term {iri:?}, which is not a valid absolute IRI")]
    UnresolvableTerm { field_id: String, iri: String },
}

/// The object position of a statement: a resource or a literal value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "type", content = "value")]
pub enum Object {
    Iri(String),
    Literal(String),
}

/// Where a statement came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    /// Identifier of the originating annotation.
    pub annotation_id: String,
    /// Field the annotation was made on.
    pub field_id: String,
    /// IRI of the matched term.
    pub term_iri: String,
    /// Vocabulary the term came from.
    pub vocabulary: String,
    /// Version tag of that vocabulary snapshot.
    pub version: String,
    /// Score of the accepted candidate.
    pub score: f64,
    /// How the annotation was decided.
    pub decision: Decision,
}

/// One subject–predicate–object statement with provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: Object,
    pub provenance: Provenance,
}

/// An ordered, deduplicated set of statements.
///
/// Insertion order is preserved; a statement whose (subject, predicate,
/// object) triple is already present is skipped, provenance untouched.
/// Independent of the originating [`DataPackage`]'s lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphFragment {
    statements: Vec<Statement>,
}

impl GraphFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a statement unless its (subject, predicate, object) triple is
    /// already present. Returns whether the statement was added.
    pub fn insert(&mut self, statement: Statement) -> bool {
        let duplicate = self.statements.iter().any(|s| {
            s.subject == statement.subject
                && s.predicate == statement.predicate
                && s.object == statement.object
        });
        if duplicate {
            return false;
        }
        self.statements.push(statement);
        true
    }

    /// The statements in insertion order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Deterministic subject URI for a field within a package.
pub fn field_subject_uri(package_id: &str, field_id: &str) -> String {
    format!("https://w3id.org/vocalign/package/{package_id}/field/{field_id}")
}

/// URI of the annotation node carrying provenance statements.
fn annotation_uri(annotation_id: &str) -> String {
    format!("https://w3id.org/vocalign/annotation/{annotation_id}")
}

/// Assemble a graph fragment from a package and its accepted annotations.
///
/// Per annotation: the field's label statement, the `isAnnotatedBy` binding,
/// a link to an annotation node, provenance statements on that node
/// (vocabulary, version, score, decision), and a context statement when the
/// field carries one.
///
/// Fails with [`BuildError`] if an annotation names a field the package does
/// not contain, or a term whose IRI is not absolute. Neither should occur
/// for annotations produced by this crate, but the matcher/index boundary is
/// validated rather than trusted.
pub fn build(package: &DataPackage, annotations: &[Annotation]) -> Result<GraphFragment, BuildError> {
    let mut fragment = GraphFragment::new();

    for annotation in annotations {
        let field = package
            .fields
            .iter()
            .find(|f| f.id == annotation.field_id)
            .ok_or_else(|| BuildError::UnknownField {
                package_id: package.id.clone(),
                annotation_id: annotation.id.clone(),
                field_id: annotation.field_id.clone(),
            })?;
        if !IRI_RE.is_match(&annotation.term.iri) {
            return Err(BuildError::UnresolvableTerm {
                field_id: annotation.field_id.clone(),
                iri: annotation.term.iri.clone(),
            });
        }

        let subject = field_subject_uri(&package.id, &field.id);
        let node = annotation_uri(&annotation.id);
        let provenance = Provenance {
            annotation_id: annotation.id.clone(),
            field_id: field.id.clone(),
            term_iri: annotation.term.iri.clone(),
            vocabulary: annotation.term.vocabulary.clone(),
            version: annotation.term.version.clone(),
            score: annotation.score,
            decision: annotation.decision,
        };

        let mut emit = |subject: &str, predicate: &str, object: Object| {
            fragment.insert(Statement {
                subject: subject.to_string(),
                predicate: predicate.to_string(),
                object,
                provenance: provenance.clone(),
            });
        };

        emit(&subject, predicate::LABEL, Object::Literal(field.text.clone()));
        emit(
            &subject,
            predicate::IS_ANNOTATED_BY,
            Object::Iri(annotation.term.iri.clone()),
        );
        emit(&subject, predicate::HAS_ANNOTATION, Object::Iri(node.clone()));
        emit(
            &node,
            predicate::USED_VOCABULARY,
            Object::Literal(annotation.term.vocabulary.clone()),
        );
        emit(
            &node,
            predicate::VOCABULARY_VERSION,
            Object::Literal(annotation.term.version.clone()),
        );
        emit(
            &node,
            predicate::MATCH_SCORE,
            Object::Literal(format!("{:.4}", annotation.score)),
        );
        emit(
            &node,
            predicate::DECIDED_BY,
            Object::Literal(annotation.decision.to_string()),
        );
        if let Some(context) = &field.context {
            emit(
                &subject,
                predicate::HAS_CONTEXT,
                Object::Literal(context.clone()),
            );
        }
    }

    Ok(fragment)
}

// --- tests -------------------------------------------------------------------
