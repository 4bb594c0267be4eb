//! Core data types for vocabulary alignment.
//!
//! This module defines the records that flow through the alignment pipeline:
//! [`DataPackage`] and [`AnnotatableField`] on the input side, [`Vocabulary`]
//! and [`Term`] on the vocabulary side, and [`Candidate`], [`Annotation`],
//! and [`UnresolvedField`] on the output side. All types serialise to and
//! from JSON so collaborators can hand them across process boundaries.

use serde::{Deserialize, Serialize};

/// The kind of metadata field being annotated. Determines which
/// sub-vocabulary terms are checked preferentially during matching.
///
/// Serialises as a lowercase snake_case string (e.g. `"attribute_name"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// The name of a measured attribute (a column in a data table).
    AttributeName,
    /// A unit of measurement attached to an attribute.
    Unit,
    /// A free-text keyword describing the package as a whole.
    Keyword,
    /// The name of a data entity (table, raster, vector) within the package.
    EntityName,
}

/// Formats the kind as its snake_case wire-format string (e.g. `"unit"`).
impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::AttributeName => write!(f, "attribute_name"),
            FieldKind::Unit => write!(f, "unit"),
            FieldKind::Keyword => write!(f, "keyword"),
            FieldKind::EntityName => write!(f, "entity_name"),
        }
    }
}

/// Parses a [`FieldKind`] from its snake_case wire-format string.
///
/// Returns `Err` with a descriptive message if the string is not recognised.
impl std::str::FromStr for FieldKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attribute_name" => Ok(FieldKind::AttributeName),
            "unit" => Ok(FieldKind::Unit),
            "keyword" => Ok(FieldKind::Keyword),
            "entity_name" => Ok(FieldKind::EntityName),
            _ => Err(format!(
                "unknown field kind {:?}; expected one of: \
                 attribute_name, unit, keyword, entity_name",
                s
            )),
        }
    }
}

/// One annotatable unit of metadata within a [`DataPackage`].
///
/// Produced by an external metadata parser; the core never sees the
/// originating document, only this normalized shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotatableField {
    /// Identifier of the field, unique within its package.
    pub id: String,
    /// The raw text to be aligned against vocabulary terms.
    pub text: String,
    /// What kind of metadata this field holds.
    pub kind: FieldKind,
    /// The broader element the field sits in — the entity name for an
    /// attribute, `"dataset"` for an entity. Carried into the graph as a
    /// context statement when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl AnnotatableField {
    /// Create a field with no context.
    pub fn new(id: impl Into<String>, text: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind,
            context: None,
        }
    }

    /// Attach the broader context this field sits in.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// The ownership root for one dataset's metadata: an identifier plus an
/// ordered sequence of annotatable fields.
///
/// Packages are immutable once handed to the core. A caller wishing to
/// re-annotate builds a fresh package from a fresh metadata parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPackage {
    /// Package identifier (e.g. a repository accession like `edi.1.1`).
    pub id: String,
    /// Fields to annotate, in document order.
    pub fields: Vec<AnnotatableField>,
}

impl DataPackage {
    pub fn new(id: impl Into<String>, fields: Vec<AnnotatableField>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// A concept in a controlled vocabulary.
///
/// The broader-term link is held as an IRI, not an owned reference —
/// hierarchy lookups go through the index by identifier, which keeps is-a
/// graphs free of ownership cycles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Term {
    /// Stable identifier, unique within the owning vocabulary.
    pub iri: String,
    /// Preferred label.
    pub label: String,
    /// Alternate labels and synonyms.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    /// IRI of the broader term, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broader: Option<String>,
    /// Sub-vocabulary hint: when present, this term is only offered to
    /// fields of the same kind, and boosted when the kinds agree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind_hint: Option<FieldKind>,
}

impl Term {
    pub fn new(iri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            label: label.into(),
            synonyms: Vec::new(),
            broader: None,
            kind_hint: None,
        }
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_broader(mut self, broader: impl Into<String>) -> Self {
        self.broader = Some(broader.into());
        self
    }

    pub fn with_kind_hint(mut self, kind: FieldKind) -> Self {
        self.kind_hint = Some(kind);
        self
    }
}

/// A named, versioned collection of [`Term`]s.
///
/// Loaded once at index construction and read-only thereafter. The id and
/// version travel with every match as provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vocabulary {
    /// Vocabulary identifier (e.g. `"lter-cv"`).
    pub id: String,
    /// Version tag of this snapshot.
    pub version: String,
    /// The terms in this vocabulary.
    pub terms: Vec<Term>,
}

impl Vocabulary {
    pub fn new(id: impl Into<String>, version: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            terms,
        }
    }
}

/// A cheap provenance handle to a matched term.
///
/// Candidates and annotations carry this instead of a borrowed [`Term`] so
/// results stay usable after the index they came from is gone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TermRef {
    /// IRI of the matched term.
    pub iri: String,
    /// Preferred label of the matched term.
    pub label: String,
    /// Identifier of the vocabulary the term belongs to.
    pub vocabulary: String,
    /// Version tag of that vocabulary snapshot.
    pub version: String,
}

/// An ephemeral (field, term, score) triple produced by the matcher.
///
/// Scores are in `[0.0, 1.0]`. Candidates are not persisted beyond the
/// annotator's decision step, except when carried inside an
/// [`UnresolvedField`] for external resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    /// The term this candidate proposes.
    pub term: TermRef,
    /// Similarity score in `[0.0, 1.0]`, highest is best.
    pub score: f64,
}

/// How an [`Annotation`] came to be accepted.
///
/// Serialises as a lowercase snake_case string (e.g. `"auto_accepted"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The top candidate cleared the auto-accept threshold with a clear gap.
    AutoAccepted,
    /// A human chose among the candidates carried by an ambiguous field.
    Disambiguated,
    /// A free override: the term was supplied outside the candidate set.
    Manual,
}

/// Formats the decision as its snake_case wire-format string.
impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::AutoAccepted => write!(f, "auto_accepted"),
            Decision::Disambiguated => write!(f, "disambiguated"),
            Decision::Manual => write!(f, "manual"),
        }
    }
}

/// Parses a [`Decision`] from its snake_case wire-format string.
impl std::str::FromStr for Decision {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto_accepted" => Ok(Decision::AutoAccepted),
            "disambiguated" => Ok(Decision::Disambiguated),
            "manual" => Ok(Decision::Manual),
            _ => Err(format!(
                "unknown decision {:?}; expected one of: \
                 auto_accepted, disambiguated, manual",
                s
            )),
        }
    }
}

/// An accepted binding of a metadata field to a vocabulary term.
///
/// Annotations are immutable once created. The `id` is a UUIDv7, so
/// lexicographic order approximates creation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    /// UUIDv7 identifier of this annotation.
    pub id: String,
    /// Identifier of the annotated field.
    pub field_id: String,
    /// The chosen term, with vocabulary provenance.
    pub term: TermRef,
    /// Score of the candidate that was accepted.
    pub score: f64,
    /// How the decision was made.
    pub decision: Decision,
    /// ISO 8601 timestamp of creation, UTC.
    pub created_at: String,
}

impl Annotation {
    /// Create an annotation with auto-generated UUIDv7 `id` and current UTC
    /// `created_at`.
    pub fn new(
        field_id: impl Into<String>,
        term: TermRef,
        score: f64,
        decision: Decision,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            field_id: field_id.into(),
            term,
            score,
            decision,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Record a free override made outside the candidate set.
    pub fn manual(field_id: impl Into<String>, term: TermRef, score: f64) -> Self {
        Self::new(field_id, term, score, Decision::Manual)
    }
}

/// Why a field could not be annotated automatically.
///
/// Serialises as a lowercase snake_case string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No term cleared the matcher's floor score.
    NoCandidate,
    /// The top candidates were too close in score to pick automatically,
    /// or the top candidate fell below the auto-accept threshold.
    Ambiguous,
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::NoCandidate => write!(f, "no_candidate"),
            UnresolvedReason::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

/// A field the annotator deferred rather than guessed on.
///
/// Not an error: this is a first-class outcome handed to a human-in-the-loop
/// or downstream-automation collaborator. Ambiguous fields carry the
/// candidates that were considered so a curator can choose among them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnresolvedField {
    /// Identifier of the deferred field.
    pub field_id: String,
    /// Why the field was deferred.
    pub reason: UnresolvedReason,
    /// The top-k candidates considered, empty for `NoCandidate`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
}

// --- tests -------------------------------------------------------------------
