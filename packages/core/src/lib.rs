//! Vocabulary alignment core for ecological data packages.
//!
//! This crate maps free-text metadata fields (attribute names, units,
//! keywords) onto controlled-vocabulary terms with confidence scores, then
//! assembles the accepted bindings into a knowledge-graph fragment with
//! provenance. It is the pure-logic foundation: metadata parsing, vocabulary
//! fetching, RDF serialization, and storage all live with external
//! collaborators that consume the types defined here.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Core records: [`DataPackage`], [`Vocabulary`], [`Term`], [`Annotation`], [`UnresolvedField`] |
//! | [`index`] | Immutable similarity index over vocabularies via [`TermIndex`] |
//! | [`matcher`] | Candidate scoring via [`match_field`] and [`MatchConfig`] |
//! | [`annotator`] | Acceptance policy via [`Annotator`] and [`Policy`] |
//! | [`graph`] | Fragment assembly via [`build`], with dedup and provenance |
//! | [`batch`] | Many-package runs with failure isolation and cancellation |
//! | [`render`] | Plain-text reports for curators |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use vocalign::{
//!     AnnotatableField, Annotator, DataPackage, FieldKind, Term, TermIndex, Vocabulary,
//! };
//!
//! let index = TermIndex::load(vec![Vocabulary::new(
//!     "units",
//!     "1.0",
//!     vec![Term::new("u:cm", "centimeter").with_synonyms(["cm"])],
//! )])?;
//!
//! let package = DataPackage::new(
//!     "edi.1.1",
//!     vec![AnnotatableField::new("f1", "cm", FieldKind::Unit)],
//! );
//!
//! let annotator = Annotator::default();
//! let outcome = annotator.annotate(&package, &index);
//! let fragment = vocalign::build(&package, &outcome.annotations)?;
//! ```
//!
//! The index is built once and read-only afterwards, so it can be shared
//! across threads without locking; annotation and assembly are pure per
//! call.

pub mod annotator;
pub mod batch;
pub mod graph;
pub mod index;
pub mod matcher;
pub mod render;
pub mod types;

pub use annotator::{Annotator, PackageOutcome, Policy, ResolveError};
pub use batch::{run_batch, BatchOutcome, PackageFailure, PackageResult};
pub use graph::{build, BuildError, GraphFragment, Object, Statement};
pub use index::{LoadError, QueryHit, TermIndex};
pub use matcher::{match_field, MatchConfig};
pub use render::{render_fragment, render_outcome};
pub use types::{
    AnnotatableField, Annotation, Candidate, DataPackage, Decision, FieldKind, Term, TermRef,
    UnresolvedField, UnresolvedReason, Vocabulary,
};
