//! Human-readable text rendering of alignment results.
//!
//! Curators reviewing a package's alignment get a plain-text report:
//! accepted annotations with their scores, then unresolved fields grouped by
//! reason, with the carried candidates listed so an ambiguous field can be
//! resolved at a glance. Output is stable plain text for terminals and logs;
//! it is not a canonical serialization.

use crate::annotator::PackageOutcome;
use crate::graph::{GraphFragment, Object};
use crate::types::UnresolvedReason;

/// Render one package's alignment outcome as indented plain text.
///
/// ```text
/// Alignment report  edi.1.1  2 annotated, 1 unresolved
/// ─────────────────────────────────────────────────────
///
/// ANNOTATED (2)
///   f1  →  u:cm  "centimeter"  score 1.00  (auto_accepted)  [units@1.0]
///   f2  →  e:temp  "water temperature"  score 0.93  (auto_accepted)  [eco@2024-01]
///
/// AMBIGUOUS (1)
///   f3  "site"
///     0.67  e:site-id  "site id"
///     0.66  e:site-name  "site name"
/// ```
pub fn render_outcome(outcome: &PackageOutcome) -> String {
    let header = format!(
        "Alignment report  {}  {} annotated, {} unresolved",
        outcome.package_id,
        outcome.annotations.len(),
        outcome.unresolved.len()
    );
    let rule = "─".repeat(header.chars().count());
    let mut out = format!("{}\n{}\n", header, rule);

    if !outcome.annotations.is_empty() {
        out.push('\n');
        out.push_str(&format!("ANNOTATED ({})\n", outcome.annotations.len()));
        for a in &outcome.annotations {
            out.push_str(&format!(
                "  {}  →  {}  \"{}\"  score {:.2}  ({})  [{}@{}]\n",
                a.field_id, a.term.iri, a.term.label, a.score, a.decision,
                a.term.vocabulary, a.term.version
            ));
        }
    }

    for (reason, label) in [
        (UnresolvedReason::Ambiguous, "AMBIGUOUS"),
        (UnresolvedReason::NoCandidate, "NO CANDIDATE"),
    ] {
        let fields: Vec<_> = outcome
            .unresolved
            .iter()
            .filter(|u| u.reason == reason)
            .collect();
        if fields.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&format!("{} ({})\n", label, fields.len()));
        for u in fields {
            out.push_str(&format!("  {}\n", u.field_id));
            for c in &u.candidates {
                out.push_str(&format!(
                    "    {:.2}  {}  \"{}\"\n",
                    c.score, c.term.iri, c.term.label
                ));
            }
        }
    }

    out
}

/// Render a graph fragment as one line per statement.
///
/// ```text
/// Graph fragment  8 statements
/// ────────────────────────────
/// <.../field/f1>  rdfs:label  "cm"
/// <.../field/f1>  vocalign:isAnnotatedBy  <u:cm>
/// ```
pub fn render_fragment(fragment: &GraphFragment) -> String {
    let total = fragment.len();
    let header = format!(
        "Graph fragment  {} statement{}",
        total,
        if total == 1 { "" } else { "s" }
    );
    let rule = "─".repeat(header.chars().count());
    let mut out = format!("{}\n{}\n", header, rule);

    for s in fragment.statements() {
        let object = match &s.object {
            Object::Iri(iri) => format!("<{}>", iri),
            Object::Literal(value) => format!("\"{}\"", value),
        };
        out.push_str(&format!(
            "<{}>  {}  {}\n",
            s.subject,
            compact_predicate(&s.predicate),
            object
        ));
    }

    out
}

// --- helpers -----------------------------------------------------------------

fn compact_predicate(predicate: &str) -> String {
    if let Some(name) = predicate.strip_prefix(crate::graph::NS) {
        format!("vocalign:{}", name)
    } else if let Some(name) = predicate.strip_prefix("http://www.w3.org/2000/01/rdf-schema#") {
        format!("rdfs:{}", name)
    } else {
        format!("<{}>", predicate)
    }
}

// --- tests -------------------------------------------------------------------
