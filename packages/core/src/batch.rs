//! Batch alignment over many packages.
//!
//! Packages are independent: one package's build failure is collected, not
//! propagated, and the rest of the batch proceeds. Cancellation is
//! cooperative and checked between package boundaries only — results already
//! produced are retained, never rolled back.
//!
//! The loop itself is sequential; everything it calls is read-only against
//! the shared index and pure per package, so callers needing parallelism can
//! partition the package slice across threads and merge the outcomes.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::annotator::{Annotator, PackageOutcome};
use crate::graph::{self, BuildError, GraphFragment};
use crate::index::TermIndex;
use crate::types::DataPackage;

/// A package that made it all the way through annotation and assembly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageResult {
    /// Annotations and unresolved fields for the package.
    pub outcome: PackageOutcome,
    /// The assembled graph fragment.
    pub fragment: GraphFragment,
}

/// A package whose fragment could not be built. The rest of the batch is
/// unaffected.
#[derive(Debug)]
pub struct PackageFailure {
    pub package_id: String,
    pub error: BuildError,
}

/// Everything a batch run produced, including partial results when the run
/// was cancelled part-way.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully processed packages, in input order.
    pub results: Vec<PackageResult>,
    /// Packages that failed during fragment assembly.
    pub failures: Vec<PackageFailure>,
    /// Whether the run stopped early at a cancellation request.
    pub cancelled: bool,
}

/// Annotate and assemble every package against a shared index.
///
/// `cancel` is checked before each package; setting it stops the run at the
/// next package boundary with everything produced so far intact.
pub fn run_batch(
    packages: &[DataPackage],
    index: &TermIndex,
    annotator: &Annotator,
    cancel: &AtomicBool,
) -> BatchOutcome {
    let mut batch = BatchOutcome::default();

    for package in packages {
        if cancel.load(Ordering::Relaxed) {
            debug!(
                processed = batch.results.len(),
                remaining = packages.len() - batch.results.len() - batch.failures.len(),
                "batch cancelled"
            );
            batch.cancelled = true;
            break;
        }

        let outcome = annotator.annotate(package, index);
        match graph::build(package, &outcome.annotations) {
            Ok(fragment) => {
                debug!(
                    package = %package.id,
                    annotated = outcome.annotations.len(),
                    unresolved = outcome.unresolved.len(),
                    statements = fragment.len(),
                    "package processed"
                );
                batch.results.push(PackageResult { outcome, fragment });
            }
            Err(error) => {
                warn!(package = %package.id, %error, "package failed, continuing batch");
                batch.failures.push(PackageFailure {
                    package_id: package.id.clone(),
                    error,
                });
            }
        }
    }

    batch
}

// --- tests -------------------------------------------------------------------
