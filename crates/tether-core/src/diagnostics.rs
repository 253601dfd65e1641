//! Per-run diagnostic log.
//!
//! Per-record problems are recovered locally: the offending record is skipped
//! or partially evaluated and a [`Diagnostic`] is appended to the run's
//! [`DiagnosticLog`]. No per-record problem crosses the public boundary as an
//! error; the log travels with the final report.

use crate::restraints::RestraintKey;
use serde::{Deserialize, Serialize};
use strum::Display;

/// The kinds of recoverable problems a validation run can encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Coordinate or restraint source missing or empty. Fatal to the run.
    InputUnavailable,
    /// A restraint record with no bounds and no target. Record skipped.
    UninterpretableRestraint,
    /// An atom reference that resolves in no model of the ensemble.
    UnresolvedAtomReference,
    /// An exact 0 Å distance between distinct atom keys. Pair retained.
    ZeroDistanceAnomaly,
    /// Clockwise and anticlockwise target votes tied. Record skipped.
    AmbiguousDihedralTarget,
    /// A subtype could not be evaluated at all (e.g. no RDC tensor).
    SubtypeUnavailable,
}

/// One recovered problem, tied to a restraint where one is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restraint: Option<RestraintKey>,
}

/// Append-only diagnostic accumulator for a single run.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.record(kind, message, None)
    }

    pub fn push_for(
        &mut self,
        kind: DiagnosticKind,
        key: RestraintKey,
        message: impl Into<String>,
    ) {
        self.record(kind, message, Some(key))
    }

    fn record(&mut self, kind: DiagnosticKind, message: impl Into<String>, key: Option<RestraintKey>) {
        let message = message.into();
        log::warn!("{kind}: {message}");
        self.entries.push(Diagnostic {
            kind,
            message,
            restraint: key,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
