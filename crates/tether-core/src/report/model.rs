//! The validation report.
//!
//! The key layout of these structures is the stable contract consumed by
//! downstream validation pipelines; serialization to JSON (or into the
//! report cache) is a plain serde pass over them.

use crate::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

/// The three restraint subtypes a run can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum SubtypeKind {
    #[strum(serialize = "distance")]
    Distance,
    #[strum(serialize = "dihedral")]
    Dihedral,
    #[strum(serialize = "rdc")]
    Rdc,
}

/// Distance report buckets nest class -> subclass -> bond flag.
pub type DistanceBuckets<T> = BTreeMap<String, BTreeMap<String, BTreeMap<String, T>>>;

/// Dihedral and RDC buckets key by a single name (angle name, RDC type).
pub type NamedBuckets<T> = BTreeMap<String, T>;

/// Statistics of one residual-error bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualBin {
    /// Human-readable bin label, e.g. "0.1-0.2" or ">0.5".
    pub label: String,
    pub min_error: Option<f64>,
    pub max_error: Option<f64>,
    pub count: usize,
    /// Violations in this bin per model of the ensemble.
    pub per_model_mean: f64,
}

/// One row of the most-violated table: a restraint together with the
/// combination witnessed as best in its violated models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MostViolatedRow {
    pub list_id: i64,
    pub restraint_id: i64,
    pub combination_id: i64,
    pub member_id: i64,
    pub atoms: Vec<String>,
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_flag: Option<String>,
    pub violated_model_count: usize,
    pub violated_models: Vec<usize>,
    pub min_error: f64,
    pub max_error: f64,
    pub mean_error: f64,
    pub stdev_error: f64,
    pub median_error: f64,
}

/// One (restraint, model) violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationRow {
    pub list_id: i64,
    pub restraint_id: i64,
    pub model_id: usize,
    pub error: f64,
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_flag: Option<String>,
}

/// The residue-local slice of one violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeqViolationRow {
    pub list_id: i64,
    pub restraint_id: i64,
    /// Atoms of the witnessed combination that live in this residue.
    pub atoms: Vec<String>,
    pub error: f64,
}

/// An atom reference that resolved in no model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmappedEntry {
    pub list_id: i64,
    pub restraint_id: i64,
    pub atoms: Vec<String>,
}

/// Report section for the distance subtype.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistanceSection {
    pub ok: bool,
    pub summary: DistanceBuckets<usize>,
    pub violation: DistanceBuckets<usize>,
    pub consistent_violation: DistanceBuckets<usize>,
    /// Per bucket, index k holds the number of restraints violated in
    /// exactly k models (k in 0..=M).
    pub violations_vs_models: DistanceBuckets<Vec<usize>>,
    /// Per model, per bucket, the list of violation errors.
    pub violations_in_models: BTreeMap<usize, DistanceBuckets<Vec<f64>>>,
    pub residual_violations: Vec<ResidualBin>,
    pub most_violated: Vec<MostViolatedRow>,
    pub all_violations: Vec<ViolationRow>,
    /// Keyed by sequence key, then model id.
    pub violation_seq: BTreeMap<String, BTreeMap<usize, Vec<SeqViolationRow>>>,
    pub unmapped: Vec<UnmappedEntry>,
}

/// Report section for the dihedral and RDC subtypes (single-name buckets).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedSection {
    pub ok: bool,
    pub summary: NamedBuckets<usize>,
    pub violation: NamedBuckets<usize>,
    pub consistent_violation: NamedBuckets<usize>,
    pub violations_vs_models: NamedBuckets<Vec<usize>>,
    pub violations_in_models: BTreeMap<usize, NamedBuckets<Vec<f64>>>,
    pub residual_violations: Vec<ResidualBin>,
    pub most_violated: Vec<MostViolatedRow>,
    pub all_violations: Vec<ViolationRow>,
    pub violation_seq: BTreeMap<String, BTreeMap<usize, Vec<SeqViolationRow>>>,
    pub unmapped: Vec<UnmappedEntry>,
}

/// The full output of one validation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub model_count: usize,
    pub model_ids: Vec<usize>,
    pub representative_model_id: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    /// True when the report was reloaded from the cache.
    #[serde(default)]
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dihedral: Option<NamedSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdc: Option<NamedSection>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// Whether every present subtype evaluated cleanly.
    pub fn all_ok(&self) -> bool {
        self.distance.as_ref().map(|s| s.ok).unwrap_or(true)
            && self.dihedral.as_ref().map(|s| s.ok).unwrap_or(true)
            && self.rdc.as_ref().map(|s| s.ok).unwrap_or(true)
    }
}
