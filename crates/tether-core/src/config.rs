//! Run configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Tunable parameters of a validation run.
///
/// The defaults match the conventional wwPDB validation settings: a distance
/// violation starts at 0.1 Å past a bound, a dihedral violation at 1.0°, an
/// RDC violation at 1.0 Hz. Errors at or beyond the `max_*` values are treated
/// as outliers and excluded from violation counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Model used for any non-ensemble lookup.
    pub representative_model_id: usize,
    /// Reuse a cached report when the input digests match.
    pub use_cache: bool,
    /// Directory holding cached reports. `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Polymer chain count at which the large-assembly guard engages.
    pub large_assembly_chain_threshold: usize,
    /// Chains kept when the large-assembly guard engages. `None` keeps all.
    pub large_assembly_chain_allowlist: Option<BTreeSet<String>>,
    /// Minimum distance error counted as a violation (Å).
    pub distance_cutoff: f64,
    /// Minimum dihedral error counted as a violation (degrees).
    pub dihedral_cutoff: f64,
    /// Minimum RDC error counted as a violation (Hz).
    pub rdc_cutoff: f64,
    /// Distance errors at or past this value are outliers (Å).
    pub max_distance_error: f64,
    /// Dihedral errors at or past this value are outliers (degrees).
    pub max_angle_error: f64,
    /// RDC errors at or past this value are outliers (Hz).
    pub max_rdc_error: f64,
    /// Residual-bin boundaries for distance errors (Å).
    pub distance_bins: Vec<f64>,
    /// Residual-bin boundaries for dihedral errors (degrees).
    pub dihedral_bins: Vec<f64>,
    /// Residual-bin boundaries for RDC errors (Hz).
    pub rdc_bins: Vec<f64>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            representative_model_id: 1,
            use_cache: false,
            cache_dir: None,
            large_assembly_chain_threshold: 26,
            large_assembly_chain_allowlist: None,
            distance_cutoff: 0.1,
            dihedral_cutoff: 1.0,
            rdc_cutoff: 1.0,
            max_distance_error: 100.0,
            max_angle_error: 180.0,
            max_rdc_error: 100.0,
            distance_bins: vec![0.1, 0.2, 0.5],
            dihedral_bins: vec![1.0, 10.0, 20.0],
            rdc_bins: vec![1.0, 2.0, 5.0],
        }
    }
}

impl ValidationConfig {
    /// The violation bracket for one subtype: `cutoff < err < max`.
    pub(crate) fn distance_bracket(&self) -> (f64, f64) {
        (self.distance_cutoff, self.max_distance_error)
    }

    pub(crate) fn dihedral_bracket(&self) -> (f64, f64) {
        (self.dihedral_cutoff, self.max_angle_error)
    }

    pub(crate) fn rdc_bracket(&self) -> (f64, f64) {
        (self.rdc_cutoff, self.max_rdc_error)
    }
}
