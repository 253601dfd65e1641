//! Parsed restraint records.
//!
//! Vendor-dialect parsing (ARIA, CHARMM, SYBYL, ...) happens upstream; the
//! collaborator hands over one document of already-flattened rows per
//! subtype. These rows are the wire format of that hand-off. Everything the
//! engines consume is derived from them by the normalizer.

use crate::coords::AtomKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identity of one restraint: (list, restraint-in-list).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RestraintKey {
    pub list_id: i64,
    pub restraint_id: i64,
}

impl RestraintKey {
    pub fn new(list_id: i64, restraint_id: i64) -> Self {
        RestraintKey {
            list_id,
            restraint_id,
        }
    }
}

impl fmt::Display for RestraintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.list_id, self.restraint_id)
    }
}

/// Grouping of restraint members that are evaluated as one alternative.
///
/// Distance restraints use both fields; dihedral and RDC restraints group by
/// `combination_id` alone and carry `member_id = 0`. Absent ids normalize to
/// 0, so unambiguous restraints form a single group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CombinationKey {
    pub combination_id: i64,
    pub member_id: i64,
}

impl CombinationKey {
    pub fn new(combination_id: i64, member_id: i64) -> Self {
        CombinationKey {
            combination_id,
            member_id,
        }
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}m{}", self.combination_id, self.member_id)
    }
}

/// One atom reference as the restraint source wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomRef {
    pub chain_id: String,
    pub seq_id: i64,
    pub comp_id: String,
    pub atom_id: String,
    #[serde(default)]
    pub ins_code: Option<String>,
    #[serde(default)]
    pub entity_assembly_id: Option<i64>,
}

impl AtomRef {
    pub(crate) fn atom_key(&self) -> AtomKey {
        AtomKey {
            auth_chain_id: self.chain_id.clone(),
            auth_seq_id: self.seq_id,
            auth_comp_id: self.comp_id.clone(),
            auth_atom_id: self.atom_id.clone(),
            ins_code: self.ins_code.clone(),
        }
    }
}

/// One distance restraint member row.
#[derive(Debug, Clone, Deserialize)]
pub struct DistanceRow {
    pub list_id: i64,
    pub restraint_id: i64,
    #[serde(default)]
    pub combination_id: Option<i64>,
    #[serde(default)]
    pub member_id: Option<i64>,
    pub atom1: AtomRef,
    pub atom2: AtomRef,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub target_uncertainty: Option<f64>,
    /// Free-text restraint origin, e.g. "hydrogen bond", "disulfide bond".
    #[serde(default)]
    pub origin: Option<String>,
}

/// One dihedral-angle restraint member row.
#[derive(Debug, Clone, Deserialize)]
pub struct DihedralRow {
    pub list_id: i64,
    pub restraint_id: i64,
    #[serde(default)]
    pub combination_id: Option<i64>,
    pub atom1: AtomRef,
    pub atom2: AtomRef,
    pub atom3: AtomRef,
    pub atom4: AtomRef,
    #[serde(default)]
    pub angle_name: Option<String>,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,
    #[serde(default)]
    pub lower_linear_limit: Option<f64>,
    #[serde(default)]
    pub upper_linear_limit: Option<f64>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub target_uncertainty: Option<f64>,
}

/// One residual-dipolar-coupling restraint member row.
#[derive(Debug, Clone, Deserialize)]
pub struct RdcRow {
    pub list_id: i64,
    pub restraint_id: i64,
    #[serde(default)]
    pub combination_id: Option<i64>,
    pub atom1: AtomRef,
    pub atom2: AtomRef,
    #[serde(default)]
    pub rdc_type: Option<String>,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub target_uncertainty: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub value_uncertainty: Option<f64>,
}

/// The full hand-off from the restraint-parsing collaborator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestraintDocument {
    #[serde(default)]
    pub distance: Vec<DistanceRow>,
    #[serde(default)]
    pub dihedral: Vec<DihedralRow>,
    #[serde(default)]
    pub rdc: Vec<RdcRow>,
}

impl RestraintDocument {
    pub fn is_empty(&self) -> bool {
        self.distance.is_empty() && self.dihedral.is_empty() && self.rdc.is_empty()
    }
}
