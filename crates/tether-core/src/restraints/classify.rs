//! Restraint classification.
//!
//! Every distance restraint gets three labels: a contact class from the
//! sequence separation of its two atoms, a backbone/side-chain subclass, and
//! a bond-type flag derived from the restraint origin text.

use super::records::AtomRef;
use crate::info::constants::is_backbone_atom;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Sequence-separation class of a distance restraint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
pub enum DistanceClass {
    #[strum(serialize = "intraresidue")]
    Intraresidue,
    #[strum(serialize = "sequential")]
    Sequential,
    #[strum(serialize = "medium")]
    Medium,
    #[strum(serialize = "long")]
    Long,
    #[strum(serialize = "interchain")]
    Interchain,
}

/// Backbone/side-chain subclass of a distance restraint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
pub enum SubClass {
    #[strum(serialize = "bb-bb")]
    BackboneBackbone,
    #[strum(serialize = "bb-sc")]
    BackboneSidechain,
    #[strum(serialize = "sc-sc")]
    SidechainSidechain,
}

/// Bond-type flag derived from the restraint origin.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
pub enum BondFlag {
    #[strum(serialize = "hbond")]
    Hydrogen,
    #[strum(serialize = "sbond")]
    Disulfide,
    #[strum(serialize = "sebond")]
    Diselenide,
    #[strum(serialize = "metal")]
    MetalCoordination,
    #[strum(serialize = "none")]
    None,
}

/// Contact class from the two atom references.
///
/// Interchain when the entity assembly ids differ (falling back to the chain
/// ids when either side lacks one); otherwise classified by sequence
/// separation: 0 intraresidue, 1 sequential, 2-4 medium, else long.
pub(crate) fn distance_class(atom1: &AtomRef, atom2: &AtomRef) -> DistanceClass {
    let interchain = match (atom1.entity_assembly_id, atom2.entity_assembly_id) {
        (Some(a), Some(b)) => a != b,
        _ => atom1.chain_id != atom2.chain_id,
    };
    if interchain {
        return DistanceClass::Interchain;
    }
    match (atom1.seq_id - atom2.seq_id).unsigned_abs() {
        0 => DistanceClass::Intraresidue,
        1 => DistanceClass::Sequential,
        2..=4 => DistanceClass::Medium,
        _ => DistanceClass::Long,
    }
}

/// Backbone/side-chain subclass from the two atom references.
pub(crate) fn sub_class(atom1: &AtomRef, atom2: &AtomRef) -> SubClass {
    let bb1 = is_backbone_atom(&atom1.comp_id, &atom1.atom_id);
    let bb2 = is_backbone_atom(&atom2.comp_id, &atom2.atom_id);
    match (bb1, bb2) {
        (true, true) => SubClass::BackboneBackbone,
        (false, false) => SubClass::SidechainSidechain,
        _ => SubClass::BackboneSidechain,
    }
}

/// Bond-type flag from the free-text restraint origin.
pub(crate) fn bond_flag(origin: Option<&str>) -> BondFlag {
    let Some(origin) = origin else {
        return BondFlag::None;
    };
    let origin = origin.to_ascii_lowercase();
    if origin.contains("hydrogen") || origin.contains("hbond") {
        BondFlag::Hydrogen
    } else if origin.contains("disulfide") || origin.contains("disulphide") {
        BondFlag::Disulfide
    } else if origin.contains("diselenide") {
        BondFlag::Diselenide
    } else if origin.contains("metal") || origin.contains("coordination") {
        BondFlag::MetalCoordination
    } else {
        BondFlag::None
    }
}
