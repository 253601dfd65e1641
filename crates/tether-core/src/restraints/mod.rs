mod binder;
mod classify;
mod normalize;
mod records;

pub use self::binder::SequenceIndex;
pub(crate) use self::binder::{bind_dihedrals, bind_distances, bind_rdcs};
pub use self::classify::{BondFlag, DistanceClass, SubClass};
pub use self::normalize::{
    normalize_dihedrals, normalize_distances, normalize_rdcs, DihedralMember, DihedralRestraint,
    DistanceMember, DistanceRestraint, RdcMember, RdcRestraint,
};
pub use self::records::{
    AtomRef, CombinationKey, DihedralRow, DistanceRow, RdcRow, RestraintDocument, RestraintKey,
};
