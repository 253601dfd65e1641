mod aggregate;
mod model;

pub(crate) use self::aggregate::{
    aggregate_dihedral, aggregate_distance, aggregate_rdc, rdc_summary_only,
};
pub use self::model::{
    DistanceBuckets, DistanceSection, MostViolatedRow, NamedBuckets, NamedSection, ResidualBin,
    SeqViolationRow, SubtypeKind, UnmappedEntry, ValidationReport, ViolationRow,
};
