//! # tether-core
//!
//! A library for validating NMR restraints against 3D coordinate ensembles.
//!
//! __tether-core__ provides functionality for:
//! * Indexing the atoms of a multi-model coordinate file by author-level identity
//! * Normalizing distance, dihedral-angle and RDC restraint records
//! * Evaluating ambiguous restraints per model with r⁻⁶ effective distances
//!   and wrap-aware dihedral errors
//! * Aggregating per-model errors into an ensemble-wide validation report
//!
//! The main entry point is the [`Orchestrator`] which drives the stages of a
//! validation run and returns a [`ValidationReport`] together with the
//! diagnostics accumulated along the way.
//!
mod cache;
mod config;
mod coords;
mod diagnostics;
mod engines;
mod error;
mod geometry;
mod info;
mod pipeline;
mod report;
mod restraints;

pub use self::cache::ReportCache;
pub use self::config::ValidationConfig;
pub use self::coords::{AtomKey, AtomRecord, CoordinateIndex, SequenceKey};
pub use self::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog};
pub use self::engines::{AlignmentTensor, AlignmentTensorProvider, ViolationMaps};
pub use self::error::{Result, TetherError};
pub use self::pipeline::{
    CoordinateFile, CoordinateProvider, Orchestrator, RestraintJsonFile, RestraintProvider,
    RunOutput,
};
pub use self::report::{
    DistanceBuckets, DistanceSection, MostViolatedRow, NamedBuckets, NamedSection, ResidualBin,
    SeqViolationRow, SubtypeKind, UnmappedEntry, ValidationReport, ViolationRow,
};
pub use self::restraints::{
    BondFlag, CombinationKey, DihedralMember, DihedralRestraint, DistanceClass, DistanceMember,
    DistanceRestraint, RdcMember, RdcRestraint, RestraintDocument, RestraintKey, SubClass,
};
