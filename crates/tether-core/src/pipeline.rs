//! The validation pipeline.
//!
//! A run is an ordered sequence of idempotent stages. Each stage either
//! installs its output into the run state and continues, or stops the run;
//! on a stop the orchestrator finalizes whatever report can be built from
//! the stages that completed. No stage publishes state before it returns.

use crate::cache::{content_digest, ReportCache};
use crate::config::ValidationConfig;
use crate::coords::CoordinateIndex;
use crate::diagnostics::{DiagnosticKind, DiagnosticLog};
use crate::engines::{
    evaluate_dihedrals, evaluate_distances, evaluate_rdcs, AlignmentTensorProvider, ViolationMaps,
};
use crate::error::{Result, TetherError};
use crate::report::{
    aggregate_dihedral, aggregate_distance, aggregate_rdc, rdc_summary_only, DistanceSection,
    NamedSection, ValidationReport,
};
use crate::restraints::{
    bind_dihedrals, bind_distances, bind_rdcs, normalize_dihedrals, normalize_distances,
    normalize_rdcs, DihedralRestraint, DistanceRestraint, RdcRestraint, RestraintDocument,
    SequenceIndex,
};
use std::path::PathBuf;

/// The coordinate collaborator: hands over a parsed ensemble plus an opaque
/// content digest for cacheability.
pub trait CoordinateProvider {
    fn fetch(&self) -> Result<pdbtbx::PDB>;
    fn content_digest(&self) -> Result<String>;
}

/// The restraint collaborator: owns vendor-dialect parsing and hands over
/// normalized rows per subtype.
pub trait RestraintProvider {
    fn fetch(&self) -> Result<RestraintDocument>;
    fn content_digest(&self) -> Result<String>;
}

/// File-backed coordinate source (mmCIF or PDB, per pdbtbx).
pub struct CoordinateFile {
    path: PathBuf,
}

impl CoordinateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CoordinateFile { path: path.into() }
    }
}

impl CoordinateProvider for CoordinateFile {
    fn fetch(&self) -> Result<pdbtbx::PDB> {
        let path = self.path.to_string_lossy();
        let (pdb, errors) = pdbtbx::open(path.as_ref()).map_err(|errors| {
            TetherError::CoordinateParse(
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;
        for error in &errors {
            log::warn!("coordinate parser: {error}");
        }
        Ok(pdb)
    }

    fn content_digest(&self) -> Result<String> {
        let bytes = std::fs::read(&self.path)?;
        Ok(content_digest(&[&bytes]))
    }
}

/// File-backed restraint source: one JSON document of parsed rows.
pub struct RestraintJsonFile {
    path: PathBuf,
}

impl RestraintJsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RestraintJsonFile { path: path.into() }
    }
}

impl RestraintProvider for RestraintJsonFile {
    fn fetch(&self) -> Result<RestraintDocument> {
        let bytes = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn content_digest(&self) -> Result<String> {
        let bytes = std::fs::read(&self.path)?;
        Ok(content_digest(&[&bytes]))
    }
}

/// Everything a finished (or stopped) run hands back.
pub struct RunOutput {
    /// `None` only when the coordinate load failed.
    pub report: Option<ValidationReport>,
    pub diagnostics: DiagnosticLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOutcome {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    LoadCoordinates,
    LoadRestraints,
    ReuseCachedReport,
    IndexCoordinateAtoms,
    NormalizeRestraints,
    DistanceViolations,
    DihedralViolations,
    RdcViolations,
    AggregateCommon,
    AggregateDistance,
    AggregateDihedral,
    AggregateRdc,
    EmitReport,
}

const STAGES: &[(Stage, &str)] = &[
    (Stage::LoadCoordinates, "load-coordinates"),
    (Stage::LoadRestraints, "load-restraints"),
    (Stage::ReuseCachedReport, "reuse-cached-report"),
    (Stage::IndexCoordinateAtoms, "index-coordinate-atoms"),
    (Stage::NormalizeRestraints, "normalize-restraints"),
    (Stage::DistanceViolations, "distance-violations"),
    (Stage::DihedralViolations, "dihedral-violations"),
    (Stage::RdcViolations, "rdc-violations"),
    (Stage::AggregateCommon, "aggregate-common"),
    (Stage::AggregateDistance, "aggregate-distance"),
    (Stage::AggregateDihedral, "aggregate-dihedral"),
    (Stage::AggregateRdc, "aggregate-rdc"),
    (Stage::EmitReport, "emit-report"),
];

#[derive(Default)]
struct RunState {
    pdb: Option<pdbtbx::PDB>,
    document: Option<RestraintDocument>,
    digest: Option<String>,
    coords: Option<CoordinateIndex>,
    distance: Vec<DistanceRestraint>,
    dihedral: Vec<DihedralRestraint>,
    rdc: Vec<RdcRestraint>,
    distance_index: SequenceIndex,
    dihedral_index: SequenceIndex,
    rdc_index: SequenceIndex,
    distance_maps: Option<ViolationMaps>,
    dihedral_maps: Option<ViolationMaps>,
    rdc_maps: Option<ViolationMaps>,
    rdc_available: bool,
    coordinate_load_failed: bool,
    report: ValidationReport,
    diagnostics: DiagnosticLog,
}

/// Drives a validation run through its stages.
pub struct Orchestrator<'a> {
    config: ValidationConfig,
    tensor_provider: Option<&'a dyn AlignmentTensorProvider>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: ValidationConfig) -> Self {
        Orchestrator {
            config,
            tensor_provider: None,
        }
    }

    /// Wire in the RDC collaborator. Without it the RDC subtype is reported
    /// as unavailable.
    pub fn with_tensor_provider(mut self, provider: &'a dyn AlignmentTensorProvider) -> Self {
        self.tensor_provider = Some(provider);
        self
    }

    pub fn run(
        &self,
        coordinates: &dyn CoordinateProvider,
        restraints: &dyn RestraintProvider,
    ) -> RunOutput {
        let mut state = RunState::default();
        for (stage, name) in STAGES {
            let outcome = self.run_stage(*stage, &mut state, coordinates, restraints);
            log::info!(
                "stage {name}: {}",
                match outcome {
                    StageOutcome::Continue => "ok",
                    StageOutcome::Stop => "stop",
                }
            );
            if outcome == StageOutcome::Stop {
                break;
            }
        }
        self.finalize(state)
    }

    fn run_stage(
        &self,
        stage: Stage,
        state: &mut RunState,
        coordinates: &dyn CoordinateProvider,
        restraints: &dyn RestraintProvider,
    ) -> StageOutcome {
        match stage {
            Stage::LoadCoordinates => match coordinates.fetch() {
                Ok(pdb) => {
                    state.pdb = Some(pdb);
                    StageOutcome::Continue
                }
                Err(err) => {
                    state.coordinate_load_failed = true;
                    state
                        .diagnostics
                        .push(DiagnosticKind::InputUnavailable, format!("coordinates: {err}"));
                    StageOutcome::Stop
                }
            },
            Stage::LoadRestraints => match restraints.fetch() {
                Ok(document) if !document.is_empty() => {
                    state.document = Some(document);
                    StageOutcome::Continue
                }
                Ok(_) => {
                    state.diagnostics.push(
                        DiagnosticKind::InputUnavailable,
                        "restraint document contains no restraints",
                    );
                    StageOutcome::Stop
                }
                Err(err) => {
                    state
                        .diagnostics
                        .push(DiagnosticKind::InputUnavailable, format!("restraints: {err}"));
                    StageOutcome::Stop
                }
            },
            Stage::ReuseCachedReport => {
                if !self.config.use_cache {
                    return StageOutcome::Continue;
                }
                let Some(dir) = self.config.cache_dir.as_ref() else {
                    return StageOutcome::Continue;
                };
                let digest = match (coordinates.content_digest(), restraints.content_digest()) {
                    (Ok(a), Ok(b)) => content_digest(&[a.as_bytes(), b.as_bytes()]),
                    _ => return StageOutcome::Continue,
                };
                state.digest = Some(digest.clone());
                match ReportCache::new(dir).load(&digest) {
                    Some(mut report) => {
                        report.cached = true;
                        state.report = report;
                        StageOutcome::Stop
                    }
                    None => StageOutcome::Continue,
                }
            }
            Stage::IndexCoordinateAtoms => {
                let Some(pdb) = state.pdb.as_ref() else {
                    return StageOutcome::Stop;
                };
                match CoordinateIndex::from_pdb(pdb, &self.config) {
                    Ok(index) => {
                        state.coords = Some(index);
                        StageOutcome::Continue
                    }
                    Err(err) => {
                        state
                            .diagnostics
                            .push(DiagnosticKind::InputUnavailable, err.to_string());
                        StageOutcome::Stop
                    }
                }
            }
            Stage::NormalizeRestraints => {
                let (Some(document), Some(coords)) = (state.document.as_ref(), state.coords.as_ref())
                else {
                    return StageOutcome::Stop;
                };
                state.distance = normalize_distances(&document.distance, &mut state.diagnostics);
                state.dihedral = normalize_dihedrals(&document.dihedral, &mut state.diagnostics);
                state.rdc = normalize_rdcs(&document.rdc, &mut state.diagnostics);
                state.distance_index =
                    bind_distances(&state.distance, coords, &mut state.diagnostics);
                state.dihedral_index =
                    bind_dihedrals(&state.dihedral, coords, &mut state.diagnostics);
                state.rdc_index = bind_rdcs(&state.rdc, coords, &mut state.diagnostics);
                StageOutcome::Continue
            }
            Stage::DistanceViolations => {
                let Some(coords) = state.coords.as_ref() else {
                    return StageOutcome::Stop;
                };
                let mut maps = evaluate_distances(
                    &state.distance,
                    coords,
                    self.config.distance_bracket(),
                    &mut state.diagnostics,
                );
                merge_unmapped(&mut maps, &state.distance_index);
                state.distance_maps = Some(maps);
                StageOutcome::Continue
            }
            Stage::DihedralViolations => {
                let Some(coords) = state.coords.as_ref() else {
                    return StageOutcome::Stop;
                };
                let mut maps = evaluate_dihedrals(
                    &state.dihedral,
                    coords,
                    self.config.dihedral_bracket(),
                    &mut state.diagnostics,
                );
                merge_unmapped(&mut maps, &state.dihedral_index);
                state.dihedral_maps = Some(maps);
                StageOutcome::Continue
            }
            Stage::RdcViolations => {
                let Some(coords) = state.coords.as_ref() else {
                    return StageOutcome::Stop;
                };
                match evaluate_rdcs(
                    &state.rdc,
                    coords,
                    self.tensor_provider,
                    self.config.rdc_bracket(),
                    &mut state.diagnostics,
                ) {
                    Some(mut maps) => {
                        merge_unmapped(&mut maps, &state.rdc_index);
                        state.rdc_maps = Some(maps);
                        state.rdc_available = true;
                    }
                    None => {
                        state.rdc_available = false;
                    }
                }
                StageOutcome::Continue
            }
            Stage::AggregateCommon => {
                let Some(coords) = state.coords.as_ref() else {
                    return StageOutcome::Stop;
                };
                state.report.model_count = coords.model_count();
                state.report.model_ids = coords.model_ids();
                state.report.representative_model_id = self.config.representative_model_id;
                StageOutcome::Continue
            }
            Stage::AggregateDistance => {
                if state.distance.is_empty() {
                    return StageOutcome::Continue;
                }
                let Some(maps) = state.distance_maps.as_ref() else {
                    return StageOutcome::Stop;
                };
                state.report.distance = Some(aggregate_distance(
                    &state.distance,
                    maps,
                    &state.report.model_ids,
                    self.config.distance_bracket(),
                    &self.config.distance_bins,
                ));
                StageOutcome::Continue
            }
            Stage::AggregateDihedral => {
                if state.dihedral.is_empty() {
                    return StageOutcome::Continue;
                }
                let Some(maps) = state.dihedral_maps.as_ref() else {
                    return StageOutcome::Stop;
                };
                state.report.dihedral = Some(aggregate_dihedral(
                    &state.dihedral,
                    maps,
                    &state.report.model_ids,
                    self.config.dihedral_bracket(),
                    &self.config.dihedral_bins,
                ));
                StageOutcome::Continue
            }
            Stage::AggregateRdc => {
                if state.rdc.is_empty() {
                    return StageOutcome::Continue;
                }
                if state.rdc_available {
                    let Some(maps) = state.rdc_maps.as_ref() else {
                        return StageOutcome::Stop;
                    };
                    state.report.rdc = Some(aggregate_rdc(
                        &state.rdc,
                        maps,
                        &state.report.model_ids,
                        self.config.rdc_bracket(),
                        &self.config.rdc_bins,
                    ));
                } else {
                    state.report.rdc = Some(rdc_summary_only(&state.rdc));
                }
                StageOutcome::Continue
            }
            Stage::EmitReport => {
                if self.config.use_cache {
                    if let (Some(dir), Some(digest)) =
                        (self.config.cache_dir.as_ref(), state.digest.as_ref())
                    {
                        if let Err(err) = ReportCache::new(dir).store(digest, &state.report) {
                            log::warn!("report cache not written: {err}");
                        }
                    }
                }
                StageOutcome::Continue
            }
        }
    }

    fn finalize(&self, mut state: RunState) -> RunOutput {
        if state.coordinate_load_failed {
            return RunOutput {
                report: None,
                diagnostics: state.diagnostics,
            };
        }
        // a stop before aggregation leaves evaluated-but-unreported subtypes
        // flagged as failed
        if state.report.distance.is_none() && !state.distance.is_empty() {
            state.report.distance = Some(DistanceSection::default());
        }
        if state.report.dihedral.is_none() && !state.dihedral.is_empty() {
            state.report.dihedral = Some(NamedSection::default());
        }
        if state.report.rdc.is_none() && !state.rdc.is_empty() {
            state.report.rdc = Some(NamedSection::default());
        }
        // a cached report keeps the diagnostics of the run that produced it
        state
            .report
            .diagnostics
            .extend(state.diagnostics.entries().iter().cloned());
        RunOutput {
            report: Some(state.report),
            diagnostics: state.diagnostics,
        }
    }
}

fn merge_unmapped(maps: &mut ViolationMaps, index: &SequenceIndex) {
    for (key, atoms) in &index.unmapped {
        let entry = maps.unmapped.entry(*key).or_default();
        for atom in atoms {
            entry.insert(atom.clone());
        }
    }
}
