//! Distance violation engine.
//!
//! For every restraint and model, each combination group is collapsed to the
//! r⁻⁶-summed effective distance over its resolvable pairs, clamped against
//! the bounds, and the best (lowest-error) combination is kept. Pairs whose
//! atoms are missing in a model are skipped; references missing from every
//! model have already been caught by the binder, but the engine records its
//! own sightings too so the maps stand alone.

use super::{bound_error, combination_groups, within_bracket, ViolationMaps};
use crate::coords::CoordinateIndex;
use crate::diagnostics::{DiagnosticKind, DiagnosticLog};
use crate::geometry::{distance, r6_summed_distance};
use crate::restraints::{CombinationKey, DistanceRestraint};

pub(crate) fn evaluate_distances(
    restraints: &[DistanceRestraint],
    coords: &CoordinateIndex,
    bracket: (f64, f64),
    diagnostics: &mut DiagnosticLog,
) -> ViolationMaps {
    let model_ids = coords.model_ids();
    let mut maps = ViolationMaps::default();

    for restraint in restraints {
        let groups = combination_groups(&restraint.members, |m| m.combination);
        let mut error_slots: Vec<Option<f64>> = Vec::with_capacity(model_ids.len());
        let mut combo_slots: Vec<Option<CombinationKey>> = Vec::with_capacity(model_ids.len());

        for &model_id in &model_ids {
            let mut best: Option<(CombinationKey, f64)> = None;
            for (combo, members) in &groups {
                let mut pair_distances = Vec::with_capacity(members.len());
                for member in members {
                    let a = coords.lookup(model_id, &member.atom1);
                    let b = coords.lookup(model_id, &member.atom2);
                    let (Some(a), Some(b)) = (a, b) else {
                        if a.is_none() {
                            maps.record_unmapped(restraint.key, &member.atom1);
                        }
                        if b.is_none() {
                            maps.record_unmapped(restraint.key, &member.atom2);
                        }
                        continue;
                    };
                    let d = distance(&a.position, &b.position);
                    if d == 0.0 && member.atom1 != member.atom2 {
                        diagnostics.push_for(
                            DiagnosticKind::ZeroDistanceAnomaly,
                            restraint.key,
                            format!(
                                "0 Å between {} and {} in model {model_id}",
                                member.atom1, member.atom2
                            ),
                        );
                    }
                    pair_distances.push(d);
                }
                let Some(effective) = r6_summed_distance(&pair_distances) else {
                    continue;
                };
                let bounds = members
                    .first()
                    .map(|m| (m.lower_bound, m.upper_bound))
                    .unwrap_or((None, None));
                let err = bound_error(effective, bounds.0, bounds.1);
                // strict: an earlier combination wins ties
                if best.map(|(_, e)| err < e).unwrap_or(true) {
                    best = Some((*combo, err));
                }
            }
            match best {
                Some((combo, err)) => {
                    error_slots.push(Some(err));
                    combo_slots.push(within_bracket(err, bracket).then_some(combo));
                }
                None => {
                    error_slots.push(None);
                    combo_slots.push(None);
                }
            }
        }

        maps.errors.insert(restraint.key, error_slots);
        maps.best_combinations.insert(restraint.key, combo_slots);
    }
    maps
}
