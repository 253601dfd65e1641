//! Dihedral violation engine.
//!
//! Angles come from the projection-of-rejections construction; errors are
//! wrap-aware. A combination group's observed angle is the arithmetic mean
//! of its members' raw angles (the normalizer is responsible for keeping
//! members of one group on the same branch).

use super::{combination_groups, within_bracket, ViolationMaps};
use crate::coords::CoordinateIndex;
use crate::diagnostics::DiagnosticLog;
use crate::geometry::{angle_diff, dihedral_angle};
use crate::restraints::{CombinationKey, DihedralRestraint};

/// Half-degree slack on the range-membership test.
const MATCH_SLACK_DEGREES: f64 = 0.5;

/// Wrap-aware error of an observed angle against `[lower, upper]` with
/// target inside the range.
///
/// The observed angle matches the range when it sits on the minor arc
/// between either bound and the target (within the slack); otherwise the
/// error is the distance to the nearer bound.
pub(crate) fn dihedral_error(lower: f64, upper: f64, target: f64, observed: f64) -> f64 {
    let lower_arc = angle_diff(lower, target);
    let upper_arc = angle_diff(upper, target);
    let on_lower_arc =
        angle_diff(lower, observed) + angle_diff(observed, target) <= lower_arc + MATCH_SLACK_DEGREES;
    let on_upper_arc =
        angle_diff(upper, observed) + angle_diff(observed, target) <= upper_arc + MATCH_SLACK_DEGREES;
    if on_lower_arc || on_upper_arc {
        return 0.0;
    }
    angle_diff(upper, observed).min(angle_diff(lower, observed))
}

pub(crate) fn evaluate_dihedrals(
    restraints: &[DihedralRestraint],
    coords: &CoordinateIndex,
    bracket: (f64, f64),
    _diagnostics: &mut DiagnosticLog,
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
                let mut angles = Vec::with_capacity(members.len());
                for member in members {
                    let positions: Vec<_> = member
                        .atoms
                        .iter()
                        .map(|atom| {
                            let record = coords.lookup(model_id, atom);
                            if record.is_none() {
                                maps.record_unmapped(restraint.key, atom);
                            }
                            record.map(|r| r.position)
                        })
                        .collect();
                    let (Some(p0), Some(p1), Some(p2), Some(p3)) =
                        (positions[0], positions[1], positions[2], positions[3])
                    else {
                        continue;
                    };
                    angles.push(dihedral_angle(&p0, &p1, &p2, &p3));
                }
                if angles.is_empty() {
                    continue;
                }
                let observed = angles.iter().sum::<f64>() / angles.len() as f64;
                let Some(bounds) = members.first() else {
                    continue;
                };
                let err = dihedral_error(
                    bounds.lower_bound,
                    bounds.upper_bound,
                    bounds.target_value,
                    observed,
                );
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::test_utilities::index_from_atoms;
    use crate::coords::AtomKey;
    use crate::restraints::{DihedralMember, RestraintKey};

    const BRACKET: (f64, f64) = (1.0, 180.0);

    #[test]
    fn test_error_zero_inside_range() {
        assert_eq!(dihedral_error(-75.0, -35.0, -55.0, -50.0), 0.0);
        assert_eq!(dihedral_error(-75.0, -35.0, -55.0, -74.9), 0.0);
    }

    #[test]
    fn test_error_at_wrapped_bound() {
        // T=-170, L=-175, U=-165; observing the lower bound itself
        assert_eq!(dihedral_error(-175.0, -165.0, -170.0, -175.0), 0.0);
        // ten degrees past the lower bound, across the seam
        let err = dihedral_error(-175.0, -165.0, -170.0, 175.0);
        assert!((err - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_error_invariant_under_full_turn_shift() {
        let base = dihedral_error(-175.0, -165.0, -170.0, 175.0);
        let shifted = dihedral_error(
            -175.0 + 360.0,
            -165.0 + 360.0,
            -170.0 + 360.0,
            175.0 + 360.0,
        );
        assert!((base - shifted).abs() < 1e-9);
    }

    #[test]
    fn test_error_picks_nearer_bound() {
        // a=+30 outside [−120, 0]: 30° past the upper bound, 150° from lower
        let err = dihedral_error(-120.0, 0.0, -60.0, 30.0);
        assert!((err - 30.0).abs() < 1e-9);
    }

    fn phi_member(lower: f64, upper: f64, target: f64) -> DihedralMember {
        DihedralMember {
            atoms: [
                AtomKey::new("A", 3, "VAL", "C"),
                AtomKey::new("A", 4, "ASP", "N"),
                AtomKey::new("A", 4, "ASP", "CA"),
                AtomKey::new("A", 4, "ASP", "C"),
            ],
            combination: CombinationKey::new(0, 0),
            angle_name: "PHI".to_string(),
            lower_bound: lower,
            upper_bound: upper,
            target_value: target,
        }
    }

    #[test]
    fn test_engine_evaluates_planar_angle() {
        // four atoms in a plane: dihedral 180°
        let member = phi_member(170.0, -170.0, 180.0);
        let coords = index_from_atoms(vec![
            (1, member.atoms[0].clone(), [1.0, 0.0, 0.0]),
            (1, member.atoms[1].clone(), [0.0, 0.0, 0.0]),
            (1, member.atoms[2].clone(), [0.0, 0.0, 1.0]),
            (1, member.atoms[3].clone(), [-1.0, 0.0, 1.0]),
        ]);
        let key = RestraintKey::new(2, 1);
        let restraint = DihedralRestraint {
            key,
            members: vec![member],
        };

        let mut log = DiagnosticLog::new();
        let maps = evaluate_dihedrals(&[restraint], &coords, BRACKET, &mut log);
        assert_eq!(maps.errors[&key], vec![Some(0.0)]);
    }

    #[test]
    fn test_engine_null_when_atom_missing() {
        let member = phi_member(-75.0, -35.0, -55.0);
        let coords = index_from_atoms(vec![
            (1, member.atoms[0].clone(), [1.0, 0.0, 0.0]),
            (1, member.atoms[1].clone(), [0.0, 0.0, 0.0]),
            (1, member.atoms[2].clone(), [0.0, 0.0, 1.0]),
            // atoms[3] missing
        ]);
        let key = RestraintKey::new(2, 2);
        let missing = member.atoms[3].clone();
        let restraint = DihedralRestraint {
            key,
            members: vec![member],
        };

        let mut log = DiagnosticLog::new();
        let maps = evaluate_dihedrals(&[restraint], &coords, BRACKET, &mut log);
        assert_eq!(maps.errors[&key], vec![None]);
        assert!(maps.unmapped[&key].contains(&missing));
    }
}
