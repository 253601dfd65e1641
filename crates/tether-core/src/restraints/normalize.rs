//! Restraint normalization.
//!
//! Consumes the parsed rows of [`RestraintDocument`](super::RestraintDocument)
//! and produces per-restraint member lists with bounds filled in, classes
//! assigned and combination groups formed. Rows that cannot be made whole
//! (no bounds and no target, or an unresolvable dihedral target) are skipped
//! with a diagnostic; the run continues.

use super::classify::{bond_flag, distance_class, sub_class, BondFlag, DistanceClass, SubClass};
use super::records::{CombinationKey, DihedralRow, DistanceRow, RdcRow, RestraintKey};
use crate::coords::AtomKey;
use crate::diagnostics::{DiagnosticKind, DiagnosticLog};
use crate::geometry::{angle_diff, fold_360};
use std::collections::BTreeMap;

/// One normalized distance member.
#[derive(Debug, Clone)]
pub struct DistanceMember {
    pub atom1: AtomKey,
    pub atom2: AtomKey,
    pub combination: CombinationKey,
    pub class: DistanceClass,
    pub sub_class: SubClass,
    pub bond_flag: BondFlag,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub target_value: Option<f64>,
}

/// A distance restraint: all members sharing one [`RestraintKey`], in
/// insertion order.
#[derive(Debug, Clone)]
pub struct DistanceRestraint {
    pub key: RestraintKey,
    pub members: Vec<DistanceMember>,
}

/// One normalized dihedral member (a four-atom tuple).
#[derive(Debug, Clone)]
pub struct DihedralMember {
    pub atoms: [AtomKey; 4],
    pub combination: CombinationKey,
    pub angle_name: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub target_value: f64,
}

#[derive(Debug, Clone)]
pub struct DihedralRestraint {
    pub key: RestraintKey,
    pub members: Vec<DihedralMember>,
}

/// One normalized RDC member.
#[derive(Debug, Clone)]
pub struct RdcMember {
    pub atom1: AtomKey,
    pub atom2: AtomKey,
    pub combination: CombinationKey,
    pub rdc_type: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub target_value: f64,
}

#[derive(Debug, Clone)]
pub struct RdcRestraint {
    pub key: RestraintKey,
    pub members: Vec<RdcMember>,
}

fn fill_bounds(
    lower: Option<f64>,
    upper: Option<f64>,
    target: Option<f64>,
    uncertainty: Option<f64>,
) -> Option<(Option<f64>, Option<f64>, Option<f64>)> {
    if lower.is_none() && upper.is_none() {
        let target = target?;
        let delta = uncertainty.unwrap_or(0.0);
        Some((Some(target - delta), Some(target + delta), Some(target)))
    } else {
        Some((lower, upper, target))
    }
}

/// Normalize all distance rows, grouping members by restraint key.
///
/// Restraints come back in ascending `(list_id, restraint_id)` order; member
/// insertion order within a restraint follows row order.
pub fn normalize_distances(
    rows: &[DistanceRow],
    diagnostics: &mut DiagnosticLog,
) -> Vec<DistanceRestraint> {
    let mut grouped: BTreeMap<RestraintKey, Vec<DistanceMember>> = BTreeMap::new();
    for row in rows {
        let key = RestraintKey::new(row.list_id, row.restraint_id);
        let Some((lower, upper, target)) = fill_bounds(
            row.lower_bound,
            row.upper_bound,
            row.target_value,
            row.target_uncertainty,
        ) else {
            diagnostics.push_for(
                DiagnosticKind::UninterpretableRestraint,
                key,
                format!("distance restraint {key} has no bounds and no target"),
            );
            continue;
        };
        if let (Some(l), Some(u)) = (lower, upper) {
            if l > u {
                diagnostics.push_for(
                    DiagnosticKind::UninterpretableRestraint,
                    key,
                    format!("distance restraint {key} has lower bound {l} > upper bound {u}"),
                );
                continue;
            }
        }
        grouped.entry(key).or_default().push(DistanceMember {
            atom1: row.atom1.atom_key(),
            atom2: row.atom2.atom_key(),
            combination: CombinationKey::new(
                row.combination_id.unwrap_or(0),
                row.member_id.unwrap_or(0),
            ),
            class: distance_class(&row.atom1, &row.atom2),
            sub_class: sub_class(&row.atom1, &row.atom2),
            bond_flag: bond_flag(row.origin.as_deref()),
            lower_bound: lower,
            upper_bound: upper,
            target_value: target,
        });
    }
    grouped
        .into_iter()
        .map(|(key, members)| DistanceRestraint { key, members })
        .collect()
}

/// The midpoint of the bounds read anticlockwise (lower to upper), folded to
/// [0, 360). Its antipode is the clockwise mean.
fn anticlockwise_mean(lower: f64, upper: f64) -> f64 {
    fold_360((lower + upper) / 2.0)
}

/// Reconcile a missing dihedral target from its bounds and linear limits.
///
/// Two candidates are considered: the anticlockwise mean of the bounds and
/// its antipode (the clockwise mean). With linear limits present, a candidate
/// wins when the bound sits closer to it than the linear limit does (both
/// distances circular); exactly one winner decides, a tie is unresolved.
/// Without linear limits the anticlockwise mean is chosen when
/// `lower <= upper`, otherwise the clockwise mean.
fn reconcile_target(
    lower: f64,
    upper: f64,
    lower_linear: Option<f64>,
) -> std::result::Result<f64, ()> {
    let acw = anticlockwise_mean(lower, upper);
    let cw = fold_360(acw + 180.0);
    match lower_linear {
        Some(limit) => {
            let acw_vote = angle_diff(lower, acw) < angle_diff(limit, acw);
            let cw_vote = angle_diff(lower, cw) < angle_diff(limit, cw);
            match (acw_vote, cw_vote) {
                (true, false) => Ok(acw),
                (false, true) => Ok(cw),
                _ => Err(()),
            }
        }
        None => {
            if lower <= upper {
                Ok(acw)
            } else {
                Ok(cw)
            }
        }
    }
}

/// Normalize all dihedral rows.
///
/// After normalization every member carries both bounds and a target; rows
/// where that state cannot be reached are skipped with a diagnostic.
pub fn normalize_dihedrals(
    rows: &[DihedralRow],
    diagnostics: &mut DiagnosticLog,
) -> Vec<DihedralRestraint> {
    let mut grouped: BTreeMap<RestraintKey, Vec<DihedralMember>> = BTreeMap::new();
    for row in rows {
        let key = RestraintKey::new(row.list_id, row.restraint_id);

        let mut lower = row.lower_bound;
        let mut upper = row.upper_bound;
        let mut target = row.target_value;

        if lower.is_none() && upper.is_none() {
            if let (Some(ll), Some(ul)) = (row.lower_linear_limit, row.upper_linear_limit) {
                // linear limits given without bounds: promote them
                lower = Some(ll);
                upper = Some(ul);
            } else if let Some(t) = target {
                let delta = row.target_uncertainty.unwrap_or(0.0);
                lower = Some(t - delta);
                upper = Some(t + delta);
            } else {
                diagnostics.push_for(
                    DiagnosticKind::UninterpretableRestraint,
                    key,
                    format!("dihedral restraint {key} has no bounds, no limits and no target"),
                );
                continue;
            }
        }

        let (Some(lower), Some(upper)) = (lower, upper) else {
            diagnostics.push_for(
                DiagnosticKind::UninterpretableRestraint,
                key,
                format!("dihedral restraint {key} has a single bound"),
            );
            continue;
        };

        let target = match target {
            Some(t) => t,
            None => match reconcile_target(lower, upper, row.lower_linear_limit) {
                Ok(t) => t,
                Err(()) => {
                    diagnostics.push_for(
                        DiagnosticKind::AmbiguousDihedralTarget,
                        key,
                        format!(
                            "dihedral restraint {key}: clockwise and anticlockwise target \
                             votes tied"
                        ),
                    );
                    continue;
                }
            },
        };

        grouped.entry(key).or_default().push(DihedralMember {
            atoms: [
                row.atom1.atom_key(),
                row.atom2.atom_key(),
                row.atom3.atom_key(),
                row.atom4.atom_key(),
            ],
            combination: CombinationKey::new(row.combination_id.unwrap_or(0), 0),
            angle_name: row
                .angle_name
                .clone()
                .unwrap_or_else(|| "UNNAMED".to_string()),
            lower_bound: lower,
            upper_bound: upper,
            target_value: target,
        });
    }
    grouped
        .into_iter()
        .map(|(key, members)| DihedralRestraint { key, members })
        .collect()
}

/// Normalize all RDC rows.
pub fn normalize_rdcs(rows: &[RdcRow], diagnostics: &mut DiagnosticLog) -> Vec<RdcRestraint> {
    let mut grouped: BTreeMap<RestraintKey, Vec<RdcMember>> = BTreeMap::new();
    for row in rows {
        let key = RestraintKey::new(row.list_id, row.restraint_id);

        let (lower, upper) = match (row.lower_bound, row.upper_bound) {
            (Some(l), Some(u)) => (l, u),
            _ => {
                // derive from target±uncertainty, else from value±uncertainty
                let (center, delta) = if let Some(t) = row.target_value {
                    (t, row.target_uncertainty.unwrap_or(0.0))
                } else if let Some(v) = row.value {
                    (v, row.value_uncertainty.unwrap_or(0.0))
                } else {
                    diagnostics.push_for(
                        DiagnosticKind::UninterpretableRestraint,
                        key,
                        format!("RDC restraint {key} has no bounds, no target and no value"),
                    );
                    continue;
                };
                (center - delta, center + delta)
            }
        };
        let target = row.target_value.unwrap_or((lower + upper) / 2.0);

        grouped.entry(key).or_default().push(RdcMember {
            atom1: row.atom1.atom_key(),
            atom2: row.atom2.atom_key(),
            combination: CombinationKey::new(row.combination_id.unwrap_or(0), 0),
            rdc_type: row.rdc_type.clone().unwrap_or_else(|| "other".to_string()),
            lower_bound: lower,
            upper_bound: upper,
            target_value: target,
        });
    }
    grouped
        .into_iter()
        .map(|(key, members)| RdcRestraint { key, members })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restraints::records::AtomRef;

    fn aref(chain: &str, seq: i64, comp: &str, name: &str) -> AtomRef {
        AtomRef {
            chain_id: chain.to_string(),
            seq_id: seq,
            comp_id: comp.to_string(),
            atom_id: name.to_string(),
            ins_code: None,
            entity_assembly_id: None,
        }
    }

    fn distance_row(restraint_id: i64) -> DistanceRow {
        DistanceRow {
            list_id: 1,
            restraint_id,
            combination_id: None,
            member_id: None,
            atom1: aref("A", 2, "ALA", "HA"),
            atom2: aref("A", 6, "LEU", "HB2"),
            lower_bound: Some(1.8),
            upper_bound: Some(5.0),
            target_value: None,
            target_uncertainty: None,
            origin: None,
        }
    }

    fn dihedral_row(restraint_id: i64) -> DihedralRow {
        DihedralRow {
            list_id: 2,
            restraint_id,
            combination_id: None,
            atom1: aref("A", 3, "VAL", "C"),
            atom2: aref("A", 4, "ASP", "N"),
            atom3: aref("A", 4, "ASP", "CA"),
            atom4: aref("A", 4, "ASP", "C"),
            angle_name: Some("PHI".to_string()),
            lower_bound: None,
            upper_bound: None,
            lower_linear_limit: None,
            upper_linear_limit: None,
            target_value: None,
            target_uncertainty: None,
        }
    }

    #[test]
    fn test_distance_bounds_from_target() {
        let mut row = distance_row(1);
        row.lower_bound = None;
        row.upper_bound = None;
        row.target_value = Some(3.2);
        row.target_uncertainty = Some(0.4);

        let mut log = DiagnosticLog::new();
        let restraints = normalize_distances(&[row], &mut log);
        assert_eq!(restraints.len(), 1);
        let member = &restraints[0].members[0];
        assert_eq!(member.lower_bound, Some(2.8));
        assert_eq!(member.upper_bound, Some(3.6));
        assert_eq!(member.target_value, Some(3.2));
        assert!(log.is_empty());
    }

    #[test]
    fn test_distance_without_bounds_or_target_is_skipped() {
        let mut row = distance_row(1);
        row.lower_bound = None;
        row.upper_bound = None;

        let mut log = DiagnosticLog::new();
        let restraints = normalize_distances(&[row], &mut log);
        assert!(restraints.is_empty());
        assert_eq!(log.count_of(DiagnosticKind::UninterpretableRestraint), 1);
    }

    #[test]
    fn test_distance_inverted_bounds_are_uninterpretable() {
        let mut row = distance_row(1);
        row.lower_bound = Some(5.0);
        row.upper_bound = Some(2.0);

        let mut log = DiagnosticLog::new();
        let restraints = normalize_distances(&[row], &mut log);
        assert!(restraints.is_empty());
        assert_eq!(log.count_of(DiagnosticKind::UninterpretableRestraint), 1);
    }

    #[test]
    fn test_distance_restraints_sorted_and_members_ordered() {
        let mut second = distance_row(7);
        second.member_id = Some(1);
        let mut second_b = distance_row(7);
        second_b.member_id = Some(2);
        let first = distance_row(3);

        let mut log = DiagnosticLog::new();
        let restraints = normalize_distances(&[second, second_b, first], &mut log);
        assert_eq!(restraints[0].key, RestraintKey::new(1, 3));
        assert_eq!(restraints[1].key, RestraintKey::new(1, 7));
        assert_eq!(restraints[1].members[0].combination.member_id, 1);
        assert_eq!(restraints[1].members[1].combination.member_id, 2);
    }

    #[test]
    fn test_dihedral_amber_style_target_inference() {
        // L=-40, U=+40, linear limits -60/+60: the anticlockwise mean 0° wins
        let mut row = dihedral_row(1);
        row.lower_bound = Some(-40.0);
        row.upper_bound = Some(40.0);
        row.lower_linear_limit = Some(-60.0);
        row.upper_linear_limit = Some(60.0);

        let mut log = DiagnosticLog::new();
        let restraints = normalize_dihedrals(&[row], &mut log);
        assert_eq!(restraints.len(), 1);
        let member = &restraints[0].members[0];
        assert!((member.target_value - 0.0).abs() < 1e-9);
        assert!(log.is_empty());
    }

    #[test]
    fn test_dihedral_target_from_wrapped_bounds() {
        // bounds crossing the ±180° seam: anticlockwise mean is 180°
        let mut row = dihedral_row(1);
        row.lower_bound = Some(170.0);
        row.upper_bound = Some(-170.0);

        let mut log = DiagnosticLog::new();
        let restraints = normalize_dihedrals(&[row], &mut log);
        let member = &restraints[0].members[0];
        // lower > upper numerically, so the clockwise mean (the antipode of
        // the midpoint 0°) lands on the seam-crossing range center
        assert!((member.target_value - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_dihedral_plain_bounds_take_anticlockwise_mean() {
        let mut row = dihedral_row(1);
        row.lower_bound = Some(-75.0);
        row.upper_bound = Some(-35.0);

        let mut log = DiagnosticLog::new();
        let restraints = normalize_dihedrals(&[row], &mut log);
        let member = &restraints[0].members[0];
        assert!((angle_diff(member.target_value, -55.0)).abs() < 1e-9);
    }

    #[test]
    fn test_dihedral_linear_limits_promoted_when_bounds_absent() {
        let mut row = dihedral_row(1);
        row.lower_linear_limit = Some(-90.0);
        row.upper_linear_limit = Some(-30.0);

        let mut log = DiagnosticLog::new();
        let restraints = normalize_dihedrals(&[row], &mut log);
        let member = &restraints[0].members[0];
        assert_eq!(member.lower_bound, -90.0);
        assert_eq!(member.upper_bound, -30.0);
    }

    #[test]
    fn test_dihedral_tied_vote_is_skipped() {
        // limit coincides with the bound: neither candidate wins its vote
        let mut row = dihedral_row(1);
        row.lower_bound = Some(-40.0);
        row.upper_bound = Some(40.0);
        row.lower_linear_limit = Some(-40.0);
        row.upper_linear_limit = Some(40.0);

        let mut log = DiagnosticLog::new();
        let restraints = normalize_dihedrals(&[row], &mut log);
        assert!(restraints.is_empty());
        assert_eq!(log.count_of(DiagnosticKind::AmbiguousDihedralTarget), 1);
    }

    #[test]
    fn test_rdc_bounds_from_value() {
        let row = RdcRow {
            list_id: 3,
            restraint_id: 1,
            combination_id: None,
            atom1: aref("A", 5, "ALA", "N"),
            atom2: aref("A", 5, "ALA", "H"),
            rdc_type: Some("1H-15N".to_string()),
            lower_bound: None,
            upper_bound: None,
            target_value: None,
            target_uncertainty: None,
            value: Some(8.5),
            value_uncertainty: Some(1.0),
        };

        let mut log = DiagnosticLog::new();
        let restraints = normalize_rdcs(&[row], &mut log);
        let member = &restraints[0].members[0];
        assert_eq!(member.lower_bound, 7.5);
        assert_eq!(member.upper_bound, 9.5);
        assert_eq!(member.target_value, 8.5);
        assert_eq!(member.rdc_type, "1H-15N");
    }

    #[test]
    fn test_rdc_target_defaults_to_midpoint() {
        let row = RdcRow {
            list_id: 3,
            restraint_id: 2,
            combination_id: None,
            atom1: aref("A", 6, "GLY", "N"),
            atom2: aref("A", 6, "GLY", "H"),
            rdc_type: None,
            lower_bound: Some(2.0),
            upper_bound: Some(6.0),
            target_value: None,
            target_uncertainty: None,
            value: None,
            value_uncertainty: None,
        };

        let mut log = DiagnosticLog::new();
        let restraints = normalize_rdcs(&[row], &mut log);
        assert_eq!(restraints[0].members[0].target_value, 4.0);
        assert_eq!(restraints[0].members[0].rdc_type, "other");
    }
}
