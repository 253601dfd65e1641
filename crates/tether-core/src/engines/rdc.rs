//! RDC violation engine.
//!
//! Back-calculating a residual dipolar coupling needs an alignment tensor
//! per restraint list, which is an external collaborator. When no provider
//! is wired in the engine returns no maps and the subtype is reported as
//! unavailable. The violation-aggregation shape matches the distance and
//! dihedral engines.

use super::{bound_error, combination_groups, within_bracket, ViolationMaps};
use crate::coords::CoordinateIndex;
use crate::diagnostics::{DiagnosticKind, DiagnosticLog};
use crate::restraints::{CombinationKey, RdcRestraint};

/// A per-list alignment tensor, already scaled to Hz.
///
/// How the tensor was obtained (fixed, fitted per list, SVD) is the
/// provider's business; the engine only evaluates `bᵀ·A·b` on the unit bond
/// vector.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentTensor {
    pub saupe: [[f64; 3]; 3],
}

impl AlignmentTensor {
    /// Back-calculate the coupling for a bond vector.
    pub fn back_calculate(&self, bond: [f64; 3]) -> f64 {
        let norm = (bond[0] * bond[0] + bond[1] * bond[1] + bond[2] * bond[2]).sqrt();
        let b = [bond[0] / norm, bond[1] / norm, bond[2] / norm];
        let mut coupling = 0.0;
        for (i, row) in self.saupe.iter().enumerate() {
            for (j, element) in row.iter().enumerate() {
                coupling += b[i] * element * b[j];
            }
        }
        coupling
    }
}

/// The collaborator that supplies alignment tensors.
pub trait AlignmentTensorProvider {
    fn tensor_for(&self, list_id: i64) -> Option<AlignmentTensor>;
}

/// Evaluate RDC restraints. `None` means the subtype is unavailable.
pub(crate) fn evaluate_rdcs(
    restraints: &[RdcRestraint],
    coords: &CoordinateIndex,
    provider: Option<&dyn AlignmentTensorProvider>,
    bracket: (f64, f64),
    diagnostics: &mut DiagnosticLog,
) -> Option<ViolationMaps> {
    let Some(provider) = provider else {
        if !restraints.is_empty() {
            diagnostics.push(
                DiagnosticKind::SubtypeUnavailable,
                "no alignment tensor provider; RDC restraints not evaluated",
            );
        }
        return None;
    };

    let model_ids = coords.model_ids();
    let mut maps = ViolationMaps::default();

    for restraint in restraints {
        let tensor = provider.tensor_for(restraint.key.list_id);
        let groups = combination_groups(&restraint.members, |m| m.combination);
        let mut error_slots: Vec<Option<f64>> = Vec::with_capacity(model_ids.len());
        let mut combo_slots: Vec<Option<CombinationKey>> = Vec::with_capacity(model_ids.len());

        for &model_id in &model_ids {
            let Some(tensor) = tensor else {
                error_slots.push(None);
                combo_slots.push(None);
                continue;
            };
            let mut best: Option<(CombinationKey, f64)> = None;
            for (combo, members) in &groups {
                let mut couplings = Vec::with_capacity(members.len());
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
                    let bond = [
                        b.position[0] - a.position[0],
                        b.position[1] - a.position[1],
                        b.position[2] - a.position[2],
                    ];
                    couplings.push(tensor.back_calculate(bond));
                }
                if couplings.is_empty() {
                    continue;
                }
                let observed = couplings.iter().sum::<f64>() / couplings.len() as f64;
                let Some(bounds) = members.first() else {
                    continue;
                };
                let err = bound_error(observed, Some(bounds.lower_bound), Some(bounds.upper_bound));
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
    Some(maps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::test_utilities::index_from_atoms;
    use crate::coords::AtomKey;
    use crate::restraints::{RdcMember, RestraintKey};

    const BRACKET: (f64, f64) = (1.0, 100.0);

    struct FixedTensor(AlignmentTensor);

    impl AlignmentTensorProvider for FixedTensor {
        fn tensor_for(&self, _list_id: i64) -> Option<AlignmentTensor> {
            Some(self.0)
        }
    }

    fn nh_member() -> RdcMember {
        RdcMember {
            atom1: AtomKey::new("A", 5, "ALA", "N"),
            atom2: AtomKey::new("A", 5, "ALA", "H"),
            combination: CombinationKey::new(0, 0),
            rdc_type: "1H-15N".to_string(),
            lower_bound: 7.0,
            upper_bound: 9.0,
            target_value: 8.0,
        }
    }

    #[test]
    fn test_unavailable_without_provider() {
        let coords = index_from_atoms(vec![(
            1,
            AtomKey::new("A", 5, "ALA", "N"),
            [0.0, 0.0, 0.0],
        )]);
        let restraint = RdcRestraint {
            key: RestraintKey::new(3, 1),
            members: vec![nh_member()],
        };

        let mut log = DiagnosticLog::new();
        let maps = evaluate_rdcs(&[restraint], &coords, None, BRACKET, &mut log);
        assert!(maps.is_none());
        assert_eq!(log.count_of(DiagnosticKind::SubtypeUnavailable), 1);
    }

    #[test]
    fn test_back_calculation_against_diagonal_tensor() {
        // bond along z, diagonal tensor: coupling = A_zz = 10 Hz; bounds [7, 9]
        let tensor = AlignmentTensor {
            saupe: [[-5.0, 0.0, 0.0], [0.0, -5.0, 0.0], [0.0, 0.0, 10.0]],
        };
        let coords = index_from_atoms(vec![
            (1, AtomKey::new("A", 5, "ALA", "N"), [0.0, 0.0, 0.0]),
            (1, AtomKey::new("A", 5, "ALA", "H"), [0.0, 0.0, 1.02]),
        ]);
        let key = RestraintKey::new(3, 1);
        let restraint = RdcRestraint {
            key,
            members: vec![nh_member()],
        };

        let mut log = DiagnosticLog::new();
        let provider = FixedTensor(tensor);
        let maps =
            evaluate_rdcs(&[restraint], &coords, Some(&provider), BRACKET, &mut log).unwrap();
        let err = maps.errors[&key][0].unwrap();
        assert!((err - 1.0).abs() < 1e-9);
        assert_eq!(maps.best_combinations[&key][0], None); // err == cutoff, not past it
    }
}
