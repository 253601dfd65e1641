//! Violation engines.
//!
//! Each engine walks its normalized restraints once per model, evaluates
//! every combination group, and returns fresh maps; inputs are never
//! mutated. Map iteration order is ascending `(list_id, restraint_id)`;
//! within a restraint the insertion order of combination groups is the
//! tie-break for best-combination selection.

mod dihedral;
mod distance;
mod rdc;

pub(crate) use self::dihedral::evaluate_dihedrals;
pub(crate) use self::distance::evaluate_distances;
pub(crate) use self::rdc::evaluate_rdcs;
pub use self::rdc::{AlignmentTensor, AlignmentTensorProvider};

use crate::coords::AtomKey;
use crate::restraints::{CombinationKey, RestraintKey};
use std::collections::{BTreeMap, BTreeSet};

/// The per-restraint, per-model output of one engine.
///
/// `errors` holds exactly one slot per model, in ascending model order:
/// `None` when the restraint was not evaluable in that model, otherwise the
/// raw error (0.0 = satisfied). Whether an error counts as a violation is
/// decided by the subtype's threshold bracket wherever violations are
/// consumed.
#[derive(Debug, Default, Clone)]
pub struct ViolationMaps {
    pub errors: BTreeMap<RestraintKey, Vec<Option<f64>>>,
    /// The combination that minimized the error, recorded for models where a
    /// violation was recorded.
    pub best_combinations: BTreeMap<RestraintKey, Vec<Option<CombinationKey>>>,
    /// Atom references that failed to resolve during evaluation.
    pub unmapped: BTreeMap<RestraintKey, BTreeSet<AtomKey>>,
}

impl ViolationMaps {
    pub(crate) fn record_unmapped(&mut self, key: RestraintKey, atom: &AtomKey) {
        self.unmapped.entry(key).or_default().insert(atom.clone());
    }
}

/// `cutoff < err < max`: the threshold bracket deciding what counts as a
/// violation for one subtype.
pub(crate) fn within_bracket(err: f64, bracket: (f64, f64)) -> bool {
    let (cutoff, max) = bracket;
    err > cutoff && err < max
}

/// Asymmetric clamping of a measured value against optional bounds.
pub(crate) fn bound_error(value: f64, lower: Option<f64>, upper: Option<f64>) -> f64 {
    match (lower, upper) {
        (Some(l), Some(u)) => {
            if value > u {
                value - u
            } else if value < l {
                l - value
            } else {
                0.0
            }
        }
        (None, Some(u)) => (value - u).max(0.0),
        (Some(l), None) => (l - value).max(0.0),
        (None, None) => 0.0,
    }
}

/// Group members by combination key, preserving first-seen order.
pub(crate) fn combination_groups<M>(
    members: &[M],
    combination_of: impl Fn(&M) -> CombinationKey,
) -> Vec<(CombinationKey, Vec<&M>)> {
    let mut groups: Vec<(CombinationKey, Vec<&M>)> = Vec::new();
    for member in members {
        let combo = combination_of(member);
        match groups.iter_mut().find(|(key, _)| *key == combo) {
            Some((_, group)) => group.push(member),
            None => groups.push((combo, vec![member])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_error_clamps_asymmetrically() {
        assert_eq!(bound_error(3.0, Some(2.0), Some(5.0)), 0.0);
        assert!((bound_error(5.8, Some(2.0), Some(5.0)) - 0.8).abs() < 1e-9);
        assert_eq!(bound_error(1.5, Some(2.0), Some(5.0)), 0.5);
        assert_eq!(bound_error(6.0, None, Some(5.0)), 1.0);
        assert_eq!(bound_error(4.0, None, Some(5.0)), 0.0);
        assert_eq!(bound_error(1.0, Some(2.0), None), 1.0);
        assert_eq!(bound_error(9.0, Some(2.0), None), 0.0);
    }

    #[test]
    fn test_within_bracket() {
        let bracket = (0.1, 100.0);
        assert!(!within_bracket(0.0, bracket));
        assert!(!within_bracket(0.1, bracket));
        assert!(within_bracket(0.11, bracket));
        assert!(!within_bracket(100.0, bracket));
    }
}
