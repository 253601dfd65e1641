//! Single-pass aggregation of violation maps into report sections.
//!
//! One walk over each subtype's error map produces every section of the
//! report. All ordering is deterministic: restraints ascend by
//! `(list_id, restraint_id)`, the most-violated table descends by
//! (#violated models, mean error), the flat violation table descends by
//! (error, list id).

use super::model::{
    DistanceBuckets, DistanceSection, MostViolatedRow, NamedSection, ResidualBin, SeqViolationRow,
    UnmappedEntry, ViolationRow,
};
use crate::coords::AtomKey;
use crate::engines::ViolationMaps;
use crate::restraints::{
    CombinationKey, DihedralRestraint, DistanceRestraint, RdcRestraint, RestraintKey,
};
use itertools::Itertools;
use std::collections::BTreeMap;

/// The aggregator's view of one restraint: a label path and the atoms of
/// each combination group, in insertion order.
struct RestraintView {
    key: RestraintKey,
    /// `[class, subclass, bond flag]` for distance, `[name]` otherwise.
    label: Vec<String>,
    combos: Vec<(CombinationKey, Vec<AtomKey>)>,
}

fn combo_atoms<M>(
    members: &[M],
    combination_of: impl Fn(&M) -> CombinationKey,
    atoms_of: impl Fn(&M) -> Vec<AtomKey>,
) -> Vec<(CombinationKey, Vec<AtomKey>)> {
    let mut combos: Vec<(CombinationKey, Vec<AtomKey>)> = Vec::new();
    for member in members {
        let combo = combination_of(member);
        let atoms = atoms_of(member);
        match combos.iter_mut().find(|(key, _)| *key == combo) {
            Some((_, existing)) => existing.extend(atoms),
            None => combos.push((combo, atoms)),
        }
    }
    combos
}

struct BinAccumulator {
    label: String,
    upper: Option<f64>,
    min_error: Option<f64>,
    max_error: Option<f64>,
    count: usize,
}

/// The label-path-generic accumulation state.
#[derive(Default)]
struct CoreAggregate {
    summary: BTreeMap<Vec<String>, usize>,
    violation: BTreeMap<Vec<String>, usize>,
    consistent_violation: BTreeMap<Vec<String>, usize>,
    violations_vs_models: BTreeMap<Vec<String>, Vec<usize>>,
    violations_in_models: BTreeMap<usize, BTreeMap<Vec<String>, Vec<f64>>>,
    bins: Vec<BinAccumulator>,
    most_violated: Vec<MostViolatedRow>,
    all_violations: Vec<ViolationRow>,
    violation_seq: BTreeMap<String, BTreeMap<usize, Vec<SeqViolationRow>>>,
    unmapped: Vec<UnmappedEntry>,
}

fn make_bins(bounds: &[f64]) -> Vec<BinAccumulator> {
    let mut bins = Vec::with_capacity(bounds.len());
    for window in bounds.windows(2) {
        bins.push(BinAccumulator {
            label: format!("{}-{}", window[0], window[1]),
            upper: Some(window[1]),
            min_error: None,
            max_error: None,
            count: 0,
        });
    }
    bins.push(BinAccumulator {
        label: format!(">{}", bounds.last().copied().unwrap_or(0.0)),
        upper: None,
        min_error: None,
        max_error: None,
        count: 0,
    });
    bins
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

fn median(values: &[f64]) -> f64 {
    let sorted: Vec<f64> = values.iter().copied().sorted_by(f64::total_cmp).collect();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

fn aggregate_core(
    views: &[RestraintView],
    maps: &ViolationMaps,
    model_ids: &[usize],
    bracket: (f64, f64),
    bin_bounds: &[f64],
) -> CoreAggregate {
    let model_count = model_ids.len();
    let mut agg = CoreAggregate {
        bins: make_bins(bin_bounds),
        ..Default::default()
    };
    let (cutoff, max_error) = bracket;

    for view in views {
        let slots = match maps.errors.get(&view.key) {
            Some(slots) => slots,
            None => continue,
        };
        let combos = maps.best_combinations.get(&view.key);

        *agg.summary.entry(view.label.clone()).or_default() += 1;

        // (model index, error) of every violated model
        let violated: Vec<(usize, f64)> = slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.filter(|e| *e > cutoff && *e < max_error)
                    .map(|e| (idx, e))
            })
            .collect();

        if !violated.is_empty() {
            *agg.violation.entry(view.label.clone()).or_default() += 1;
        }
        if violated.len() == model_count {
            *agg.consistent_violation.entry(view.label.clone()).or_default() += 1;
        }
        agg.violations_vs_models
            .entry(view.label.clone())
            .or_insert_with(|| vec![0; model_count + 1])[violated.len()] += 1;

        // per-combination witness groups for the most-violated table
        let mut witnessed: Vec<(CombinationKey, Vec<usize>, Vec<f64>)> = Vec::new();

        for &(idx, error) in &violated {
            let model_id = model_ids[idx];

            agg.violations_in_models
                .entry(model_id)
                .or_default()
                .entry(view.label.clone())
                .or_default()
                .push(error);

            if let Some(bin) = agg
                .bins
                .iter_mut()
                .find(|b| b.upper.map(|u| error <= u).unwrap_or(true))
            {
                bin.count += 1;
                bin.min_error = Some(bin.min_error.map_or(error, |m| m.min(error)));
                bin.max_error = Some(bin.max_error.map_or(error, |m| m.max(error)));
            }

            agg.all_violations.push(ViolationRow {
                list_id: view.key.list_id,
                restraint_id: view.key.restraint_id,
                model_id,
                error,
                class: view.label[0].clone(),
                sub_class: view.label.get(1).cloned(),
                bond_flag: view.label.get(2).cloned(),
            });

            let witness = combos.and_then(|slots| slots[idx]);
            if let Some(combo) = witness {
                match witnessed.iter_mut().find(|(key, _, _)| *key == combo) {
                    Some((_, models, errors)) => {
                        models.push(model_id);
                        errors.push(error);
                    }
                    None => witnessed.push((combo, vec![model_id], vec![error])),
                }

                if let Some((_, atoms)) = view.combos.iter().find(|(key, _)| *key == combo) {
                    let mut by_residue: BTreeMap<String, Vec<String>> = BTreeMap::new();
                    for atom in atoms {
                        by_residue
                            .entry(atom.sequence_key().to_string())
                            .or_default()
                            .push(atom.to_string());
                    }
                    for (sequence, residue_atoms) in by_residue {
                        agg.violation_seq
                            .entry(sequence)
                            .or_default()
                            .entry(model_id)
                            .or_default()
                            .push(SeqViolationRow {
                                list_id: view.key.list_id,
                                restraint_id: view.key.restraint_id,
                                atoms: residue_atoms,
                                error,
                            });
                    }
                }
            }
        }

        for (combo, models, errors) in witnessed {
            let atoms = view
                .combos
                .iter()
                .find(|(key, _)| *key == combo)
                .map(|(_, atoms)| atoms.iter().map(|a| a.to_string()).collect())
                .unwrap_or_default();
            agg.most_violated.push(MostViolatedRow {
                list_id: view.key.list_id,
                restraint_id: view.key.restraint_id,
                combination_id: combo.combination_id,
                member_id: combo.member_id,
                atoms,
                class: view.label[0].clone(),
                sub_class: view.label.get(1).cloned(),
                bond_flag: view.label.get(2).cloned(),
                violated_model_count: models.len(),
                violated_models: models,
                min_error: errors.iter().copied().fold(f64::INFINITY, f64::min),
                max_error: errors.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                mean_error: mean(&errors),
                stdev_error: stdev(&errors),
                median_error: median(&errors),
            });
        }
    }

    agg.most_violated.sort_by(|a, b| {
        b.violated_model_count
            .cmp(&a.violated_model_count)
            .then(b.mean_error.total_cmp(&a.mean_error))
            .then(a.list_id.cmp(&b.list_id))
            .then(a.restraint_id.cmp(&b.restraint_id))
            .then(a.combination_id.cmp(&b.combination_id))
            .then(a.member_id.cmp(&b.member_id))
    });
    agg.all_violations.sort_by(|a, b| {
        b.error
            .total_cmp(&a.error)
            .then(b.list_id.cmp(&a.list_id))
            .then(b.restraint_id.cmp(&a.restraint_id))
            .then(b.model_id.cmp(&a.model_id))
    });

    agg.unmapped = maps
        .unmapped
        .iter()
        .map(|(key, atoms)| UnmappedEntry {
            list_id: key.list_id,
            restraint_id: key.restraint_id,
            atoms: atoms.iter().map(|a| a.to_string()).collect(),
        })
        .collect();

    agg
}

fn finish_bins(bins: Vec<BinAccumulator>, model_count: usize) -> Vec<ResidualBin> {
    bins.into_iter()
        .map(|bin| ResidualBin {
            label: bin.label,
            min_error: bin.min_error,
            max_error: bin.max_error,
            count: bin.count,
            per_model_mean: bin.count as f64 / model_count.max(1) as f64,
        })
        .collect()
}

fn nest3<T>(flat: BTreeMap<Vec<String>, T>) -> DistanceBuckets<T> {
    let mut nested: DistanceBuckets<T> = BTreeMap::new();
    for (label, value) in flat {
        nested
            .entry(label[0].clone())
            .or_default()
            .entry(label[1].clone())
            .or_default()
            .insert(label[2].clone(), value);
    }
    nested
}

fn flatten1<T>(flat: BTreeMap<Vec<String>, T>) -> BTreeMap<String, T> {
    flat.into_iter()
        .map(|(label, value)| (label[0].clone(), value))
        .collect()
}

fn distance_views(restraints: &[DistanceRestraint]) -> Vec<RestraintView> {
    restraints
        .iter()
        .map(|restraint| {
            let first = &restraint.members[0];
            RestraintView {
                key: restraint.key,
                label: vec![
                    first.class.to_string(),
                    first.sub_class.to_string(),
                    first.bond_flag.to_string(),
                ],
                combos: combo_atoms(
                    &restraint.members,
                    |m| m.combination,
                    |m| vec![m.atom1.clone(), m.atom2.clone()],
                ),
            }
        })
        .collect()
}

fn dihedral_views(restraints: &[DihedralRestraint]) -> Vec<RestraintView> {
    restraints
        .iter()
        .map(|restraint| RestraintView {
            key: restraint.key,
            label: vec![restraint.members[0].angle_name.clone()],
            combos: combo_atoms(
                &restraint.members,
                |m| m.combination,
                |m| m.atoms.to_vec(),
            ),
        })
        .collect()
}

fn rdc_views(restraints: &[RdcRestraint]) -> Vec<RestraintView> {
    restraints
        .iter()
        .map(|restraint| RestraintView {
            key: restraint.key,
            label: vec![restraint.members[0].rdc_type.clone()],
            combos: combo_atoms(
                &restraint.members,
                |m| m.combination,
                |m| vec![m.atom1.clone(), m.atom2.clone()],
            ),
        })
        .collect()
}

pub(crate) fn aggregate_distance(
    restraints: &[DistanceRestraint],
    maps: &ViolationMaps,
    model_ids: &[usize],
    bracket: (f64, f64),
    bin_bounds: &[f64],
) -> DistanceSection {
    let views = distance_views(restraints);
    let agg = aggregate_core(&views, maps, model_ids, bracket, bin_bounds);
    DistanceSection {
        ok: true,
        summary: nest3(agg.summary),
        violation: nest3(agg.violation),
        consistent_violation: nest3(agg.consistent_violation),
        violations_vs_models: nest3(agg.violations_vs_models),
        violations_in_models: agg
            .violations_in_models
            .into_iter()
            .map(|(model, buckets)| (model, nest3(buckets)))
            .collect(),
        residual_violations: finish_bins(agg.bins, model_ids.len()),
        most_violated: agg.most_violated,
        all_violations: agg.all_violations,
        violation_seq: agg.violation_seq,
        unmapped: agg.unmapped,
    }
}

fn named_section(agg: CoreAggregate, model_count: usize) -> NamedSection {
    NamedSection {
        ok: true,
        summary: flatten1(agg.summary),
        violation: flatten1(agg.violation),
        consistent_violation: flatten1(agg.consistent_violation),
        violations_vs_models: flatten1(agg.violations_vs_models),
        violations_in_models: agg
            .violations_in_models
            .into_iter()
            .map(|(model, buckets)| (model, flatten1(buckets)))
            .collect(),
        residual_violations: finish_bins(agg.bins, model_count),
        most_violated: agg.most_violated,
        all_violations: agg.all_violations,
        violation_seq: agg.violation_seq,
        unmapped: agg.unmapped,
    }
}

pub(crate) fn aggregate_dihedral(
    restraints: &[DihedralRestraint],
    maps: &ViolationMaps,
    model_ids: &[usize],
    bracket: (f64, f64),
    bin_bounds: &[f64],
) -> NamedSection {
    let views = dihedral_views(restraints);
    let agg = aggregate_core(&views, maps, model_ids, bracket, bin_bounds);
    named_section(agg, model_ids.len())
}

pub(crate) fn aggregate_rdc(
    restraints: &[RdcRestraint],
    maps: &ViolationMaps,
    model_ids: &[usize],
    bracket: (f64, f64),
    bin_bounds: &[f64],
) -> NamedSection {
    let views = rdc_views(restraints);
    let agg = aggregate_core(&views, maps, model_ids, bracket, bin_bounds);
    named_section(agg, model_ids.len())
}

/// Summary-only section for a subtype that could not be evaluated.
pub(crate) fn rdc_summary_only(restraints: &[RdcRestraint]) -> NamedSection {
    let mut section = NamedSection::default();
    for restraint in restraints {
        *section
            .summary
            .entry(restraint.members[0].rdc_type.clone())
            .or_default() += 1;
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restraints::{BondFlag, DistanceClass, DistanceMember, SubClass};
    use std::collections::BTreeSet;

    fn member(seq2: i64, combination: CombinationKey) -> DistanceMember {
        DistanceMember {
            atom1: AtomKey::new("A", 1, "ALA", "HA"),
            atom2: AtomKey::new("A", seq2, "LEU", "HB2"),
            combination,
            class: DistanceClass::Long,
            sub_class: SubClass::SidechainSidechain,
            bond_flag: BondFlag::None,
            lower_bound: Some(1.8),
            upper_bound: Some(5.0),
            target_value: None,
        }
    }

    fn restraint(list_id: i64, restraint_id: i64) -> DistanceRestraint {
        DistanceRestraint {
            key: RestraintKey::new(list_id, restraint_id),
            members: vec![member(9, CombinationKey::new(0, 0))],
        }
    }

    fn maps_for(entries: Vec<(RestraintKey, Vec<Option<f64>>)>) -> ViolationMaps {
        let mut maps = ViolationMaps::default();
        for (key, slots) in entries {
            let combos = slots
                .iter()
                .map(|slot| {
                    slot.filter(|e| *e > 0.1 && *e < 100.0)
                        .map(|_| CombinationKey::new(0, 0))
                })
                .collect();
            maps.errors.insert(key, slots);
            maps.best_combinations.insert(key, combos);
        }
        maps
    }

    const BRACKET: (f64, f64) = (0.1, 100.0);
    const BINS: [f64; 3] = [0.1, 0.2, 0.5];

    #[test]
    fn test_counts_and_bins() {
        // r1 satisfied everywhere; r2 violated in model 2; r3 violated in both
        let r1 = restraint(1, 1);
        let r2 = restraint(1, 2);
        let r3 = restraint(1, 3);
        let maps = maps_for(vec![
            (r1.key, vec![Some(0.0), Some(0.0)]),
            (r2.key, vec![Some(0.0), Some(0.8)]),
            (r3.key, vec![Some(0.15), Some(0.3)]),
        ]);

        let section = aggregate_distance(
            &[r1, r2, r3],
            &maps,
            &[1, 2],
            BRACKET,
            &BINS,
        );

        let bucket = &section.summary["long"]["sc-sc"]["none"];
        assert_eq!(*bucket, 3);
        assert_eq!(section.violation["long"]["sc-sc"]["none"], 2);
        assert_eq!(section.consistent_violation["long"]["sc-sc"]["none"], 1);

        // k-histogram: one restraint in k=0, one in k=1, one in k=2
        let vs = &section.violations_vs_models["long"]["sc-sc"]["none"];
        assert_eq!(vs, &vec![1, 1, 1]);
        // the k-histogram partitions the summary count
        assert_eq!(vs.iter().sum::<usize>(), 3);

        // residual bins: 0.15 in 0.1-0.2; 0.3 in 0.2-0.5; 0.8 in >0.5
        assert_eq!(section.residual_violations[0].count, 1);
        assert_eq!(section.residual_violations[1].count, 1);
        assert_eq!(section.residual_violations[2].count, 1);
        assert_eq!(section.residual_violations[2].label, ">0.5");
        assert_eq!(section.residual_violations[2].min_error, Some(0.8));
        assert_eq!(section.residual_violations[0].per_model_mean, 0.5);

        // per-model error lists
        assert_eq!(
            section.violations_in_models[&2]["long"]["sc-sc"]["none"],
            vec![0.8, 0.3]
        );
    }

    #[test]
    fn test_most_violated_ordering() {
        let r1 = restraint(1, 1); // violated once, large error
        let r2 = restraint(1, 2); // violated twice, small errors
        let r3 = restraint(2, 1); // violated twice, larger mean
        let maps = maps_for(vec![
            (r1.key, vec![Some(5.0), Some(0.0)]),
            (r2.key, vec![Some(0.2), Some(0.3)]),
            (r3.key, vec![Some(0.4), Some(0.6)]),
        ]);

        let section = aggregate_distance(
            &[r1, r2, r3],
            &maps,
            &[1, 2],
            BRACKET,
            &BINS,
        );

        let order: Vec<(i64, i64)> = section
            .most_violated
            .iter()
            .map(|row| (row.list_id, row.restraint_id))
            .collect();
        // two-model rows first, higher mean first, then the single-model row
        assert_eq!(order, vec![(2, 1), (1, 2), (1, 1)]);

        let top = &section.most_violated[0];
        assert_eq!(top.violated_model_count, 2);
        assert_eq!(top.violated_models, vec![1, 2]);
        assert!((top.mean_error - 0.5).abs() < 1e-9);
        assert!((top.median_error - 0.5).abs() < 1e-9);
        assert!((top.min_error - 0.4).abs() < 1e-9);
        assert!((top.max_error - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_all_violations_sorted_by_error_descending() {
        let r1 = restraint(1, 1);
        let r2 = restraint(1, 2);
        let maps = maps_for(vec![
            (r1.key, vec![Some(0.2), Some(0.9)]),
            (r2.key, vec![Some(0.5), Some(0.0)]),
        ]);

        let section = aggregate_distance(&[r1, r2], &maps, &[1, 2], BRACKET, &BINS);
        let errors: Vec<f64> = section.all_violations.iter().map(|r| r.error).collect();
        assert_eq!(errors, vec![0.9, 0.5, 0.2]);
    }

    #[test]
    fn test_violation_seq_keyed_by_residue_and_model() {
        let r1 = restraint(1, 1);
        let maps = maps_for(vec![(r1.key, vec![Some(0.0), Some(0.8)])]);

        let section = aggregate_distance(&[r1], &maps, &[1, 2], BRACKET, &BINS);
        let rows = &section.violation_seq["A.1.ALA"][&2];
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].atoms, vec!["A.1.ALA.HA".to_string()]);
        assert!(section.violation_seq["A.9.LEU"].contains_key(&2));
    }

    #[test]
    fn test_unmapped_rows() {
        let r1 = restraint(1, 1);
        let mut maps = maps_for(vec![(r1.key, vec![None, None])]);
        maps.unmapped.insert(
            r1.key,
            BTreeSet::from([AtomKey::new("A", 9, "LEU", "HB2")]),
        );

        let section = aggregate_distance(&[r1], &maps, &[1, 2], BRACKET, &BINS);
        assert_eq!(section.unmapped.len(), 1);
        assert_eq!(section.unmapped[0].atoms, vec!["A.9.LEU.HB2".to_string()]);
        // no violations recorded anywhere
        assert!(section.all_violations.is_empty());
        assert_eq!(section.violations_vs_models["long"]["sc-sc"]["none"][0], 1);
    }
}
