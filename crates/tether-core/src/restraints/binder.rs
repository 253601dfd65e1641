//! Sequence/atom binding.
//!
//! Builds the reverse index SequenceKey -> [RestraintKey] per subtype and
//! records atom references that resolve against no model. The forward maps
//! (the normalized restraints) own the rows; this index holds keys only.

use super::normalize::{DihedralRestraint, DistanceRestraint, RdcRestraint};
use super::records::RestraintKey;
use crate::coords::{AtomKey, CoordinateIndex, SequenceKey};
use crate::diagnostics::{DiagnosticKind, DiagnosticLog};
use std::collections::{BTreeMap, BTreeSet};

/// Residue-level index over one restraint subtype.
#[derive(Debug, Default, Clone)]
pub struct SequenceIndex {
    by_sequence: BTreeMap<SequenceKey, Vec<RestraintKey>>,
    /// Restraint keys with atom references that resolve in no model, and the
    /// offending references.
    pub unmapped: BTreeMap<RestraintKey, BTreeSet<AtomKey>>,
}

impl SequenceIndex {
    pub fn restraints_for(&self, sequence: &SequenceKey) -> &[RestraintKey] {
        self.by_sequence
            .get(sequence)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn sequences(&self) -> impl Iterator<Item = &SequenceKey> {
        self.by_sequence.keys()
    }

    fn bind_atom(
        &mut self,
        key: RestraintKey,
        atom: &AtomKey,
        coords: &CoordinateIndex,
        diagnostics: &mut DiagnosticLog,
    ) {
        let entry = self.by_sequence.entry(atom.sequence_key()).or_default();
        if entry.last() != Some(&key) {
            entry.push(key);
        }
        if !coords.resolves_anywhere(atom) {
            let newly_recorded = self.unmapped.entry(key).or_default().insert(atom.clone());
            if newly_recorded {
                diagnostics.push_for(
                    DiagnosticKind::UnresolvedAtomReference,
                    key,
                    format!("atom {atom} of restraint {key} resolves in no model"),
                );
            }
        }
    }
}

/// Bind distance restraints to the coordinate index.
pub fn bind_distances(
    restraints: &[DistanceRestraint],
    coords: &CoordinateIndex,
    diagnostics: &mut DiagnosticLog,
) -> SequenceIndex {
    let mut index = SequenceIndex::default();
    for restraint in restraints {
        for member in &restraint.members {
            index.bind_atom(restraint.key, &member.atom1, coords, diagnostics);
            index.bind_atom(restraint.key, &member.atom2, coords, diagnostics);
        }
    }
    index
}

/// Bind dihedral restraints to the coordinate index.
pub fn bind_dihedrals(
    restraints: &[DihedralRestraint],
    coords: &CoordinateIndex,
    diagnostics: &mut DiagnosticLog,
) -> SequenceIndex {
    let mut index = SequenceIndex::default();
    for restraint in restraints {
        for member in &restraint.members {
            for atom in &member.atoms {
                index.bind_atom(restraint.key, atom, coords, diagnostics);
            }
        }
    }
    index
}

/// Bind RDC restraints to the coordinate index.
pub fn bind_rdcs(
    restraints: &[RdcRestraint],
    coords: &CoordinateIndex,
    diagnostics: &mut DiagnosticLog,
) -> SequenceIndex {
    let mut index = SequenceIndex::default();
    for restraint in restraints {
        for member in &restraint.members {
            index.bind_atom(restraint.key, &member.atom1, coords, diagnostics);
            index.bind_atom(restraint.key, &member.atom2, coords, diagnostics);
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::test_utilities::index_from_atoms;
    use crate::restraints::records::{AtomRef, DistanceRow};
    use crate::restraints::normalize::normalize_distances;

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

    #[test]
    fn test_bind_records_sequences_and_unmapped() {
        let rows = vec![DistanceRow {
            list_id: 1,
            restraint_id: 1,
            combination_id: None,
            member_id: None,
            atom1: aref("A", 2, "ALA", "HA"),
            atom2: aref("A", 9, "LEU", "HB2"),
            lower_bound: Some(1.8),
            upper_bound: Some(5.0),
            target_value: None,
            target_uncertainty: None,
            origin: None,
        }];
        let mut log = DiagnosticLog::new();
        let restraints = normalize_distances(&rows, &mut log);

        // only atom1 exists in the ensemble
        let coords = index_from_atoms(vec![(
            1,
            AtomKey::new("A", 2, "ALA", "HA"),
            [0.0, 0.0, 0.0],
        )]);

        let index = bind_distances(&restraints, &coords, &mut log);
        let key = RestraintKey::new(1, 1);

        let seq_a2 = AtomKey::new("A", 2, "ALA", "HA").sequence_key();
        let seq_a9 = AtomKey::new("A", 9, "LEU", "HB2").sequence_key();
        assert_eq!(index.restraints_for(&seq_a2), &[key]);
        assert_eq!(index.restraints_for(&seq_a9), &[key]);

        let unmapped = index.unmapped.get(&key).unwrap();
        assert_eq!(unmapped.len(), 1);
        assert!(unmapped.contains(&AtomKey::new("A", 9, "LEU", "HB2")));
        assert_eq!(log.count_of(DiagnosticKind::UnresolvedAtomReference), 1);
    }
}
