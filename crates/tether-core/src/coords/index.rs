//! Per-model atom lookup.
//!
//! The index walks the pdbtbx hierarchy once per model
//! (PDB --> Model --> Chain --> Residue --> Conformer --> Atom), keeps the
//! `'A'` / unspecified alternate locations, and keys every atom by its
//! author-level [`AtomKey`]. After construction the index is read-only and
//! shared by all engines.

use super::keys::{AtomKey, AtomRecord};
use crate::config::ValidationConfig;
use crate::error::{Result, TetherError};
use crate::info::constants::is_polymer_residue;
use std::collections::{BTreeMap, HashMap};

pub struct CoordinateIndex {
    models: BTreeMap<usize, HashMap<AtomKey, AtomRecord>>,
}

impl CoordinateIndex {
    /// Build the index from a parsed ensemble.
    ///
    /// When the polymer chain count of the first model reaches the configured
    /// large-assembly threshold and an allowlist is present, atom intake is
    /// restricted to the allowlisted chain ids to cap memory.
    pub fn from_pdb(pdb: &pdbtbx::PDB, config: &ValidationConfig) -> Result<Self> {
        let restrict_chains = Self::engage_chain_guard(pdb, config);
        if restrict_chains {
            log::info!(
                "large assembly: restricting atom intake to {} allowlisted chains",
                config
                    .large_assembly_chain_allowlist
                    .as_ref()
                    .map(|set| set.len())
                    .unwrap_or(0)
            );
        }

        let mut models: BTreeMap<usize, HashMap<AtomKey, AtomRecord>> = BTreeMap::new();
        for model in pdb.models() {
            let mut atoms: HashMap<AtomKey, AtomRecord> = HashMap::new();
            for chain in model.chains() {
                let chain_id = chain.id().to_string();
                if restrict_chains {
                    let allowed = config
                        .large_assembly_chain_allowlist
                        .as_ref()
                        .map(|set| set.contains(&chain_id))
                        .unwrap_or(true);
                    if !allowed {
                        continue;
                    }
                }
                for residue in chain.residues() {
                    let (seq_id, ins_code) = residue.id();
                    for conformer in residue.conformers() {
                        let alt_id = conformer.alternative_location();
                        if !matches!(alt_id, None | Some("A")) {
                            continue;
                        }
                        let comp_id = conformer.name().to_string();
                        for atom in conformer.atoms() {
                            let key = AtomKey {
                                auth_chain_id: chain_id.clone(),
                                auth_seq_id: seq_id as i64,
                                auth_comp_id: comp_id.clone(),
                                auth_atom_id: atom.name().to_string(),
                                ins_code: ins_code.map(str::to_string),
                            };
                            let (x, y, z) = atom.pos();
                            let record = AtomRecord {
                                label_entity_id: None,
                                label_chain_id: chain_id.clone(),
                                label_comp_id: comp_id.clone(),
                                label_seq_id: seq_id as i64,
                                auth_seq_id: seq_id as i64,
                                alt_id: alt_id.map(str::to_string),
                                ins_code: ins_code.map(str::to_string),
                                auth_chain_id: chain_id.clone(),
                                position: [x, y, z],
                            };
                            atoms.insert(key, record);
                        }
                    }
                }
            }
            if atoms.is_empty() {
                return Err(TetherError::InputUnavailable(format!(
                    "model {} contains no atom sites",
                    model.serial_number()
                )));
            }
            models.insert(model.serial_number(), atoms);
        }

        if models.is_empty() {
            return Err(TetherError::InputUnavailable(
                "coordinate source contains no models".to_string(),
            ));
        }
        Ok(CoordinateIndex { models })
    }

    fn engage_chain_guard(pdb: &pdbtbx::PDB, config: &ValidationConfig) -> bool {
        if config.large_assembly_chain_allowlist.is_none() {
            return false;
        }
        // polymer chains are counted on the representative model
        let polymer_chains = pdb
            .models()
            .find(|model| model.serial_number() == config.representative_model_id)
            .or_else(|| pdb.models().next())
            .map(|model| {
                model
                    .chains()
                    .filter(|chain| {
                        chain
                            .residues()
                            .any(|res| is_polymer_residue(res.name().unwrap_or_default()))
                    })
                    .count()
            })
            .unwrap_or(0);
        polymer_chains >= config.large_assembly_chain_threshold
    }

    /// Model ids in ascending order.
    pub fn model_ids(&self) -> Vec<usize> {
        self.models.keys().copied().collect()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Amortized O(1) per-model atom lookup.
    pub fn lookup(&self, model_id: usize, key: &AtomKey) -> Option<&AtomRecord> {
        self.models.get(&model_id).and_then(|atoms| atoms.get(key))
    }

    /// Whether the key resolves in at least one model.
    pub fn resolves_anywhere(&self, key: &AtomKey) -> bool {
        self.models.values().any(|atoms| atoms.contains_key(key))
    }

    pub fn atom_count(&self, model_id: usize) -> usize {
        self.models.get(&model_id).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
pub(crate) mod test_utilities {
    use super::*;

    /// Assemble an index directly from (model, key, position) triples.
    pub(crate) fn index_from_atoms(
        atoms: Vec<(usize, AtomKey, [f64; 3])>,
    ) -> CoordinateIndex {
        let mut models: BTreeMap<usize, HashMap<AtomKey, AtomRecord>> = BTreeMap::new();
        for (model_id, key, position) in atoms {
            let record = AtomRecord {
                label_entity_id: None,
                label_chain_id: key.auth_chain_id.clone(),
                label_comp_id: key.auth_comp_id.clone(),
                label_seq_id: key.auth_seq_id,
                auth_seq_id: key.auth_seq_id,
                alt_id: None,
                ins_code: key.ins_code.clone(),
                auth_chain_id: key.auth_chain_id.clone(),
                position,
            };
            models.entry(model_id).or_default().insert(key, record);
        }
        CoordinateIndex { models }
    }
}

#[cfg(test)]
mod tests {
    use super::test_utilities::index_from_atoms;
    use super::*;

    #[test]
    fn test_lookup_and_model_ids() {
        let ca = AtomKey::new("A", 1, "ALA", "CA");
        let index = index_from_atoms(vec![
            (1, ca.clone(), [0.0, 0.0, 0.0]),
            (2, ca.clone(), [1.0, 0.0, 0.0]),
        ]);

        assert_eq!(index.model_ids(), vec![1, 2]);
        assert_eq!(index.model_count(), 2);
        assert!(index.lookup(1, &ca).is_some());
        assert_eq!(index.lookup(2, &ca).unwrap().position, [1.0, 0.0, 0.0]);
        assert!(index.lookup(3, &ca).is_none());
        assert!(index.resolves_anywhere(&ca));
        assert!(!index.resolves_anywhere(&AtomKey::new("A", 2, "GLY", "CA")));
    }

    #[test]
    fn test_insertion_code_is_identity() {
        let plain = AtomKey::new("A", 52, "SER", "OG");
        let inserted = AtomKey::new("A", 52, "SER", "OG").with_ins_code("B");
        let index = index_from_atoms(vec![(1, plain.clone(), [0.0, 0.0, 0.0])]);

        assert!(index.lookup(1, &plain).is_some());
        assert!(index.lookup(1, &inserted).is_none());
    }
}
