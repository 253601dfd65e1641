//! Author-level atom identity.
//!
//! All restraint atom references and all coordinate lookups go through
//! [`AtomKey`]: the (chain, sequence, component, atom, insertion-code) tuple
//! as the depositing author wrote it. The insertion code is part of identity;
//! two atoms differing only in insertion code are different atoms.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity key for one atom reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AtomKey {
    pub auth_chain_id: String,
    pub auth_seq_id: i64,
    pub auth_comp_id: String,
    pub auth_atom_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ins_code: Option<String>,
}

impl AtomKey {
    pub fn new(
        chain: impl Into<String>,
        seq: i64,
        comp: impl Into<String>,
        atom: impl Into<String>,
    ) -> Self {
        AtomKey {
            auth_chain_id: chain.into(),
            auth_seq_id: seq,
            auth_comp_id: comp.into(),
            auth_atom_id: atom.into(),
            ins_code: None,
        }
    }

    pub fn with_ins_code(mut self, ins_code: impl Into<String>) -> Self {
        self.ins_code = Some(ins_code.into());
        self
    }

    /// The residue-level identity this atom belongs to.
    pub fn sequence_key(&self) -> SequenceKey {
        SequenceKey {
            auth_chain_id: self.auth_chain_id.clone(),
            auth_seq_id: self.auth_seq_id,
            auth_comp_id: self.auth_comp_id.clone(),
        }
    }
}

impl fmt::Display for AtomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}{}.{}.{}",
            self.auth_chain_id,
            self.auth_seq_id,
            self.ins_code.as_deref().unwrap_or(""),
            self.auth_comp_id,
            self.auth_atom_id
        )
    }
}

/// Coarse-grained residue identity used by the aggregation indexes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    pub auth_chain_id: String,
    pub auth_seq_id: i64,
    pub auth_comp_id: String,
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.auth_chain_id, self.auth_seq_id, self.auth_comp_id
        )
    }
}

/// One atom of one model: identity plus label-level metadata and position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomRecord {
    pub label_entity_id: Option<String>,
    pub label_chain_id: String,
    pub label_comp_id: String,
    pub label_seq_id: i64,
    pub auth_seq_id: i64,
    pub alt_id: Option<String>,
    pub ins_code: Option<String>,
    pub auth_chain_id: String,
    pub position: [f64; 3],
}
