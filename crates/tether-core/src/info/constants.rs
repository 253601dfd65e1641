//! # Constants
//!
//! Residue and atom nomenclature tables shared by the coordinate index and
//! the restraint classifier.
//!
//! ## Residue Types
//!
//! - `is_amino_acid()` - Check if a residue is a standard amino acid
//! - `is_nucleotide()` - Check if a residue is a standard nucleotide
//! - `is_polymer_residue()` - Either of the above
//!
//! ## Atom Nomenclature
//!
//! - `is_backbone_atom()` - Check whether an atom name belongs to the
//!   polymer backbone of its residue type

use std::collections::HashSet;
use std::sync::OnceLock;

static AMINO_ACIDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
static NUCLEOTIDES: OnceLock<HashSet<&'static str>> = OnceLock::new();
static AA_BACKBONE: OnceLock<HashSet<&'static str>> = OnceLock::new();
static NA_BACKBONE: OnceLock<HashSet<&'static str>> = OnceLock::new();

pub(crate) fn is_amino_acid(res_name: &str) -> bool {
    AMINO_ACIDS
        .get_or_init(|| {
            HashSet::from([
                "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE", "LEU",
                "LYS", "MET", "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL", "MSE", "SEC",
                "PYL",
            ])
        })
        .contains(res_name)
}

pub(crate) fn is_nucleotide(res_name: &str) -> bool {
    NUCLEOTIDES
        .get_or_init(|| {
            HashSet::from([
                "A", "C", "G", "U", "I", "DA", "DC", "DG", "DT", "DU", "DI",
            ])
        })
        .contains(res_name)
}

pub(crate) fn is_polymer_residue(res_name: &str) -> bool {
    is_amino_acid(res_name) || is_nucleotide(res_name)
}

/// Whether `atom_name` is a backbone atom of residue `res_name`.
///
/// Protein backbone covers N/CA/C/O plus their protons; nucleic acid backbone
/// covers the phosphate and sugar atoms. Unknown residue types fall back to
/// the protein set.
pub(crate) fn is_backbone_atom(res_name: &str, atom_name: &str) -> bool {
    if is_nucleotide(res_name) {
        NA_BACKBONE
            .get_or_init(|| {
                HashSet::from([
                    "P", "OP1", "OP2", "OP3", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'", "C2'",
                    "O2'", "C1'", "H5'", "H5''", "H4'", "H3'", "H2'", "H2''", "H1'", "HO2'",
                    "HO3'", "HO5'",
                ])
            })
            .contains(atom_name)
    } else {
        AA_BACKBONE
            .get_or_init(|| {
                HashSet::from([
                    "N", "CA", "C", "O", "OXT", "H", "H1", "H2", "H3", "HA", "HA2", "HA3",
                ])
            })
            .contains(atom_name)
    }
}
