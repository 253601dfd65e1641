//! tether-test-data
//!
//! A module to provide test files embedded in the crate for use in testing.
//! Each fixture is a `TestFile` packaging the raw bytes; `create_temp`
//! materializes it as a temporary file for programs to operate on.
use std::fs;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use tether_test_data::TestFile;
/// let (coord_file, _temp) = TestFile::ensemble_01().create_temp().unwrap();
/// let (restraint_file, _temp) = TestFile::restraints_01().create_temp().unwrap();
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// Two-model synthetic ensemble: GLY1-ALA2 ... LEU6 on chain A. The
    /// ALA2 HA / LEU6 HB2 pair sits at 3.0 Å in model 1 and 5.8 Å in
    /// model 2; HB3 stays at 2.2 Å in both.
    pub fn ensemble_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/structures/2model.pdb"),
            suffix: "pdb",
        }
    }

    /// Restraint document matching `ensemble_01`: a violated distance, an
    /// ambiguous two-member distance, a distance to a missing atom, a
    /// satisfied PHI dihedral wrapping the ±180° seam, and one RDC row.
    pub fn restraints_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/restraints/2model.json"),
            suffix: "json",
        }
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }
}
