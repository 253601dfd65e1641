use assert_cmd::Command;
use tether_test_data::TestFile;

#[test]
fn test_validate_command_writes_report() {
    let (coord_path, _coord_tmp) = TestFile::ensemble_01().create_temp().unwrap();
    let (restraint_path, _restraint_tmp) = TestFile::restraints_01().create_temp().unwrap();
    let output = tempfile::Builder::new().suffix(".json").tempfile().unwrap();

    let mut cmd = Command::cargo_bin("tether").unwrap();
    cmd.arg("validate")
        .arg("--coordinates")
        .arg(&coord_path)
        .arg("--restraints")
        .arg(&restraint_path)
        .arg("--output")
        .arg(output.path());

    cmd.assert().success();

    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(output.path()).unwrap()).unwrap();
    assert_eq!(report["model_count"], 2);
    assert_eq!(report["distance"]["summary"]["medium"]["bb-sc"]["none"], 3);
    assert!(report["generated"].is_string());
}

#[test]
fn test_validate_command_fails_without_coordinates() {
    let (restraint_path, _restraint_tmp) = TestFile::restraints_01().create_temp().unwrap();

    let mut cmd = Command::cargo_bin("tether").unwrap();
    cmd.arg("validate")
        .arg("--coordinates")
        .arg("/nonexistent/coords.cif")
        .arg("--restraints")
        .arg(&restraint_path);

    cmd.assert().failure();
}
