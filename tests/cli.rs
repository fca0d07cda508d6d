//! Exit codes and outputs of the isa-convert binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

const INVESTIGATION: &str = concat!(
    "ONTOLOGY SOURCE REFERENCE\n",
    "Term Source Name\tOBI\n",
    "INVESTIGATION\n",
    "Investigation Identifier\tI1\n",
    "STUDY\n",
    "Study Identifier\tS1\n",
    "Study File Name\ts_S1.txt\n",
    "STUDY PROTOCOLS\n",
    "Study Protocol Name\tP1\n",
    "Study Protocol Type\tsample collection\n",
);

const STUDY_TABLE: &str = "Source Name\tProtocol REF\tSample Name\nsrc1\tP1\tsmp1\n";

fn isa_convert(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_isa-convert"))
        .args(args)
        .output()
        .unwrap()
}

fn write_fixture(dir: &Path) {
    fs::write(dir.join("i_inv.txt"), INVESTIGATION).unwrap();
    fs::write(dir.join("s_S1.txt"), STUDY_TABLE).unwrap();
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_convert_both_ways() {
    let dir = tempdir().unwrap();
    let tables = dir.path().join("tables");
    fs::create_dir(&tables).unwrap();
    write_fixture(&tables);

    let document = dir.path().join("inv.json");
    let output = isa_convert(&["convert-tabular-to-document", arg(&tables), arg(&document)]);
    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&document).unwrap()).unwrap();
    assert_eq!(json["identifier"], "I1");

    let back = dir.path().join("back");
    let output = isa_convert(&["convert-document-to-tabular", arg(&document), arg(&back)]);
    assert_eq!(output.status.code(), Some(0));
    let table = fs::read_to_string(back.join("s_S1.txt")).unwrap();
    assert_eq!(table, STUDY_TABLE);
}

#[test]
fn test_document_to_stdout() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let output = isa_convert(&["convert-tabular-to-document", arg(dir.path())]);
    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["studies"][0]["identifier"], "S1");
}

#[test]
fn test_validate_exit_codes() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let output = isa_convert(&["validate", arg(dir.path())]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Validation PASSED"));

    fs::remove_file(dir.path().join("s_S1.txt")).unwrap();
    let output = isa_convert(&["validate", arg(dir.path())]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Validation FAILED"));
}

#[test]
fn test_fatal_and_usage_errors() {
    let dir = tempdir().unwrap();
    let output = isa_convert(&["convert-tabular-to-document", arg(&dir.path().join("nope"))]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));

    // Missing investigation file inside an existing directory
    let output = isa_convert(&["convert-tabular-to-document", arg(dir.path())]);
    assert_eq!(output.status.code(), Some(1));

    let output = isa_convert(&["convert-document-to-tabular"]);
    assert_eq!(output.status.code(), Some(2));
    let output = isa_convert(&["frobnicate"]);
    assert_eq!(output.status.code(), Some(2));
}
