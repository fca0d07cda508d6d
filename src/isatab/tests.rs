use std::io::Cursor;

use super::*;
use crate::model::{
    Characteristic, FactorValue, Material, NodeId, OntologyAnnotation, Process, StudyFactor, Value,
};

const MINIMAL_INVESTIGATION: &str = concat!(
    "ONTOLOGY SOURCE REFERENCE\n",
    "Term Source Name\tOBI\n",
    "Term Source File\thttp://purl.obolibrary.org/obo/obi.owl\n",
    "INVESTIGATION\n",
    "Investigation Identifier\tI1\n",
    "Investigation Title\tMinimal\n",
    "STUDY\n",
    "Study Identifier\tS1\n",
    "Study File Name\ts_S1.txt\n",
    "STUDY PROTOCOLS\n",
    "Study Protocol Name\tP1\n",
    "Study Protocol Type\tsample collection\n",
);

const MINIMAL_STUDY: &str = "Source Name\tProtocol REF\tSample Name\nsrc1\tP1\tsmp1\n";

fn study_with_protocols(protocols: &[(&str, &str)]) -> Study {
    let mut study = Study::new("S1", "s_S1.txt");
    for (name, protocol_type) in protocols {
        study.add_protocol(Protocol::new(name, *protocol_type)).unwrap();
    }
    study
}

fn read_study(study: &mut Study, table: &str) -> Result<(), IsaTabError> {
    read_study_table(Cursor::new(table), &[OntologySource::new("OBI")], study)
}

fn write_study(study: &Study) -> String {
    let mut out = Vec::new();
    write_study_table(study, &TabularWriterConfig::default(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_minimal_investigation_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("i_inv.txt"), MINIMAL_INVESTIGATION).unwrap();
    std::fs::write(dir.path().join("s_S1.txt"), MINIMAL_STUDY).unwrap();

    let investigation = load(dir.path()).unwrap();
    assert_eq!(investigation.identifier, "I1");
    assert_eq!(investigation.ontology_sources[0].name, "OBI");
    let study = &investigation.studies[0];
    assert_eq!(study.sources.len(), 1);
    assert_eq!(study.samples.len(), 1);
    assert_eq!(study.samples[0].name, "smp1");
    assert_eq!(study.samples[0].derives_from, vec![study.sources[0].id.clone()]);
    assert_eq!(study.process_sequence.len(), 1);
    let process = &study.process_sequence[0];
    assert_eq!(process.executes_protocol, "P1");
    assert_eq!(process.inputs, vec![NodeId::new("source/src1")]);
    assert_eq!(process.outputs, vec![NodeId::new("sample/smp1")]);

    let out = tempfile::tempdir().unwrap();
    dump(&investigation, out.path(), &TabularWriterConfig::default()).unwrap();
    let written = std::fs::read_to_string(out.path().join("s_S1.txt")).unwrap();
    assert_eq!(written.trim_end(), MINIMAL_STUDY.trim_end());

    let reloaded = load(out.path()).unwrap();
    assert_eq!(reloaded.studies[0].process_sequence, study.process_sequence);
    assert_eq!(reloaded.studies[0].protocols, study.protocols);
}

#[test]
fn test_pooling_rows_share_one_process() {
    let mut study = study_with_protocols(&[("P1", "sample collection")]);
    read_study(
        &mut study,
        "Source Name\tProtocol REF\tSample Name\nsrc1\tP1\tsmp_pooled\nsrc2\tP1\tsmp_pooled\n",
    )
    .unwrap();

    assert_eq!(study.process_sequence.len(), 1);
    let process = &study.process_sequence[0];
    assert_eq!(
        process.inputs,
        vec![NodeId::new("source/src1"), NodeId::new("source/src2")]
    );
    assert_eq!(process.outputs, vec![NodeId::new("sample/smp_pooled")]);
    assert_eq!(study.samples[0].derives_from.len(), 2);
}

#[test]
fn test_splitting_with_assay_name() {
    let mut study = study_with_protocols(&[("Px", "mass spectrometry")]);
    study.samples.push(Material::sample("smp1"));
    let mut assay = Assay::new("a_S1.txt");
    let table = concat!(
        "Sample Name\tProtocol REF\tMS Assay Name\tRaw Data File\n",
        "smp1\tPx\trun_a\tfa.mzML\n",
        "smp1\tPx\trun_b\tfb.mzML\n",
    );
    read_assay_table(Cursor::new(table), &[], &mut study, &mut assay).unwrap();

    assert_eq!(assay.process_sequence.len(), 2);
    let names: Vec<&str> = assay.process_sequence.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["run_a", "run_b"]);
    for (process, file) in assay.process_sequence.iter().zip(["fa.mzML", "fb.mzML"]) {
        assert_eq!(process.inputs, vec![NodeId::new("sample/smp1")]);
        assert_eq!(process.outputs, vec![NodeId::data_file(file)]);
    }
    assert_eq!(assay.data_files.len(), 2);

    let mut out = Vec::new();
    write_assay_table(&study, &assay, &TabularWriterConfig::default(), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), table);
}

#[test]
fn test_annotation_upgrade() {
    let mut study = study_with_protocols(&[("P1", "sample collection")]);
    let table = concat!(
        "Source Name\tCharacteristics[organism]\tTerm Source REF\tTerm Accession Number\t",
        "Protocol REF\tSample Name\n",
        "src1\tHomo sapiens\tOBI\thttp://purl.obolibrary.org/obo/NCBITaxon_9606\tP1\tsmp1\n",
    );
    read_study(&mut study, table).unwrap();

    let organism = study.sources[0].characteristic("organism").unwrap();
    let annotation = organism.value.as_annotation().unwrap();
    assert_eq!(annotation.term, "Homo sapiens");
    assert_eq!(annotation.term_source.as_deref(), Some("OBI"));
    assert_eq!(
        annotation.term_accession,
        "http://purl.obolibrary.org/obo/NCBITaxon_9606"
    );

    assert_eq!(write_study(&study), table);
}

#[test]
fn test_unit_makes_number() {
    let mut study = study_with_protocols(&[("P1", "sample collection")]);
    read_study(
        &mut study,
        concat!(
            "Source Name\tCharacteristics[weight]\tUnit\tTerm Source REF\tTerm Accession Number\n",
            "src1\t72.5\tkilogram\tUO\thttp://purl.obolibrary.org/obo/UO_0000009\n",
            "src2\theavy\t\t\t\n",
        ),
    )
    .unwrap();

    let weight = study.sources[0].characteristic("weight").unwrap();
    assert_eq!(weight.value, Value::Number(72.5));
    let unit = weight.unit.as_ref().unwrap();
    assert_eq!(unit.term, "kilogram");
    assert_eq!(unit.source_name(), "UO");

    let other = study.sources[1].characteristic("weight").unwrap();
    assert_eq!(other.value, Value::from("heavy"));
    assert_eq!(other.unit, None);
}

#[test]
fn test_missing_protocol_ref_is_inserted() {
    let mut study = study_with_protocols(&[]);
    read_study(&mut study, "Source Name\tSample Name\nsrc1\tsmp1\n").unwrap();

    assert_eq!(study.process_sequence.len(), 1);
    assert_eq!(study.process_sequence[0].executes_protocol, UNKNOWN_PROTOCOL);
    assert!(study.protocol(UNKNOWN_PROTOCOL).is_some());
}

#[test]
fn test_undeclared_references_are_fatal() {
    let mut study = study_with_protocols(&[("P1", "sample collection")]);
    let err = read_study(
        &mut study,
        "Source Name\tProtocol REF\tSample Name\nsrc1\tP9\tsmp1\n",
    )
    .unwrap_err();
    assert!(matches!(err, IsaTabError::UndeclaredProtocol(ref name) if name == "P9"));

    let err = read_study(
        &mut study,
        "Source Name\tProtocol REF\tSample Name\tFactor Value[dose]\nsrc1\tP1\tsmp1\t5\n",
    )
    .unwrap_err();
    assert!(matches!(err, IsaTabError::UndeclaredFactor(ref name) if name == "dose"));

    let err = read_study(&mut study, "Source Name\tColour\nsrc1\tred\n").unwrap_err();
    assert!(matches!(err, IsaTabError::UnknownHeader(_)));
}

#[test]
fn test_factor_values_roundtrip() {
    let mut study = study_with_protocols(&[("P1", "sample collection")]);
    study
        .add_factor(StudyFactor::new("dose", "dose"))
        .unwrap();
    let table = concat!(
        "Source Name\tProtocol REF\tSample Name\tFactor Value[dose]\tUnit\t",
        "Term Source REF\tTerm Accession Number\n",
        "src1\tP1\tsmp1\t5\tmilligram\t\t\n",
        "src2\tP1\tsmp2\t10\tmilligram\t\t\n",
    );
    read_study(&mut study, table).unwrap();

    let dose = &study.samples[0].factor_values[0];
    assert_eq!(dose.factor_name, "dose");
    assert_eq!(dose.value, Value::Number(5.0));
    assert_eq!(dose.unit, Some(OntologyAnnotation::new("milligram")));
    assert_eq!(study.process_sequence.len(), 2);

    assert_eq!(write_study(&study), table);
}

#[test]
fn test_chained_processes() {
    let mut study = study_with_protocols(&[
        ("hyb", "nucleic acid hybridization"),
        ("scan", "array scanning"),
    ]);
    study.samples.push(Material::sample("smp1"));
    let mut assay = Assay::new("a_array.txt");
    let table = concat!(
        "Sample Name\tProtocol REF\tHybridization Assay Name\t",
        "Protocol REF\tScan Name\tArray Data File\n",
        "smp1\thyb\th1\tscan\tscan1\tf1.cel\n",
    );
    read_assay_table(Cursor::new(table), &[], &mut study, &mut assay).unwrap();

    let [hyb, scan] = assay.process_sequence.as_slice() else {
        panic!("expected two processes, got {:?}", assay.process_sequence);
    };
    assert_eq!(hyb.inputs, vec![NodeId::new("sample/smp1")]);
    assert!(hyb.outputs.is_empty());
    assert!(scan.inputs.is_empty());
    assert_eq!(scan.outputs, vec![NodeId::data_file("f1.cel")]);
    assert_eq!(hyb.next_process, Some(scan.id.clone()));
    assert_eq!(scan.previous_process, Some(hyb.id.clone()));

    let mut out = Vec::new();
    write_assay_table(&study, &assay, &TabularWriterConfig::default(), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), table);
}

#[test]
fn test_empty_cells_skip_to_next_node() {
    let mut study = study_with_protocols(&[("P1", "sample collection"), ("P2", "extraction")]);
    let table = concat!(
        "Source Name\tProtocol REF\tSample Name\tProtocol REF\tExtract Name\n",
        "src1\tP1\tsmp1\tP2\text1\n",
        "src2\tP1\tsmp2\t\t\n",
        "src3\t\t\tP2\text3\n",
    );
    read_study(&mut study, table).unwrap();

    assert_eq!(study.process_sequence.len(), 4);
    let short = &study.process_sequence[2];
    assert_eq!(short.inputs, vec![NodeId::new("source/src2")]);
    assert_eq!(short.outputs, vec![NodeId::new("sample/smp2")]);
    let skipping = &study.process_sequence[3];
    assert_eq!(skipping.executes_protocol, "P2");
    assert_eq!(skipping.inputs, vec![NodeId::new("source/src3")]);
    assert_eq!(skipping.outputs, vec![NodeId::new("extract/ext3")]);
    assert_eq!(study.other_materials.len(), 2);
}

#[test]
fn test_linear_processes_are_linked() {
    let mut study = study_with_protocols(&[("P1", "sample collection"), ("P2", "extraction")]);
    read_study(
        &mut study,
        concat!(
            "Source Name\tProtocol REF\tSample Name\tProtocol REF\tExtract Name\n",
            "src1\tP1\tsmp1\tP2\text1\n",
        ),
    )
    .unwrap();
    let processes: &[Process] = &study.process_sequence;
    assert_eq!(processes[0].next_process, Some(processes[1].id.clone()));
    assert_eq!(processes[1].previous_process, Some(processes[0].id.clone()));
}

#[test]
fn test_malformed_row() {
    let mut study = study_with_protocols(&[("P1", "sample collection")]);
    let err = read_study(
        &mut study,
        "Source Name\tProtocol REF\tSample Name\nsrc1\tP1\tsmp1\textra\n",
    )
    .unwrap_err();
    assert!(matches!(err, IsaTabError::MalformedRow { row: 2, .. }));

    let err = read_study(
        &mut study,
        "Source Name\tProtocol REF\tCharacteristics[x]\nsrc1\tP1\tred\n",
    )
    .unwrap_err();
    assert!(matches!(err, IsaTabError::MisplacedColumn { .. }));
}

#[test]
fn test_missing_required_field() {
    let text = "INVESTIGATION\nInvestigation Identifier\tI1\nSTUDY\nStudy Identifier\tS1\n";
    let err = read_investigation(Cursor::new(text)).unwrap_err();
    match err {
        IsaTabError::MissingField { section, label } => {
            assert_eq!(section, "STUDY");
            assert_eq!(label, "Study File Name");
        }
        other => panic!("unexpected error: {}", other),
    }

    let err = read_investigation(Cursor::new("INVESTIGATION\nInvestigation Identifier\tI1\n"))
        .unwrap_err();
    assert!(matches!(err, IsaTabError::MissingSection(ref s) if s == "STUDY"));
}

#[test]
fn test_investigation_roundtrip() {
    let investigation = read_investigation(Cursor::new(MINIMAL_INVESTIGATION)).unwrap();
    let mut out = Vec::new();
    write_investigation(&investigation, &mut out).unwrap();
    let reread = read_investigation(Cursor::new(out)).unwrap();
    assert_eq!(reread, investigation);
    assert_eq!(reread.studies[0].protocols[0].protocol_type.term, "sample collection");
}

#[test]
fn test_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load(dir.path()).unwrap_err(),
        IsaTabError::FileNotFound(_)
    ));

    std::fs::write(dir.path().join("i_inv.txt"), MINIMAL_INVESTIGATION).unwrap();
    match load(dir.path()).unwrap_err() {
        IsaTabError::FileNotFound(path) => assert!(path.ends_with("s_S1.txt")),
        other => panic!("unexpected error: {}", other),
    }

    std::fs::write(dir.path().join("i_other.txt"), MINIMAL_INVESTIGATION).unwrap();
    assert!(matches!(
        load(dir.path()).unwrap_err(),
        IsaTabError::MultipleInvestigationFiles(_)
    ));
}

#[test]
fn test_byte_order_mark_is_ignored() {
    let mut study = study_with_protocols(&[("P1", "sample collection")]);
    let table = format!("\u{feff}{}", MINIMAL_STUDY);
    read_study(&mut study, &table).unwrap();
    assert_eq!(study.sources[0].name, "src1");
}

#[test]
fn test_writer_builds_study_from_objects() {
    let mut study = study_with_protocols(&[("P1", "sample collection")]);
    study.add_factor(StudyFactor::new("diet", "diet")).unwrap();
    let source = Material::source("mouse1")
        .with_characteristic(Characteristic::new("organism", "Mus musculus"));
    let mut sample = Material::sample("liver1");
    sample.add_derives_from(&source.id).unwrap();
    sample
        .add_factor_value(FactorValue::new("diet", "high fat"))
        .unwrap();
    let mut process = Process::new(NodeId::process(0), "P1");
    process.add_input(&source.id).unwrap();
    process.add_output(&sample.id).unwrap();
    process.date = Some("2024-03-01".to_string());
    study.sources.push(source);
    study.samples.push(sample);
    study.process_sequence.push(process);

    let written = write_study(&study);
    assert_eq!(
        written,
        concat!(
            "Source Name\tCharacteristics[organism]\tProtocol REF\tDate\t",
            "Sample Name\tFactor Value[diet]\n",
            "mouse1\tMus musculus\tP1\t2024-03-01\tliver1\thigh fat\n",
        )
    );

    let mut reread = study_with_protocols(&[("P1", "sample collection")]);
    reread.add_factor(StudyFactor::new("diet", "diet")).unwrap();
    read_study(&mut reread, &written).unwrap();
    assert_eq!(reread.sources, study.sources);
    assert_eq!(reread.samples, study.samples);
    assert_eq!(reread.process_sequence, study.process_sequence);
}

#[test]
fn test_latin1_table_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("i_inv.txt"), MINIMAL_INVESTIGATION).unwrap();
    std::fs::write(
        dir.path().join("s_S1.txt"),
        b"Source Name\tProtocol REF\tSample Name\nM\xfcller\tP1\tsmp1\n",
    )
    .unwrap();

    let investigation = load(dir.path()).unwrap();
    assert_eq!(investigation.studies[0].sources[0].name, "Müller");
    assert_eq!(legacy_encoding(b"M\xfcller").name(), "windows-1252");
    assert_eq!(legacy_encoding(b"\xff\xfeM\x00").name(), "UTF-16LE");
}

#[test]
fn test_date_precedes_performer() {
    let table = concat!(
        "Source Name\tProtocol REF\tDate\tPerformer\tSample Name\n",
        "src1\tP1\t2024-03-01\tJ. Smith\tsmp1\n",
    );
    let mut study = study_with_protocols(&[("P1", "sample collection")]);
    read_study(&mut study, table).unwrap();
    let process = &study.process_sequence[0];
    assert_eq!(process.date.as_deref(), Some("2024-03-01"));
    assert_eq!(process.performer.as_deref(), Some("J. Smith"));
    assert_eq!(write_study(&study), table);
}

#[test]
fn test_empty_identifier_is_not_written() {
    let mut investigation = read_investigation(Cursor::new(MINIMAL_INVESTIGATION)).unwrap();
    investigation.identifier.clear();

    let mut out = Vec::new();
    match write_investigation(&investigation, &mut out).unwrap_err() {
        IsaTabError::MissingField { section, label } => {
            assert_eq!(section, "INVESTIGATION");
            assert_eq!(label, "Investigation Identifier");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(out.is_empty());

    let dir = tempfile::tempdir().unwrap();
    assert!(dump(&investigation, dir.path(), &TabularWriterConfig::default()).is_err());
    assert!(!dir.path().join(INVESTIGATION_FILE_NAME).exists());
}
