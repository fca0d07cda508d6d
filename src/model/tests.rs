use super::graph::{check_process_links, link_linear_processes};
use super::*;

fn process(index: usize, protocol: &str, inputs: &[&NodeId], outputs: &[&NodeId]) -> Process {
    let mut p = Process::new(NodeId::process(index), protocol);
    for i in inputs {
        p.add_input(i).unwrap();
    }
    for o in outputs {
        p.add_output(o).unwrap();
    }
    p
}

#[test]
fn test_characteristic_from_str_is_category() {
    let source = Material::source("src1").with_characteristic("organism");
    assert_eq!(source.characteristics.len(), 1);
    assert_eq!(source.characteristics[0].category.term, "organism");
    assert!(source.characteristics[0].value.is_empty());

    let full = Material::source("src2")
        .with_characteristic(Characteristic::new("organism", "Homo sapiens"));
    assert_eq!(
        full.characteristic("organism").map(|c| c.value.to_string()),
        Some("Homo sapiens".to_string())
    );
}

#[test]
fn test_factor_values_only_on_samples() {
    let mut source = Material::source("src1");
    let err = source
        .add_factor_value(FactorValue::new("dose", 5.0))
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidAttribute(_)));

    let mut sample = Material::sample("smp1");
    sample.add_factor_value(FactorValue::new("dose", 5.0)).unwrap();
    assert_eq!(sample.factor_values[0].value.as_number(), Some(5.0));
}

#[test]
fn test_material_ids_are_kind_scoped() {
    assert_ne!(Material::source("x").id, Material::sample("x").id);
    assert_eq!(Material::sample("x").id, NodeId::new("sample/x"));
}

#[test]
fn test_process_output_equal_to_input_rejected() {
    let src = NodeId::material(MaterialKind::Source, "s");
    let mut p = Process::new(NodeId::process(0), "P1");
    p.add_input(&src).unwrap();
    p.add_input(&src).unwrap();
    assert_eq!(p.inputs.len(), 1);
    assert!(p.add_output(&src).is_err());
}

#[test]
fn test_data_file_labels() {
    for label in DataFileLabel::ALL {
        assert_eq!(DataFileLabel::from_label(label.label()), Some(label));
    }
    assert_eq!(
        DataFileLabel::from_label("Acquisition Parameter Data File"),
        Some(DataFileLabel::AcquisitionParameterData)
    );
    assert_eq!(DataFileLabel::from_label("Sample Name"), None);
}

#[test]
fn test_format_number() {
    assert_eq!(format_number(5.0), "5");
    assert_eq!(format_number(-3.0), "-3");
    assert_eq!(format_number(2.5), "2.5");
}

#[test]
fn test_annotation_empty_source_is_none() {
    let a = OntologyAnnotation::from_cells("Homo sapiens", "", "");
    assert_eq!(a.term_source, None);
    let b = OntologyAnnotation::from_cells("Homo sapiens", "OBI", "http://x/1");
    assert_eq!(b.source_name(), "OBI");
    assert_eq!(b.to_string(), "Homo sapiens [OBI: http://x/1]");
}

#[test]
fn test_duplicate_declarations() {
    let mut study = Study::new("S1", "s_S1.txt");
    study.add_protocol(Protocol::new("P1", "sample collection")).unwrap();
    let err = study
        .add_protocol(Protocol::new("P1", "extraction"))
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::Duplicate {
            kind: "protocol",
            name: "P1".to_string()
        }
    );
}

#[test]
fn test_graph_rejects_material_to_material_edge() {
    let mut graph = ProvenanceGraph::new();
    let a = NodeId::new("source/a");
    let b = NodeId::new("sample/b");
    graph.add_node(GraphNode::Material(a.clone()));
    graph.add_node(GraphNode::Material(b.clone()));
    assert!(matches!(
        graph.add_edge(&a, &b),
        Err(ModelError::InvalidEdge(_))
    ));

    let p = NodeId::process(0);
    graph.add_node(GraphNode::Process(p.clone()));
    graph.add_edge(&a, &p).unwrap();
    graph.add_edge(&p, &b).unwrap();
    assert_eq!(graph.start_nodes(), vec![&a]);
    assert_eq!(graph.end_nodes(), vec![&b]);
    assert!(graph.is_acyclic());
}

#[test]
fn test_all_paths_split_and_pool() {
    let src1 = Material::source("src1");
    let src2 = Material::source("src2");
    let pooled = Material::sample("pooled");
    let ext1 = Material::new(MaterialKind::Extract, "e1");
    let ext2 = Material::new(MaterialKind::Extract, "e2");
    let processes = vec![
        process(0, "P1", &[&src1.id, &src2.id], &[&pooled.id]),
        process(1, "P2", &[&pooled.id], &[&ext1.id, &ext2.id]),
    ];
    let materials = [src1, src2, pooled, ext1, ext2];
    let graph = ProvenanceGraph::build(&materials, std::iter::empty(), &processes).unwrap();

    let paths = graph.all_paths(DEFAULT_MAX_PATHS).unwrap();
    assert_eq!(paths.len(), 4);
    assert_eq!(paths[0][0], NodeId::new("source/src1"));
    assert_eq!(paths[0].last(), Some(&NodeId::new("extract/e1")));

    let err = graph.all_paths(3).unwrap_err();
    assert_eq!(err, ModelError::GraphTooComplex { limit: 3 });
}

#[test]
fn test_longest_path_prefers_heavier_then_first() {
    let paths = vec![
        vec![NodeId::new("a"), NodeId::new("b")],
        vec![NodeId::new("c"), NodeId::new("d")],
        vec![NodeId::new("e")],
    ];
    let first = ProvenanceGraph::longest_path(&paths, |_| 0).unwrap();
    assert_eq!(first, &paths[0]);

    let heavier = ProvenanceGraph::longest_path(&paths, |id| usize::from(id.as_str() == "d"))
        .unwrap();
    assert_eq!(heavier, &paths[1]);
}

#[test]
fn test_link_linear_processes_skips_branches() {
    let s = NodeId::new("source/s");
    let a = NodeId::new("sample/a");
    let e1 = NodeId::new("extract/e1");
    let e2 = NodeId::new("extract/e2");
    let l1 = NodeId::new("labeledextract/l1");
    let mut processes = vec![
        process(0, "sampling", &[&s], &[&a]),
        process(1, "extraction", &[&a], &[&e1]),
        process(2, "extraction", &[&a], &[&e2]),
        process(3, "labeling", &[&e1], &[&l1]),
    ];
    let conflicts = link_linear_processes(&mut processes);
    assert_eq!(conflicts, 0);
    // process 0 feeds two processes: no pointers
    assert_eq!(processes[0].next_process, None);
    assert_eq!(processes[1].next_process, Some(NodeId::process(3)));
    assert_eq!(processes[3].previous_process, Some(NodeId::process(1)));
    assert!(check_process_links(&processes).is_empty());

    processes[2].next_process = Some(NodeId::process(3));
    assert_eq!(check_process_links(&processes).len(), 1);
}

#[test]
fn test_study_categories_are_distinct() {
    let mut study = Study::new("S1", "s_S1.txt");
    study.sources.push(
        Material::source("a").with_characteristic(
            Characteristic::new("weight", 5.0).with_unit(OntologyAnnotation::new("kilogram")),
        ),
    );
    study.sources.push(
        Material::source("b").with_characteristic(
            Characteristic::new("weight", 7.0).with_unit(OntologyAnnotation::new("kilogram")),
        ),
    );
    assert_eq!(study.characteristic_categories().len(), 1);
    assert_eq!(study.unit_categories(), vec![OntologyAnnotation::new("kilogram")]);
}

#[test]
fn test_extended_dates() {
    assert!(is_extended_date("2024-03-01"));
    assert!(is_extended_date("2024-03-01T10:15:00"));
    assert!(is_extended_date("2024-03-01T10:15:00Z"));
    assert!(!is_extended_date("01/03/2024"));
    assert!(!is_extended_date("2024-13-01"));
}

#[test]
fn test_chained_processes_form_one_path() {
    let sample = Material::sample("s1");
    let extract = Material::new(MaterialKind::Extract, "e1");
    let mut first = process(0, "hybridization", &[&sample.id], &[]);
    let mut second = process(1, "scan", &[], &[&extract.id]);
    first.next_process = Some(second.id.clone());
    second.previous_process = Some(first.id.clone());
    let processes = vec![first, second];

    let materials = [sample, extract];
    let graph = ProvenanceGraph::build(&materials, std::iter::empty(), &processes).unwrap();
    let paths = graph.all_paths(DEFAULT_MAX_PATHS).unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].len(), 4);
    assert!(check_process_links(&processes).is_empty());
}
