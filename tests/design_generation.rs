//! Integration tests for generating studies from a design and writing them
//! out in both layouts

use isa::design::{
    augment_study, AssayGraph, GroupSizes, InterventionType, NonTreatment, NonTreatmentType,
    Periods, ProductNode, ProductStep, ProductType, ProtocolStep, QualityControl,
    SampleAndAssayPlan, StudyArm, StudyCell, StudyDesign, StudyDesignFactory, Treatment,
    TreatmentFactory, WorkflowStep, AGENT_FACTOR, DURATION_FACTOR, INTENSITY_FACTOR,
};
use isa::isajson::{self, DocumentWriterConfig};
use isa::isatab::{self, TabularWriterConfig};
use isa::model::{Characteristic, FactorValue, Investigation, OntologyAnnotation};
use isa::validator::{self, Severity};
use tempfile::tempdir;

fn ms_graph(quality_control: Option<QualityControl>) -> AssayGraph {
    let workflow = vec![
        WorkflowStep::Protocol(ProtocolStep::new("extraction", "extraction")),
        WorkflowStep::Products {
            name: "extract".to_string(),
            products: vec![ProductStep::new(ProductType::Extract, 1)],
        },
        WorkflowStep::Protocol(ProtocolStep::new("mass spectrometry", "mass spectrometry")),
        WorkflowStep::Products {
            name: "raw".to_string(),
            products: vec![ProductStep::new(ProductType::DataFile, 1).with_extension("mzML")],
        },
    ];
    AssayGraph::from_workflow(
        "AT0",
        "metabolite profiling",
        "mass spectrometry",
        &workflow,
        quality_control,
    )
    .unwrap()
}

fn plasma_plan(graph: AssayGraph) -> SampleAndAssayPlan {
    let mut plan = SampleAndAssayPlan::new("plasma plan");
    plan.add_sample_type(
        ProductNode::new("plasma", ProductType::Sample, "plasma", 1)
            .unwrap()
            .with_characteristic(Characteristic::new("organism part", "plasma")),
    )
    .unwrap();
    let graph_id = graph.id.clone();
    plan.add_assay_graph(graph).unwrap();
    plan.map_sample_to_assay("plasma", &graph_id).unwrap();
    plan
}

fn agent(name: &str) -> Treatment {
    Treatment::new(
        InterventionType::Chemical,
        vec![FactorValue::new(AGENT_FACTOR, name)],
    )
}

fn dump_and_load(investigation: &Investigation) -> Investigation {
    let dir = tempdir().unwrap();
    isatab::dump(investigation, dir.path(), &TabularWriterConfig::default()).unwrap();
    let report = validator::validate(dir.path()).unwrap();
    assert!(!report.has_fatal(), "{}", report);
    isatab::load(dir.path()).unwrap()
}

/// A two-treatment crossover with screen, washout and follow-up periods
#[test]
fn test_crossover_design_to_tables() {
    let plan = plasma_plan(ms_graph(None));
    let treatments = vec![
        (agent("A"), Some(plan.clone())),
        (agent("B"), Some(plan)),
    ];
    let day = Some(OntologyAnnotation::new("day"));
    let periods = Periods {
        screen: Some((NonTreatment::new(NonTreatmentType::Screen, 7.0, day.clone()), None)),
        washout: Some((NonTreatment::new(NonTreatmentType::Washout, 14.0, day.clone()), None)),
        follow_up: Some((NonTreatment::new(NonTreatmentType::FollowUp, 30.0, day), None)),
        ..Default::default()
    };
    let design = StudyDesignFactory::compute_crossover_design(
        &treatments,
        &GroupSizes::Uniform(10),
        &periods,
    )
    .unwrap();
    assert_eq!(design.arms().len(), 2);

    let investigation = design.generate_investigation().unwrap();
    let loaded = dump_and_load(&investigation);
    let study = &loaded.studies[0];
    for group in ["GRP00", "GRP01"] {
        let sources = study
            .sources
            .iter()
            .filter(|s| s.name.starts_with(group))
            .count();
        assert_eq!(sources, 10, "sources of {}", group);
    }
    // 2 arms x 10 subjects x 2 treatment cells, one plasma sample each
    assert_eq!(study.samples.len(), 40);
    assert_eq!(study.assays.len(), 1);
    assert_eq!(study.assays[0].samples.len(), 40);
    assert_eq!(study.assays[0].data_files.len(), 40);
    assert_eq!(study.samples.len(), investigation.studies[0].samples.len());
}

/// Pre-run, post-run and interspersed QC samples added to an assay of 40
#[test]
fn test_quality_control_augmentation_to_tables() {
    let mut qc = QualityControl::new(
        Some(ProductNode::new("qc_pre", ProductType::Sample, "pooled QC", 5).unwrap()),
        Some(ProductNode::new("qc_post", ProductType::Sample, "pooled QC", 5).unwrap()),
    )
    .unwrap();
    qc.add_interspersed(
        ProductNode::new("qc_int", ProductType::Sample, "pooled QC", 1).unwrap(),
        20,
    )
    .unwrap();

    let mut arm = StudyArm::new("ARM_00", 40);
    arm.add_item(
        StudyCell::with_elements("ARM_00_CELL_00", [agent("A").into()]).unwrap(),
        Some(plasma_plan(ms_graph(Some(qc)))),
    )
    .unwrap();
    let mut design = StudyDesign::new("QC1", "qc augmentation");
    design.add_arm(arm).unwrap();

    let mut investigation = design.generate_investigation().unwrap();
    assert_eq!(investigation.studies[0].assays[0].samples.len(), 40);
    let augmented = augment_study(&investigation.studies[0], &design).unwrap();
    investigation.studies[0] = augmented;

    let loaded = dump_and_load(&investigation);
    let assay = &loaded.studies[0].assays[0];
    assert_eq!(assay.samples.len(), 51);
    let qc_samples: Vec<&str> = assay
        .samples
        .iter()
        .map(|s| s.name.as_str())
        .filter(|n| n.starts_with("SMP-QC"))
        .collect();
    assert_eq!(qc_samples.len(), 11);
    assert_eq!(qc_samples.iter().filter(|n| n.starts_with("SMP-QC-PRE-")).count(), 5);
    assert_eq!(qc_samples.iter().filter(|n| n.starts_with("SMP-QC-POST-")).count(), 5);
}

/// A factorial design survives document output and reload
#[test]
fn test_factorial_design_to_document() {
    let mut factory = TreatmentFactory::new(InterventionType::Chemical);
    for name in ["A", "B"] {
        factory.add_factor_value(AGENT_FACTOR, name).unwrap();
    }
    factory.add_factor_value(INTENSITY_FACTOR, 5.0).unwrap();
    factory.add_factor_value(DURATION_FACTOR, 7.0).unwrap();
    let treatments: Vec<(Treatment, Option<SampleAndAssayPlan>)> = factory
        .compute_full_factorial_design()
        .into_iter()
        .map(|t| (t, Some(plasma_plan(ms_graph(None)))))
        .collect();
    assert_eq!(treatments.len(), 2);
    let design = StudyDesignFactory::compute_parallel_design(
        &treatments,
        &GroupSizes::Uniform(3),
        &Periods::default(),
    )
    .unwrap();
    let investigation = design.generate_investigation().unwrap();

    let config = DocumentWriterConfig::default();
    let document = isajson::dumps(&investigation, &config).unwrap();
    let reloaded = isajson::loads(&document).unwrap();
    assert_eq!(isajson::dumps(&reloaded, &config).unwrap(), document);
    assert_eq!(reloaded.studies[0].samples.len(), 6);

    let report = validator::validate_document(document.as_bytes(), "design.json").unwrap();
    assert_eq!(report.with_severity(Severity::Fatal).count(), 0, "{}", report);
}
