use super::arm::{
    COMPLETE_ARM_ERROR, FOLLOW_UP_EMPTY_ARM_ERROR, FOLLOW_UP_ERROR, RUN_IN_ERROR, SCREEN_ERROR,
    WASHOUT_ERROR,
};
use super::*;
use crate::model::{
    graph::check_process_links, Characteristic, DataFileLabel, FactorValue, MaterialKind,
    OntologyAnnotation, Value,
};

fn period(kind: NonTreatmentType, days: f64) -> Element {
    NonTreatment::new(kind, days, Some(OntologyAnnotation::new("day"))).into()
}

fn treatment(agent: &str) -> Treatment {
    Treatment::new(
        InterventionType::Chemical,
        vec![
            FactorValue::new(AGENT_FACTOR, agent),
            FactorValue::new(INTENSITY_FACTOR, 10.0),
            FactorValue::new(DURATION_FACTOR, 7.0),
        ],
    )
}

fn cell(name: &str, element: impl Into<Element>) -> StudyCell {
    StudyCell::with_elements(name, [element.into()]).unwrap()
}

fn blood() -> ProductNode {
    ProductNode::new("blood", ProductType::Sample, "blood", 1)
        .unwrap()
        .with_characteristic(Characteristic::new("organism part", "blood"))
}

fn ms_workflow() -> Vec<WorkflowStep> {
    vec![
        WorkflowStep::Protocol(ProtocolStep::new("extraction", "extraction")),
        WorkflowStep::Products {
            name: "extract".to_string(),
            products: vec![ProductStep::new(ProductType::Extract, 2)],
        },
        WorkflowStep::Protocol(
            ProtocolStep::new("mass spectrometry", "mass spectrometry")
                .with_parameter("instrument", vec!["Orbitrap".into()]),
        ),
        WorkflowStep::Products {
            name: "raw".to_string(),
            products: vec![ProductStep::new(ProductType::DataFile, 1).with_extension("mzML")],
        },
    ]
}

fn ms_graph(quality_control: Option<QualityControl>) -> AssayGraph {
    AssayGraph::from_workflow(
        "AT0",
        "metabolite profiling",
        "mass spectrometry",
        &ms_workflow(),
        quality_control,
    )
    .unwrap()
}

fn plan_with(graph: AssayGraph) -> SampleAndAssayPlan {
    let mut plan = SampleAndAssayPlan::new("blood plan");
    plan.add_sample_type(blood()).unwrap();
    let graph_id = graph.id.clone();
    plan.add_assay_graph(graph).unwrap();
    plan.map_sample_to_assay("blood", &graph_id).unwrap();
    plan
}

fn single_cell_design(group_size: usize, plan: SampleAndAssayPlan) -> StudyDesign {
    let mut arm = StudyArm::new("ARM_00", group_size);
    arm.add_item(cell("ARM_00_CELL_00", treatment("A")), Some(plan))
        .unwrap();
    let mut design = StudyDesign::new("S1", "single cell");
    design.add_arm(arm).unwrap();
    design
}

#[test]
fn test_cell_singletons() {
    let mut screen = cell("c", period(NonTreatmentType::Screen, 7.0));
    assert!(matches!(
        screen.insert_element(treatment("A").into(), None),
        Err(DesignError::CellRule(_))
    ));

    let mut busy = cell("c", treatment("A"));
    for kind in [
        NonTreatmentType::Screen,
        NonTreatmentType::RunIn,
        NonTreatmentType::FollowUp,
    ] {
        assert!(matches!(
            busy.insert_element(period(kind, 1.0), None),
            Err(DesignError::CellRule(_))
        ));
    }
    assert_eq!(busy.items().len(), 1);
}

#[test]
fn test_cell_washouts_not_adjacent() {
    let mut cell = cell("c", treatment("A"));
    cell.insert_element(period(NonTreatmentType::Washout, 3.0), None)
        .unwrap();
    assert!(cell
        .insert_element(period(NonTreatmentType::Washout, 3.0), None)
        .is_err());
    // Before the treatment the neighbour is not a washout
    cell.insert_element(period(NonTreatmentType::Washout, 3.0), Some(0))
        .unwrap();
    assert!(cell.starts_with(NonTreatmentType::Washout));
    assert!(cell.ends_with(NonTreatmentType::Washout));
    assert!(cell.has_treatments());
}

#[test]
fn test_concomitant_durations_must_match() {
    let mut cell = StudyCell::new("c");
    let mut short = treatment("B");
    short.factor_values[2] = FactorValue::new(DURATION_FACTOR, 3.0);
    assert!(matches!(
        cell.insert_concomitant(vec![treatment("A"), short]),
        Err(DesignError::CellRule(_))
    ));
    cell.insert_concomitant(vec![treatment("A"), treatment("B")])
        .unwrap();
    assert_eq!(cell.elements().len(), 2);
}

#[test]
fn test_arm_rules() {
    let rule = |result: Result<(), DesignError>| match result {
        Err(DesignError::ArmRule(message)) => message,
        other => panic!("expected an arm rule violation, got {:?}", other),
    };

    let mut arm = StudyArm::new("ARM_00", 5);
    assert_eq!(
        rule(arm.add_item(cell("f", period(NonTreatmentType::FollowUp, 30.0)), None)),
        FOLLOW_UP_EMPTY_ARM_ERROR
    );
    arm.add_item(cell("s", period(NonTreatmentType::Screen, 7.0)), None)
        .unwrap();
    assert_eq!(
        rule(arm.add_item(cell("s2", period(NonTreatmentType::Screen, 7.0)), None)),
        SCREEN_ERROR
    );
    assert_eq!(
        rule(arm.add_item(cell("f", period(NonTreatmentType::FollowUp, 30.0)), None)),
        FOLLOW_UP_ERROR
    );
    assert_eq!(
        rule(arm.add_item(cell("w", period(NonTreatmentType::Washout, 3.0)), None)),
        WASHOUT_ERROR
    );
    arm.add_item(cell("r", period(NonTreatmentType::RunIn, 7.0)), None)
        .unwrap();
    arm.add_item(cell("t1", treatment("A")), None).unwrap();
    assert_eq!(
        rule(arm.add_item(cell("r2", period(NonTreatmentType::RunIn, 7.0)), None)),
        RUN_IN_ERROR
    );
    arm.add_item(cell("w", period(NonTreatmentType::Washout, 3.0)), None)
        .unwrap();
    assert_eq!(
        rule(arm.add_item(cell("w2", period(NonTreatmentType::Washout, 3.0)), None)),
        WASHOUT_ERROR
    );
    assert!(matches!(
        arm.add_item(cell("t1", treatment("B")), None),
        Err(DesignError::Duplicate { .. })
    ));
    arm.add_item(cell("t2", treatment("B")), None).unwrap();
    arm.add_item(cell("f", period(NonTreatmentType::FollowUp, 30.0)), None)
        .unwrap();
    assert!(arm.is_completed());
    assert_eq!(
        rule(arm.add_item(cell("t3", treatment("C")), None)),
        COMPLETE_ARM_ERROR
    );
    assert_eq!(arm.treatments().len(), 2);
}

#[test]
fn test_run_in_may_open_an_arm() {
    let mut arm = StudyArm::new("ARM_00", 5);
    arm.add_item(cell("r", period(NonTreatmentType::RunIn, 7.0)), None)
        .unwrap();
    assert!(arm
        .add_item(cell("s", period(NonTreatmentType::Screen, 7.0)), None)
        .is_err());
}

mod arm_properties {
    use super::*;
    use proptest::prelude::*;

    fn element_of(choice: u8) -> Element {
        match choice {
            0 => period(NonTreatmentType::Screen, 7.0),
            1 => period(NonTreatmentType::RunIn, 7.0),
            2 => period(NonTreatmentType::Washout, 3.0),
            3 => period(NonTreatmentType::FollowUp, 30.0),
            _ => treatment("A").into(),
        }
    }

    proptest! {
        /// Whatever cells are offered, an arm built through add_item keeps
        /// its screen, run-in, follow-up and washout placement rules
        #[test]
        fn test_arm_invariants(choices in prop::collection::vec(0u8..6, 0..16)) {
            let mut arm = StudyArm::new("ARM_00", 1);
            for (i, choice) in choices.into_iter().enumerate() {
                let _ = arm.add_item(cell(&format!("c{}", i), element_of(choice)), None);
            }
            let cells: Vec<&StudyCell> = arm.cells().collect();
            let count = |kind| cells.iter().filter(|c| c.contains(kind)).count();

            prop_assert!(count(NonTreatmentType::Screen) <= 1);
            prop_assert!(count(NonTreatmentType::RunIn) <= 1);
            prop_assert!(count(NonTreatmentType::FollowUp) <= 1);
            if let Some(i) = cells.iter().position(|c| c.contains(NonTreatmentType::Screen)) {
                prop_assert_eq!(i, 0);
            }
            if let Some(i) = cells.iter().position(|c| c.contains(NonTreatmentType::RunIn)) {
                prop_assert!(i == 0 || (i == 1 && cells[0].contains(NonTreatmentType::Screen)));
            }
            if let Some(i) = cells.iter().position(|c| c.contains(NonTreatmentType::FollowUp)) {
                prop_assert_eq!(i, cells.len() - 1);
            }
            for pair in cells.windows(2) {
                prop_assert!(
                    !(pair[0].ends_with(NonTreatmentType::Washout)
                        && pair[1].starts_with(NonTreatmentType::Washout))
                );
            }
        }
    }
}

#[test]
fn test_product_links_rejected() {
    let mut graph = AssayGraph::new("g", "m", "t");
    graph
        .add_node(ProductNode::new("e", ProductType::Extract, "e", 1).unwrap())
        .unwrap();
    graph
        .add_node(ProductNode::new("d", ProductType::DataFile, "d", 1).unwrap())
        .unwrap();
    assert!(matches!(graph.add_link("e", "d"), Err(DesignError::InvalidLink(_))));
    assert!(matches!(
        graph.add_link("e", "missing"),
        Err(DesignError::UnknownNode { .. })
    ));
    assert!(matches!(
        graph.add_node(ProductNode::new("e", ProductType::Extract, "e", 1).unwrap()),
        Err(DesignError::Duplicate { .. })
    ));
}

#[test]
fn test_invalid_sizes() {
    assert!(matches!(
        ProductNode::new("x", ProductType::Sample, "x", 0),
        Err(DesignError::InvalidAttribute(_))
    ));
    assert!(ProtocolNode::new("p", "p", "p").with_replicates(0).is_err());
    let mut qc = QualityControl::default();
    assert!(qc.add_interspersed(blood(), 0).is_err());
    let extract = ProductNode::new("x", ProductType::Extract, "x", 1).unwrap();
    assert!(QualityControl::new(Some(extract), None).is_err());
}

#[test]
fn test_graph_from_workflow() {
    let workflow = vec![
        WorkflowStep::Protocol(
            ProtocolStep::new("extraction", "extraction")
                .with_parameter("method", vec!["polar".into(), "lipid".into()]),
        ),
        WorkflowStep::Products {
            name: "extract".to_string(),
            products: vec![ProductStep::new(ProductType::Extract, 1)],
        },
        WorkflowStep::Protocol(ProtocolStep::new("mass spectrometry", "mass spectrometry")),
    ];
    let graph = AssayGraph::from_workflow("AT1", "m", "t", &workflow, None).unwrap();
    let ids: Vec<&str> = graph.nodes().iter().map(SequenceNode::id).collect();
    assert_eq!(
        ids,
        [
            "extraction_000",
            "extraction_001",
            "extract_000_000",
            "extract_000_001",
            "mass_spectrometry_000_000",
            "mass_spectrometry_000_001",
        ]
    );
    assert_eq!(graph.start_nodes(), vec![0, 1]);
    let ms = graph.position("mass_spectrometry_000_001").unwrap();
    assert_eq!(graph.previous_protocol_nodes(ms), vec![1]);
    match &graph.nodes()[1] {
        SequenceNode::Protocol(p) => {
            assert_eq!(p.parameter_values[0].value, Value::Text("lipid".into()))
        }
        other => panic!("expected a protocol node, got {:?}", other),
    }

    let starts_with_product = [WorkflowStep::Products {
        name: "x".to_string(),
        products: vec![ProductStep::new(ProductType::Extract, 1)],
    }];
    assert!(AssayGraph::from_workflow("AT2", "m", "t", &starts_with_product, None).is_err());
}

#[test]
fn test_generate_study_samples_and_assay() {
    let design = single_cell_design(2, plan_with(ms_graph(None)));
    let study = design.generate_study().unwrap();

    assert_eq!(study.filename, "s_S1.txt");
    assert_eq!(study.sources[0].name, "GRP00_SBJ001");
    assert_eq!(study.sources[0].characteristics[0], default_source_type());
    assert_eq!(study.samples.len(), 2);

    let sample = &study.samples[0];
    assert_eq!(sample.name, "GRP00_SBJ001_ARM_00_CELL_00_SMP-blood-001");
    assert_eq!(sample.derives_from, vec![study.sources[0].id.clone()]);
    assert_eq!(sample.factor_values[0].factor_name, SEQUENCE_ORDER_FACTOR);
    assert_eq!(sample.factor_values[0].value, Value::Number(0.0));
    assert_eq!(sample.comments[0].name, TREATMENT_STEP_COMMENT);
    assert_eq!(sample.comments[0].value, "YES");
    assert!(study.factor(AGENT_FACTOR).is_some());
    assert!(study.factor(DURATION_FACTOR).is_some());

    let sampling = &study.process_sequence[1];
    assert_eq!(sampling.executes_protocol, SAMPLING_PROTOCOL);
    assert_eq!(sampling.parameter_values[0].value, Value::Text("002".into()));
    assert_eq!(
        sampling.parameter_values[1].value,
        Value::Text("ARM_00_CELL_00".into())
    );
    assert!(study.graph().unwrap().is_acyclic());

    let assay = &study.assays[0];
    assert_eq!(
        assay.filename,
        "a_AT0_metabolite_profiling_mass_spectrometry.txt"
    );
    assert_eq!(assay.samples, study.samples);
    // Per sample: one extraction, two extracts, two acquisitions, two files
    assert_eq!(assay.process_sequence.len(), 6);
    assert_eq!(assay.other_materials.len(), 4);
    assert_eq!(assay.data_files.len(), 4);
    assert!(assay
        .other_materials
        .iter()
        .all(|m| m.kind == MaterialKind::Extract));
    assert_eq!(assay.data_files[0].label, DataFileLabel::RawSpectralData);
    assert_eq!(assay.data_files[0].name, "AT0-S001-raw-R001.mzML");
    assert_eq!(assay.process_sequence[0].name, "AT0-S001-extraction-R001");
    assert_eq!(
        assay.process_sequence[2].name,
        "AT0-S001-mass_spectrometry-R002"
    );

    let extraction = &assay.process_sequence[0];
    let acquisition = &assay.process_sequence[1];
    assert_eq!(extraction.inputs, vec![study.samples[0].id.clone()]);
    assert_eq!(extraction.outputs.len(), 2);
    assert_eq!(acquisition.previous_process, Some(extraction.id.clone()));
    assert_eq!(extraction.next_process, Some(acquisition.id.clone()));
    assert!(check_process_links(&assay.process_sequence).is_empty());
    assert!(assay.graph().unwrap().is_acyclic());

    let ms = study.protocol("mass spectrometry").unwrap();
    assert!(ms.parameter("instrument").is_some());
}

#[test]
fn test_generation_is_deterministic() {
    let design = single_cell_design(3, plan_with(ms_graph(None)));
    assert_eq!(
        design.generate_investigation().unwrap(),
        design.generate_investigation().unwrap()
    );
}

#[test]
fn test_get_epoch() {
    let treatments = vec![(treatment("A"), None), (treatment("B"), None)];
    let design = StudyDesignFactory::compute_parallel_design(
        &treatments,
        &GroupSizes::Uniform(4),
        &Periods {
            screen: Some((
                NonTreatment::new(NonTreatmentType::Screen, 7.0, None),
                None,
            )),
            ..Default::default()
        },
    )
    .unwrap();
    let epoch = design.get_epoch(1).unwrap();
    assert_eq!(epoch.len(), 2);
    assert_eq!(epoch[0].unwrap().name, "ARM_00_CELL_01");
    assert!(matches!(
        design.get_epoch(2),
        Err(DesignError::EpochOutOfBounds(2))
    ));
}

#[test]
fn test_treatment_factory() {
    let mut factory = TreatmentFactory::new(InterventionType::Chemical);
    assert!(factory.compute_full_factorial_design().is_empty());
    factory.add_factor_value(AGENT_FACTOR, "aspirin").unwrap();
    factory.add_factor_value(AGENT_FACTOR, "placebo").unwrap();
    factory.add_factor_value(AGENT_FACTOR, "aspirin").unwrap();
    factory.add_factor_value(INTENSITY_FACTOR, 10.0).unwrap();
    factory.add_factor_value(DURATION_FACTOR, 7.0).unwrap();
    factory.add_factor_value(DURATION_FACTOR, 14.0).unwrap();
    assert!(factory.add_factor_value("colour", "red").is_err());

    let treatments = factory.compute_full_factorial_design();
    assert_eq!(treatments.len(), 4);
    assert_eq!(
        treatments[1].factor_value(AGENT_FACTOR),
        Some(&Value::Text("aspirin".into()))
    );
    assert_eq!(
        treatments[1].duration().map(|fv| &fv.value),
        Some(&Value::Number(14.0))
    );
    assert_eq!(treatments[3].intervention, InterventionType::Chemical);
}

#[test]
fn test_crossover_design() {
    let plan = plan_with(ms_graph(None));
    let treatments = vec![
        (treatment("A"), Some(plan.clone())),
        (treatment("B"), Some(plan)),
    ];
    let periods = Periods {
        screen: Some((NonTreatment::new(NonTreatmentType::Screen, 7.0, None), None)),
        washout: Some((NonTreatment::new(NonTreatmentType::Washout, 14.0, None), None)),
        follow_up: Some((NonTreatment::new(NonTreatmentType::FollowUp, 30.0, None), None)),
        ..Default::default()
    };
    let design = StudyDesignFactory::compute_crossover_design(
        &treatments,
        &GroupSizes::Uniform(10),
        &periods,
    )
    .unwrap();

    let names: Vec<&str> = design.arms().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["ARM_00", "ARM_01"]);
    let agents = |arm: &StudyArm| -> Vec<Value> {
        arm.treatments()
            .iter()
            .filter_map(|t| t.factor_value(AGENT_FACTOR).cloned())
            .collect()
    };
    assert_eq!(agents(&design.arms()[0]), vec!["A".into(), "B".into()]);
    assert_eq!(agents(&design.arms()[1]), vec!["B".into(), "A".into()]);

    let arm = &design.arms()[0];
    let shape: Vec<Option<NonTreatmentType>> = arm
        .cells()
        .map(|c| c.elements()[0].non_treatment_type())
        .collect();
    assert_eq!(
        shape,
        [
            Some(NonTreatmentType::Screen),
            None,
            Some(NonTreatmentType::Washout),
            None,
            Some(NonTreatmentType::FollowUp),
        ]
    );
    assert_eq!(arm.arm_map()[3].0.name, "ARM_00_CELL_03");

    let study = design.generate_study().unwrap();
    for group in ["GRP00", "GRP01"] {
        let sources = study
            .sources
            .iter()
            .filter(|s| s.name.starts_with(group))
            .count();
        assert_eq!(sources, 10);
    }
    // Two treatment cells per arm, ten subjects, one blood sample each
    assert_eq!(study.samples.len(), 40);
    assert_eq!(study.assays.len(), 1);
    assert_eq!(study.assays[0].samples.len(), 40);

    assert!(matches!(
        StudyDesignFactory::compute_crossover_design(
            &treatments,
            &GroupSizes::PerArm(vec![10]),
            &periods
        ),
        Err(DesignError::InvalidAttribute(_))
    ));
}

#[test]
fn test_factory_rejects_misplaced_periods() {
    let periods = Periods {
        screen: Some((NonTreatment::new(NonTreatmentType::Washout, 7.0, None), None)),
        ..Default::default()
    };
    assert!(StudyDesignFactory::compute_single_arm_design(&[], 3, &periods).is_err());
}

#[test]
fn test_single_arm_and_concomitant_designs() {
    let treatments = vec![(treatment("A"), None), (treatment("B"), None)];
    let periods = Periods {
        washout: Some((NonTreatment::new(NonTreatmentType::Washout, 14.0, None), None)),
        follow_up: Some((NonTreatment::new(NonTreatmentType::FollowUp, 30.0, None), None)),
        ..Default::default()
    };
    let design = StudyDesignFactory::compute_single_arm_design(&treatments, 3, &periods).unwrap();
    assert_eq!(design.arms().len(), 1);
    assert_eq!(design.arms()[0].len(), 4);

    let design = StudyDesignFactory::compute_concomitant_treatments_design(
        &[treatment("A"), treatment("B")],
        None,
        3,
        &periods,
    )
    .unwrap();
    let arm = &design.arms()[0];
    assert_eq!(arm.len(), 2);
    assert!(matches!(
        arm.arm_map()[0].0.items()[0],
        CellItem::Concomitant(ref set) if set.len() == 2
    ));
}

#[test]
fn test_qc_augmentation() {
    let mut qc = QualityControl::new(
        Some(ProductNode::new("qc_pre", ProductType::Sample, "pooled", 5).unwrap()),
        Some(ProductNode::new("qc_post", ProductType::Sample, "pooled", 5).unwrap()),
    )
    .unwrap();
    qc.add_interspersed(
        ProductNode::new("qc_int", ProductType::Sample, "pooled", 1).unwrap(),
        20,
    )
    .unwrap();
    let design = single_cell_design(40, plan_with(ms_graph(Some(qc))));
    let study = design.generate_study().unwrap();
    assert_eq!(study.assays[0].samples.len(), 40);

    let augmented = augment_study(&study, &design).unwrap();
    // The input study is left as it was
    assert_eq!(study.assays[0].samples.len(), 40);
    assert_eq!(interspersed_count(40, 20), 1);

    let samples = &augmented.assays[0].samples;
    assert_eq!(samples.len(), 40 + 5 + 5 + 1);
    assert!(samples[..5].iter().all(|s| s.name.starts_with("SMP-QC-PRE-")));
    assert!(samples[46..].iter().all(|s| s.name.starts_with("SMP-QC-POST-")));
    assert!(samples[25].name.starts_with("SMP-QC-INT0-"));
    assert!(!samples[24].name.starts_with("SMP-QC"));
    assert!(!samples[26].name.starts_with("SMP-QC"));

    assert_eq!(augmented.samples.len(), 51);
    assert_eq!(augmented.sources.len(), 40 + 11);
    let qc_sampling = augmented
        .process_sequence
        .iter()
        .filter(|p| p.parameter_values[0].value == Value::Text("-1".into()))
        .count();
    assert_eq!(qc_sampling, 11);
    assert_eq!(augmented.assays[0].data_files.len(), 51 * 2);
    assert!(augmented.graph().unwrap().is_acyclic());
}

#[test]
fn test_augmentation_without_qc_plan_is_identity() {
    let design = single_cell_design(4, plan_with(ms_graph(None)));
    let study = design.generate_study().unwrap();
    assert_eq!(augment_study(&study, &design).unwrap(), study);
}
