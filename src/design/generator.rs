//! Turning a study design into a populated study
//!
//! Generation is pure and deterministic: arms are visited by name, cells in
//! arm order, sample types and assay graphs in plan order, and every name is
//! minted from counters.

use std::collections::HashMap;

use log::{debug, info};

use crate::model::{
    Assay, Comment, DataFile, DataFileLabel, FactorValue, Investigation, Material, NodeId,
    OntologyAnnotation, OntologySource, ParameterValue, Process, Protocol, ProtocolParameter,
    Study, StudyFactor,
};

use super::arm::{StudyArm, NCIT};
use super::assay_graph::AssayGraph;
use super::cell::StudyCell;
use super::element::base_factors;
use super::plan::{ProductNode, ProductType, SampleAndAssayPlan, SequenceNode};
use super::DesignError;

/// Factor recording the position of a cell in its arm
pub const SEQUENCE_ORDER_FACTOR: &str = "Sequence Order";
/// Sample comment telling whether the sample was taken during a treatment
pub const TREATMENT_STEP_COMMENT: &str = "study step with treatment";
/// Protocol executed by every sampling process
pub const SAMPLING_PROTOCOL: &str = "sample collection";
/// Sampling parameter holding the running sample count
pub const RUN_ORDER_PARAMETER: &str = "run order";
/// Sampling parameter holding the cell name
pub const STUDY_STEP_PARAMETER: &str = "study step";
/// Performer of generated processes
pub const DEFAULT_PERFORMER: &str = "Unknown";

pub(crate) const GROUP_PREFIX: &str = "GRP";
pub(crate) const SUBJECT_PREFIX: &str = "SBJ";
pub(crate) const SAMPLE_PREFIX: &str = "SMP";
pub(crate) const EXTRACT_PREFIX: &str = "EXTR";
pub(crate) const LABELED_EXTRACT_PREFIX: &str = "LBLEXTR";

/// A complete study design: arms of cells with their sampling plans
#[derive(Debug, Clone, PartialEq)]
pub struct StudyDesign {
    /// Identifier of the generated study
    pub identifier: String,
    /// Title of the generated study
    pub name: String,
    /// Description of the generated study
    pub description: String,
    /// Design type, recorded as a study design descriptor
    pub design_type: Option<OntologyAnnotation>,
    arms: Vec<StudyArm>,
}

impl StudyDesign {
    /// Create a design without arms
    pub fn new(identifier: &str, name: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            name: name.to_string(),
            description: String::new(),
            design_type: None,
            arms: Vec::new(),
        }
    }

    /// Arms, sorted by name
    pub fn arms(&self) -> &[StudyArm] {
        &self.arms
    }

    /// Add an arm; names must be unique
    pub fn add_arm(&mut self, arm: StudyArm) -> Result<(), DesignError> {
        match self.arms.binary_search_by(|a| a.name.cmp(&arm.name)) {
            Ok(_) => Err(DesignError::Duplicate {
                kind: "study arm",
                name: arm.name,
            }),
            Err(position) => {
                self.arms.insert(position, arm);
                Ok(())
            }
        }
    }

    /// The cell at position `index` of every arm, `None` for arms shorter
    /// than that
    pub fn get_epoch(&self, index: usize) -> Result<Vec<Option<&StudyCell>>, DesignError> {
        let cells: Vec<Option<&StudyCell>> = self
            .arms
            .iter()
            .map(|arm| arm.arm_map().get(index).map(|(cell, _)| cell))
            .collect();
        if cells.iter().all(Option::is_none) {
            return Err(DesignError::EpochOutOfBounds(index));
        }
        Ok(cells)
    }

    /// File name of the generated study table
    pub fn study_filename(&self) -> String {
        format!("s_{}.txt", urlify(&self.identifier))
    }

    /// Generate the study: subjects, samples, sampling processes and one
    /// expanded assay per assay graph
    pub fn generate_study(&self) -> Result<Study, DesignError> {
        let mut study = Study::new(&self.identifier, &self.study_filename());
        study.title = self.name.clone();
        study.description = self.description.clone();
        study.design_descriptors.extend(self.design_type.clone());
        study.add_protocol(sampling_protocol())?;
        study.add_factor(StudyFactor::new(SEQUENCE_ORDER_FACTOR, "sequence order"))?;

        let mut sampler = Sampler {
            study,
            run_order: 0,
        };
        let mut batches: Vec<(&AssayGraph, Vec<Material>)> = Vec::new();

        for (group, arm) in self.arms.iter().enumerate() {
            let sources = sampler.add_sources(arm, group);
            for (epoch, (cell, plan)) in arm.arm_map().iter().enumerate() {
                let Some(plan) = plan else {
                    continue;
                };
                let by_type = sampler.add_samples(&sources, cell, epoch, plan)?;
                for graph in plan.assay_plan() {
                    let position = match batches.iter().position(|(g, _)| g.id == graph.id) {
                        Some(position) => position,
                        None => {
                            batches.push((graph, Vec::new()));
                            batches.len() - 1
                        }
                    };
                    for (node, samples) in plan.sample_plan().iter().zip(&by_type) {
                        if plan.is_mapped(&node.id, &graph.id) {
                            batches[position].1.extend(samples.iter().cloned());
                        }
                    }
                }
            }
        }

        let mut study = sampler.study;
        for (graph, samples) in batches {
            declare_assay_protocols(&mut study, graph)?;
            let assay = generate_assay(graph, &samples)?;
            info!(
                "Generated assay {} with {} samples and {} processes",
                assay.filename,
                assay.samples.len(),
                assay.process_sequence.len()
            );
            study.assays.push(assay);
        }
        info!(
            "Generated study {} with {} sources and {} samples",
            study.identifier,
            study.sources.len(),
            study.samples.len()
        );
        Ok(study)
    }

    /// Generate an investigation holding the generated study
    pub fn generate_investigation(&self) -> Result<Investigation, DesignError> {
        let mut investigation = Investigation::new(&format!("i_{}", self.identifier));
        investigation.title = self.name.clone();
        investigation.add_ontology_source(
            OntologySource::new(NCIT)
                .with_file("http://purl.obolibrary.org/obo/ncit.owl")
                .with_description("NCI Thesaurus"),
        )?;
        investigation.studies.push(self.generate_study()?);
        Ok(investigation)
    }
}

fn sampling_protocol() -> Protocol {
    Protocol::new(SAMPLING_PROTOCOL, SAMPLING_PROTOCOL)
        .with_parameter(RUN_ORDER_PARAMETER)
        .with_parameter(STUDY_STEP_PARAMETER)
}

/// Replace whitespace with `_` and drop characters unsafe in file names
pub(crate) fn urlify(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect()
}

pub(crate) fn assay_filename(graph: &AssayGraph) -> String {
    urlify(&format!(
        "a_{}_{}_{}.txt",
        graph.id, graph.measurement_type.term, graph.technology_type.term
    ))
}

/// Mints study subjects, samples and sampling processes
pub(crate) struct Sampler {
    pub(crate) study: Study,
    pub(crate) run_order: usize,
}

impl Sampler {
    fn add_sources(&mut self, arm: &StudyArm, group: usize) -> Vec<Material> {
        let sources: Vec<Material> = (1..=arm.group_size)
            .map(|subject| {
                let name = format!(
                    "{}{:02}_{}{:03}",
                    GROUP_PREFIX, group, SUBJECT_PREFIX, subject
                );
                let mut source = Material::source(&name).with_characteristic(arm.source_type.clone());
                source
                    .characteristics
                    .extend(arm.source_characteristics.iter().cloned());
                source
            })
            .collect();
        debug!("Arm {}: {} subjects", arm.name, sources.len());
        self.study.sources.extend(sources.iter().cloned());
        sources
    }

    /// Samples of every sample type of the plan, grouped by type
    fn add_samples(
        &mut self,
        sources: &[Material],
        cell: &StudyCell,
        epoch: usize,
        plan: &SampleAndAssayPlan,
    ) -> Result<Vec<Vec<Material>>, DesignError> {
        let mut factor_values = vec![FactorValue::new(SEQUENCE_ORDER_FACTOR, epoch as i64)];
        for element in cell.elements() {
            for value in element.factor_values() {
                self.declare_factor(&value.factor_name)?;
                factor_values.push(value.clone());
            }
        }
        let with_treatment = if cell.has_treatments() { "YES" } else { "NO" };

        let mut by_type = Vec::new();
        for node in plan.sample_plan() {
            let term = node.type_term().replace(' ', "-");
            let mut samples = Vec::new();
            for source in sources {
                for n in 1..=node.size() {
                    let name = format!(
                        "{}_{}_{}-{}-{:03}",
                        source.name, cell.name, SAMPLE_PREFIX, term, n
                    );
                    let mut sample = Material::sample(&name);
                    sample.characteristics = node.characteristics.clone();
                    for value in &factor_values {
                        sample.add_factor_value(value.clone())?;
                    }
                    sample
                        .comments
                        .push(Comment::new(TREATMENT_STEP_COMMENT, with_treatment));
                    samples.push(self.add_sampled(source, sample, &cell.name)?);
                }
            }
            by_type.push(samples);
        }
        Ok(by_type)
    }

    /// Record a sample taken from a source, with its sampling process
    fn add_sampled(
        &mut self,
        source: &Material,
        mut sample: Material,
        study_step: &str,
    ) -> Result<Material, DesignError> {
        self.run_order += 1;
        let run_order = format!("{:03}", self.run_order);
        self.add_sampled_with_run_order(source, &mut sample, &run_order, study_step)?;
        self.study.samples.push(sample.clone());
        Ok(sample)
    }

    pub(crate) fn add_sampled_with_run_order(
        &mut self,
        source: &Material,
        sample: &mut Material,
        run_order: &str,
        study_step: &str,
    ) -> Result<(), DesignError> {
        sample.add_derives_from(&source.id)?;
        let mut process = Process::new(
            NodeId::process(self.study.process_sequence.len()),
            SAMPLING_PROTOCOL,
        );
        process.performer = Some(DEFAULT_PERFORMER.to_string());
        process.set_parameter_values([
            ParameterValue::new(RUN_ORDER_PARAMETER, run_order),
            ParameterValue::new(STUDY_STEP_PARAMETER, study_step),
        ]);
        process.add_input(&source.id)?;
        process.add_output(&sample.id)?;
        self.study.process_sequence.push(process);
        Ok(())
    }

    fn declare_factor(&mut self, name: &str) -> Result<(), DesignError> {
        if self.study.factor(name).is_none() {
            let factor = base_factors()
                .into_iter()
                .find(|f| f.name == name)
                .unwrap_or_else(|| StudyFactor::new(name, name));
            self.study.add_factor(factor)?;
        }
        Ok(())
    }
}

/// Declare the protocols of an assay graph, merging the parameters of
/// protocol nodes sharing a name
fn declare_assay_protocols(study: &mut Study, graph: &AssayGraph) -> Result<(), DesignError> {
    for node in graph.nodes() {
        let SequenceNode::Protocol(node) = node else {
            continue;
        };
        if study.protocol(&node.name).is_none() {
            study.add_protocol(Protocol::new(&node.name, node.protocol_type.clone()))?;
        }
        let Some(protocol) = study.protocols.iter_mut().find(|p| p.name == node.name) else {
            continue;
        };
        for value in &node.parameter_values {
            if protocol.parameter(&value.parameter_name).is_none() {
                protocol
                    .parameters
                    .push(ProtocolParameter::new(&value.parameter_name));
            }
        }
    }
    Ok(())
}

fn raw_data_label(graph: &AssayGraph) -> DataFileLabel {
    match graph.technology_type.term.as_str() {
        "mass spectrometry" => DataFileLabel::RawSpectralData,
        "NMR spectroscopy" => DataFileLabel::FreeInductionDecayData,
        "DNA microarray" => DataFileLabel::ArrayData,
        _ => DataFileLabel::RawData,
    }
}

/// Expand an assay graph over a batch of samples
///
/// Every start node is instantiated once per sample and replicate; each
/// such walk follows the links forward, instantiating `size` products or
/// `replicates` processes per visited node. Names carry the graph id, the
/// walk number and a per-walk counter.
pub(crate) fn generate_assay(
    graph: &AssayGraph,
    samples: &[Material],
) -> Result<Assay, DesignError> {
    let mut assay = Assay::new(&assay_filename(graph));
    assay.measurement_type = graph.measurement_type.clone();
    assay.technology_type = graph.technology_type.clone();
    assay.samples = samples.to_vec();

    let mut expander = Expander {
        graph,
        label: raw_data_label(graph),
        assay,
    };
    for (i, &start) in graph.start_nodes().iter().enumerate() {
        let size = graph.nodes()[start].multiplicity();
        for (j, sample) in samples.iter().enumerate() {
            for k in 0..size {
                let mut walk = Walk {
                    start_index: i * samples.len() * size + j * size + k + 1,
                    counters: HashMap::new(),
                    processes: Vec::new(),
                };
                expander.visit(start, Some(&sample.id), &mut walk)?;
            }
        }
    }
    Ok(expander.assay)
}

enum Created {
    Process(usize),
    Node(NodeId),
}

struct Walk {
    start_index: usize,
    counters: HashMap<String, usize>,
    /// Graph node and process position of every process minted so far
    processes: Vec<(usize, usize)>,
}

impl Walk {
    fn bump(&mut self, key: &str) -> usize {
        let counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

struct Expander<'g> {
    graph: &'g AssayGraph,
    label: DataFileLabel,
    assay: Assay,
}

impl Expander<'_> {
    fn visit(
        &mut self,
        node: usize,
        input: Option<&NodeId>,
        walk: &mut Walk,
    ) -> Result<Created, DesignError> {
        let graph = self.graph;
        let created = match &graph.nodes()[node] {
            SequenceNode::Protocol(protocol) => {
                let n = walk.bump(&protocol.name);
                let index = self.assay.process_sequence.len();
                let mut process = Process::new(NodeId::process(index), &protocol.name);
                process.name = format!(
                    "{}-S{:03}-{}-R{:03}",
                    graph.id,
                    walk.start_index,
                    urlify(&protocol.name),
                    n
                );
                process.performer = Some(DEFAULT_PERFORMER.to_string());
                process.parameter_values = protocol.parameter_values.clone();
                if let Some(input) = input {
                    process.add_input(input)?;
                }
                self.link_upstream(&mut process, node, walk);
                self.assay.process_sequence.push(process);
                walk.processes.push((node, index));
                Created::Process(index)
            }
            SequenceNode::Product(product) => Created::Node(self.mint_product(product, walk)?),
        };

        for next in graph.next_nodes(node) {
            for _ in 0..graph.nodes()[next].multiplicity() {
                match &created {
                    Created::Process(index) => {
                        if let Created::Node(output) = self.visit(next, None, walk)? {
                            self.assay.process_sequence[*index].add_output(&output)?;
                        }
                    }
                    Created::Node(id) => {
                        self.visit(next, Some(id), walk)?;
                    }
                }
            }
        }
        Ok(created)
    }

    /// Point a new process at the latest process of this walk that ran the
    /// nearest upstream protocol; the upstream pointer is only set once
    fn link_upstream(&mut self, process: &mut Process, node: usize, walk: &Walk) {
        for upstream in self.graph.previous_protocol_nodes(node) {
            let Some(&(_, index)) = walk.processes.iter().rev().find(|(n, _)| *n == upstream)
            else {
                continue;
            };
            let previous = &mut self.assay.process_sequence[index];
            process.previous_process = Some(previous.id.clone());
            if previous.next_process.is_none() {
                previous.next_process = Some(process.id.clone());
            }
            return;
        }
    }

    fn mint_product(&mut self, product: &ProductNode, walk: &mut Walk) -> Result<NodeId, DesignError> {
        let prefix = format!("{}-S{:03}", self.graph.id, walk.start_index);
        let kind = match product.node_type {
            ProductType::DataFile => {
                let n = walk.bump(&product.name);
                let extension = product
                    .extension
                    .as_ref()
                    .map(|e| format!(".{}", e))
                    .unwrap_or_default();
                let name = format!("{}-{}-R{:03}{}", prefix, urlify(&product.name), n, extension);
                let file = DataFile::new(self.label, &name);
                let id = file.id.clone();
                self.assay.data_files.push(file);
                return Ok(id);
            }
            ProductType::Source => {
                return Err(DesignError::InvalidAttribute(format!(
                    "source node {} cannot appear in assay graph {}",
                    product.id, self.graph.id
                )))
            }
            other => other,
        };
        let abbreviation = match kind {
            ProductType::Sample => SAMPLE_PREFIX,
            ProductType::Extract => EXTRACT_PREFIX,
            _ => LABELED_EXTRACT_PREFIX,
        };
        let n = walk.bump(abbreviation);
        let name = format!("{}-{}-R{:03}", prefix, abbreviation, n);
        let Some(material_kind) = kind.material_kind() else {
            return Err(DesignError::InvalidAttribute(format!(
                "product node {} does not describe a material",
                product.id
            )));
        };
        let mut material = Material::new(material_kind, &name);
        material.characteristics = product.characteristics.clone();
        let id = material.id.clone();
        if kind == ProductType::Sample {
            self.assay.samples.push(material);
        } else {
            self.assay.other_materials.push(material);
        }
        Ok(id)
    }
}
