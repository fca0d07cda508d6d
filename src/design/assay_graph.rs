//! Assay graphs: workflow templates alternating protocol steps and products

use std::collections::HashSet;

use log::debug;

use crate::model::{Characteristic, OntologyAnnotation, ParameterValue, Value};

use super::plan::{ProductNode, ProductType, ProtocolNode, QualityControl, SequenceNode};
use super::DesignError;

/// A protocol step of a workflow
///
/// One protocol node is generated per combination of parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolStep {
    /// Protocol name
    pub name: String,
    /// Protocol type
    pub protocol_type: OntologyAnnotation,
    /// Parameter names with their alternative values
    pub parameters: Vec<(String, Vec<Value>)>,
    /// Processes generated per input
    pub replicates: usize,
}

impl ProtocolStep {
    /// A step without parameters run once per input
    pub fn new(name: &str, protocol_type: impl Into<OntologyAnnotation>) -> Self {
        Self {
            name: name.to_string(),
            protocol_type: protocol_type.into(),
            parameters: Vec::new(),
            replicates: 1,
        }
    }

    /// Add a parameter with its alternative values
    pub fn with_parameter(mut self, name: &str, values: Vec<Value>) -> Self {
        self.parameters.push((name.to_string(), values));
        self
    }

    /// Set the number of processes generated per input
    pub fn with_replicates(mut self, replicates: usize) -> Self {
        self.replicates = replicates;
        self
    }
}

/// A product produced by the preceding protocol step
#[derive(Debug, Clone, PartialEq)]
pub struct ProductStep {
    /// What the product is
    pub node_type: ProductType,
    /// Entities generated per process
    pub size: usize,
    /// Characteristic given to generated materials
    pub characteristic: Option<Characteristic>,
    /// Extension of generated data files
    pub extension: Option<String>,
}

impl ProductStep {
    /// A product generated `size` times per process
    pub fn new(node_type: ProductType, size: usize) -> Self {
        Self {
            node_type,
            size,
            characteristic: None,
            extension: None,
        }
    }

    /// Set the characteristic of generated materials
    pub fn with_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristic = Some(characteristic);
        self
    }

    /// Set the extension of generated data files
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = Some(extension.to_string());
        self
    }
}

/// One step of an ordered workflow description
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowStep {
    /// A protocol run on every node of the previous step
    Protocol(ProtocolStep),
    /// Named products of every node of the previous step
    Products {
        /// Name of the products, used in node ids and data file names
        name: String,
        /// Alternative products
        products: Vec<ProductStep>,
    },
}

/// A DAG of protocol and product nodes describing how samples are measured
#[derive(Debug, Clone, PartialEq)]
pub struct AssayGraph {
    /// Identifier, unique within a plan; prefixes generated names
    pub id: String,
    /// Measurement type of the generated assay
    pub measurement_type: OntologyAnnotation,
    /// Technology type of the generated assay
    pub technology_type: OntologyAnnotation,
    nodes: Vec<SequenceNode>,
    links: Vec<(usize, usize)>,
    /// Quality-control samples run with the real samples
    pub quality_control: Option<QualityControl>,
}

impl AssayGraph {
    /// Create an empty graph
    pub fn new(
        id: &str,
        measurement_type: impl Into<OntologyAnnotation>,
        technology_type: impl Into<OntologyAnnotation>,
    ) -> Self {
        Self {
            id: id.to_string(),
            measurement_type: measurement_type.into(),
            technology_type: technology_type.into(),
            nodes: Vec::new(),
            links: Vec::new(),
            quality_control: None,
        }
    }

    /// Attach a quality-control plan
    pub fn with_quality_control(mut self, quality_control: QualityControl) -> Self {
        self.quality_control = Some(quality_control);
        self
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[SequenceNode] {
        &self.nodes
    }

    /// Links as pairs of node ids, in insertion order
    pub fn links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links
            .iter()
            .map(|&(a, b)| (self.nodes[a].id(), self.nodes[b].id()))
    }

    /// Position of the node with the given id
    pub fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == id)
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&SequenceNode> {
        self.position(id).map(|i| &self.nodes[i])
    }

    /// Add a node; ids must be unique
    pub fn add_node(&mut self, node: impl Into<SequenceNode>) -> Result<(), DesignError> {
        let node = node.into();
        if self.position(node.id()).is_some() {
            return Err(DesignError::Duplicate {
                kind: "assay graph node",
                name: node.id().to_string(),
            });
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Link two nodes by id
    ///
    /// Product-to-product links are rejected: two products are always
    /// separated by the protocol that turns one into the other.
    pub fn add_link(&mut self, start: &str, target: &str) -> Result<(), DesignError> {
        let unknown = |name: &str| DesignError::UnknownNode {
            kind: "assay graph node",
            name: name.to_string(),
        };
        let a = self.position(start).ok_or_else(|| unknown(start))?;
        let b = self.position(target).ok_or_else(|| unknown(target))?;
        if a == b {
            return Err(DesignError::InvalidLink(format!(
                "node {} cannot link to itself",
                start
            )));
        }
        if !self.nodes[a].is_protocol() && !self.nodes[b].is_protocol() {
            return Err(DesignError::InvalidLink(
                "ProductNode->ProductNode links are not allowed in an assay workflow.".to_string(),
            ));
        }
        if !self.links.contains(&(a, b)) {
            self.links.push((a, b));
        }
        Ok(())
    }

    /// Positions of the nodes without incoming links
    pub fn start_nodes(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| !self.links.iter().any(|&(_, b)| b == i))
            .collect()
    }

    /// Positions of the nodes linked from `node`, in link order
    pub fn next_nodes(&self, node: usize) -> Vec<usize> {
        self.links
            .iter()
            .filter(|&&(a, _)| a == node)
            .map(|&(_, b)| b)
            .collect()
    }

    /// Positions of the nodes linking to `node`, in link order
    pub fn previous_nodes(&self, node: usize) -> Vec<usize> {
        self.links
            .iter()
            .filter(|&&(_, b)| b == node)
            .map(|&(a, _)| a)
            .collect()
    }

    /// The nearest protocol nodes upstream of `node`, looking through
    /// intermediate products
    pub fn previous_protocol_nodes(&self, node: usize) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut frontier = vec![node];
        while !frontier.is_empty() {
            let previous: Vec<usize> = frontier
                .iter()
                .flat_map(|&n| self.previous_nodes(n))
                .filter(|n| seen.insert(*n))
                .collect();
            let protocols: Vec<usize> = previous
                .iter()
                .copied()
                .filter(|&n| self.nodes[n].is_protocol())
                .collect();
            if !protocols.is_empty() {
                return protocols;
            }
            frontier = previous;
        }
        Vec::new()
    }

    /// Build a graph from ordered workflow steps
    ///
    /// Every step links each of its nodes to every node of the previous step.
    /// A protocol step yields one node per combination of its parameter
    /// values, with ids `name_000` on the first step and `name_000_000`
    /// (combination, predecessor) afterwards. A product step yields ids
    /// `name_000_000` (alternative, predecessor).
    pub fn from_workflow(
        id: &str,
        measurement_type: impl Into<OntologyAnnotation>,
        technology_type: impl Into<OntologyAnnotation>,
        steps: &[WorkflowStep],
        quality_control: Option<QualityControl>,
    ) -> Result<Self, DesignError> {
        let mut graph = Self::new(id, measurement_type, technology_type);
        graph.quality_control = quality_control;
        let mut previous: Vec<String> = Vec::new();

        for step in steps {
            let mut current = Vec::new();
            match step {
                WorkflowStep::Protocol(protocol) => {
                    let slug = slug(&protocol.name);
                    for (i, combination) in parameter_combinations(&protocol.parameters)
                        .into_iter()
                        .enumerate()
                    {
                        let template = |node_id: String| -> Result<ProtocolNode, DesignError> {
                            let node = ProtocolNode::new(
                                &node_id,
                                &protocol.name,
                                protocol.protocol_type.clone(),
                            )
                            .with_replicates(protocol.replicates)?;
                            Ok(combination.iter().cloned().fold(node, |node, pv| {
                                node.with_parameter_value(pv)
                            }))
                        };
                        if previous.is_empty() {
                            let node = template(format!("{}_{:03}", slug, i))?;
                            current.push(node.id.clone());
                            graph.add_node(node)?;
                        } else {
                            for (j, prev) in previous.iter().enumerate() {
                                let node = template(format!("{}_{:03}_{:03}", slug, i, j))?;
                                current.push(node.id.clone());
                                graph.add_node(node)?;
                                graph.add_link(prev, &current[current.len() - 1])?;
                            }
                        }
                    }
                }
                WorkflowStep::Products { name, products } => {
                    if previous.is_empty() {
                        return Err(DesignError::InvalidAttribute(format!(
                            "workflow of assay graph {} must start with a protocol step, not {}",
                            id, name
                        )));
                    }
                    let slug = slug(name);
                    for (i, product) in products.iter().enumerate() {
                        for (j, prev) in previous.iter().enumerate() {
                            let mut node = ProductNode::new(
                                &format!("{}_{:03}_{:03}", slug, i, j),
                                product.node_type,
                                name,
                                product.size,
                            )?;
                            node.characteristics.extend(product.characteristic.clone());
                            if let Some(extension) = &product.extension {
                                node = node.with_extension(extension);
                            }
                            current.push(node.id.clone());
                            graph.add_node(node)?;
                            graph.add_link(prev, &current[current.len() - 1])?;
                        }
                    }
                }
            }
            previous = current;
        }
        debug!(
            "Built assay graph {} with {} nodes and {} links",
            graph.id,
            graph.nodes.len(),
            graph.links.len()
        );
        Ok(graph)
    }
}

fn slug(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Cartesian product of parameter values, first parameter varying slowest
fn parameter_combinations(parameters: &[(String, Vec<Value>)]) -> Vec<Vec<ParameterValue>> {
    parameters
        .iter()
        .fold(vec![Vec::new()], |combinations, (name, values)| {
            combinations
                .iter()
                .flat_map(|prefix| {
                    values.iter().map(move |value| {
                        let mut combination = prefix.clone();
                        combination.push(ParameterValue::new(name, value.clone()));
                        combination
                    })
                })
                .collect()
        })
}
