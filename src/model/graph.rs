//! Provenance graph over material, data and process nodes
//!
//! A [`ProvenanceGraph`] is an index built from a study's or an assay's
//! process sequence. Canonical edge data lives on each [`Process`]'s
//! `inputs`/`outputs`; the graph only adds adjacency lists so paths can be
//! enumerated. Edges alternate between a process node and a material/data
//! node, except between chained processes: a process with no outputs whose
//! `next_process` has no inputs links to it directly.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use super::{DataFile, Material, ModelError, NodeId, Process};

/// Default cap on source-to-sink path enumeration
pub const DEFAULT_MAX_PATHS: usize = 100_000;

/// A node of the provenance graph, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphNode {
    /// Source, sample, extract or labeled extract
    Material(NodeId),
    /// Data file
    Data(NodeId),
    /// Protocol application
    Process(NodeId),
}

impl GraphNode {
    /// Identifier of the node
    pub fn id(&self) -> &NodeId {
        match self {
            GraphNode::Material(id) | GraphNode::Data(id) | GraphNode::Process(id) => id,
        }
    }

    /// True for process nodes
    pub fn is_process(&self) -> bool {
        matches!(self, GraphNode::Process(_))
    }
}

/// Directed acyclic graph connecting materials and data through processes
#[derive(Debug, Clone, Default)]
pub struct ProvenanceGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeId, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl ProvenanceGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of a process sequence
    ///
    /// Materials and data files are added first, in the given order, so start
    /// nodes come out in declaration order. Process inputs or outputs that are
    /// not declared are added as material nodes.
    pub fn build<'a>(
        materials: impl IntoIterator<Item = &'a Material>,
        data_files: impl IntoIterator<Item = &'a DataFile>,
        processes: &[Process],
    ) -> Result<Self, ModelError> {
        let mut graph = Self::new();
        for material in materials {
            graph.add_node(GraphNode::Material(material.id.clone()));
        }
        for data in data_files {
            graph.add_node(GraphNode::Data(data.id.clone()));
        }
        for process in processes {
            graph.add_node(GraphNode::Process(process.id.clone()));
        }
        for process in processes {
            for input in &process.inputs {
                if !graph.contains(input) {
                    graph.add_node(GraphNode::Material(input.clone()));
                }
                graph.add_edge(input, &process.id)?;
            }
            for output in &process.outputs {
                if !graph.contains(output) {
                    graph.add_node(GraphNode::Material(output.clone()));
                }
                graph.add_edge(&process.id, output)?;
            }
        }
        for (i, j) in chained_pairs(processes) {
            graph.add_chain_edge(&processes[i].id, &processes[j].id);
        }
        Ok(graph)
    }

    fn add_chain_edge(&mut self, from: &NodeId, to: &NodeId) {
        if let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) {
            if !self.successors[a].contains(&b) {
                self.successors[a].push(b);
                self.predecessors[b].push(a);
            }
        }
    }

    /// Add a node; adding an identifier twice returns the existing slot
    pub fn add_node(&mut self, node: GraphNode) -> usize {
        if let Some(&idx) = self.index.get(node.id()) {
            return idx;
        }
        let idx = self.nodes.len();
        self.index.insert(node.id().clone(), idx);
        self.nodes.push(node);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        idx
    }

    /// Add a directed edge between two existing nodes
    ///
    /// Exactly one endpoint must be a process node.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) -> Result<(), ModelError> {
        let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) else {
            return Err(ModelError::InvalidEdge(format!(
                "{} -> {}: both endpoints must be added first",
                from, to
            )));
        };
        if self.nodes[a].is_process() == self.nodes[b].is_process() {
            return Err(ModelError::InvalidEdge(format!(
                "{} -> {}: edges must alternate between processes and materials/data",
                from, to
            )));
        }
        if !self.successors[a].contains(&b) {
            self.successors[a].push(b);
            self.predecessors[b].push(a);
        }
        Ok(())
    }

    /// True when a node with this identifier exists
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Look up a node
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Direct successors of a node
    pub fn successors(&self, id: &NodeId) -> Vec<&NodeId> {
        self.neighbours(id, &self.successors)
    }

    /// Direct predecessors of a node
    pub fn predecessors(&self, id: &NodeId) -> Vec<&NodeId> {
        self.neighbours(id, &self.predecessors)
    }

    fn neighbours<'a>(&'a self, id: &NodeId, adjacency: &'a [Vec<usize>]) -> Vec<&'a NodeId> {
        match self.index.get(id) {
            Some(&idx) => adjacency[idx].iter().map(|&n| self.nodes[n].id()).collect(),
            None => Vec::new(),
        }
    }

    /// Nodes with no incoming edge, in insertion order
    ///
    /// A process is a start node only when it has no inputs at all.
    pub fn start_nodes(&self) -> Vec<&NodeId> {
        (0..self.nodes.len())
            .filter(|&i| self.predecessors[i].is_empty())
            .map(|i| self.nodes[i].id())
            .collect()
    }

    /// Nodes with no outgoing edge, in insertion order
    pub fn end_nodes(&self) -> Vec<&NodeId> {
        (0..self.nodes.len())
            .filter(|&i| self.successors[i].is_empty())
            .map(|i| self.nodes[i].id())
            .collect()
    }

    /// Enumerate every simple path from a start node to an end node
    ///
    /// Fails with [`ModelError::GraphTooComplex`] once more than `limit`
    /// paths have been found.
    pub fn all_paths(&self, limit: usize) -> Result<Vec<Vec<NodeId>>, ModelError> {
        let mut paths = Vec::new();
        let mut on_path = vec![false; self.nodes.len()];
        let mut current = Vec::new();
        for start in 0..self.nodes.len() {
            if self.predecessors[start].is_empty() {
                self.walk(start, &mut current, &mut on_path, &mut paths, limit)?;
            }
        }
        debug!("Enumerated {} paths over {} nodes", paths.len(), self.nodes.len());
        Ok(paths)
    }

    fn walk(
        &self,
        node: usize,
        current: &mut Vec<usize>,
        on_path: &mut [bool],
        paths: &mut Vec<Vec<NodeId>>,
        limit: usize,
    ) -> Result<(), ModelError> {
        current.push(node);
        on_path[node] = true;
        let next: Vec<usize> = self.successors[node]
            .iter()
            .copied()
            .filter(|&n| !on_path[n])
            .collect();
        if next.is_empty() {
            if paths.len() >= limit {
                return Err(ModelError::GraphTooComplex { limit });
            }
            paths.push(current.iter().map(|&i| self.nodes[i].id().clone()).collect());
        } else {
            for n in next {
                self.walk(n, current, on_path, paths, limit)?;
            }
        }
        on_path[node] = false;
        current.pop();
        Ok(())
    }

    /// The path maximising `len + sum(weight(node))`
    ///
    /// Ties go to the earliest path, so the result is deterministic for a
    /// deterministic enumeration order.
    pub fn longest_path<'p, F>(paths: &'p [Vec<NodeId>], weight: F) -> Option<&'p Vec<NodeId>>
    where
        F: Fn(&NodeId) -> usize,
    {
        let mut best: Option<(&Vec<NodeId>, usize)> = None;
        for path in paths {
            let score = path.len() + path.iter().map(&weight).sum::<usize>();
            match best {
                Some((_, s)) if s >= score => {}
                _ => best = Some((path, score)),
            }
        }
        best.map(|(path, _)| path)
    }

    /// True when the graph has no directed cycle
    pub fn is_acyclic(&self) -> bool {
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut queue: Vec<usize> = (0..self.nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0;
        while let Some(n) = queue.pop() {
            visited += 1;
            for &s in &self.successors[n] {
                in_degree[s] -= 1;
                if in_degree[s] == 0 {
                    queue.push(s);
                }
            }
        }
        visited == self.nodes.len()
    }
}

/// `(P, Q)` index pairs where P has no outputs, Q has no inputs and
/// `P.next_process` is Q
fn chained_pairs(processes: &[Process]) -> Vec<(usize, usize)> {
    let position: HashMap<&NodeId, usize> =
        processes.iter().enumerate().map(|(i, p)| (&p.id, i)).collect();
    processes
        .iter()
        .enumerate()
        .filter(|(_, p)| p.outputs.is_empty())
        .filter_map(|(i, p)| {
            let j = *position.get(p.next_process.as_ref()?)?;
            (i != j && processes[j].inputs.is_empty()).then_some((i, j))
        })
        .collect()
}

/// For each process, the processes that consume one of its outputs and the
/// processes that produce one of its inputs
///
/// Chained processes count as adjacent.
fn process_neighbours(processes: &[Process]) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
    let mut producers: HashMap<&NodeId, Vec<usize>> = HashMap::new();
    for (i, process) in processes.iter().enumerate() {
        for output in &process.outputs {
            producers.entry(output).or_default().push(i);
        }
    }
    let mut next = vec![Vec::new(); processes.len()];
    let mut prev = vec![Vec::new(); processes.len()];
    for (j, process) in processes.iter().enumerate() {
        for input in &process.inputs {
            for &i in producers.get(input).map(Vec::as_slice).unwrap_or(&[]) {
                if i != j && !next[i].contains(&j) {
                    next[i].push(j);
                    prev[j].push(i);
                }
            }
        }
    }
    for (i, j) in chained_pairs(processes) {
        if !next[i].contains(&j) {
            next[i].push(j);
            prev[j].push(i);
        }
    }
    (next, prev)
}

/// Set prev/next pointers between processes that form a linear chain
///
/// A pointer pair is set only when P's outputs feed exactly one process Q and
/// Q's inputs come from exactly one process P. Pointers already bound to a
/// different process are kept; each such conflict is logged and counted.
pub fn link_linear_processes(processes: &mut [Process]) -> usize {
    let (next, prev) = process_neighbours(processes);
    let mut conflicts = 0;
    for i in 0..processes.len() {
        let [j] = next[i].as_slice() else {
            continue;
        };
        let j = *j;
        if prev[j] != [i] {
            continue;
        }
        let (p_id, q_id) = (processes[i].id.clone(), processes[j].id.clone());
        match &processes[i].next_process {
            None => processes[i].next_process = Some(q_id.clone()),
            Some(existing) if *existing != q_id => {
                warn!(
                    "Process {} already links to {}, not {}; keeping the first binding",
                    p_id, existing, q_id
                );
                conflicts += 1;
                continue;
            }
            Some(_) => {}
        }
        match &processes[j].previous_process {
            None => processes[j].previous_process = Some(p_id),
            Some(existing) if *existing != p_id => {
                warn!(
                    "Process {} already follows {}, not {}; keeping the first binding",
                    q_id, existing, p_id
                );
                conflicts += 1;
            }
            Some(_) => {}
        }
    }
    conflicts
}

/// Prev/next pointers that disagree with the input/output edges
///
/// Returns a message for every pointer naming an unknown process, a process
/// that is not adjacent through a shared material/data node, or a partner
/// whose reverse pointer names someone else.
pub fn check_process_links(processes: &[Process]) -> Vec<String> {
    let (next, prev) = process_neighbours(processes);
    let position: HashMap<&NodeId, usize> =
        processes.iter().enumerate().map(|(i, p)| (&p.id, i)).collect();
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    for (i, process) in processes.iter().enumerate() {
        if let Some(target) = &process.next_process {
            match position.get(target) {
                None => problems.push(format!(
                    "Process {} points to unknown next process {}",
                    process.id, target
                )),
                Some(&j) if !next[i].contains(&j) => problems.push(format!(
                    "Process {} points to next process {} which consumes none of its outputs",
                    process.id, target
                )),
                Some(&j) => {
                    if let Some(back) = &processes[j].previous_process {
                        if *back != process.id && seen.insert((i, j)) {
                            problems.push(format!(
                                "Process {} points to {} whose previous process is {}",
                                process.id, target, back
                            ));
                        }
                    }
                }
            }
        }
        if let Some(source) = &process.previous_process {
            match position.get(source) {
                None => problems.push(format!(
                    "Process {} points to unknown previous process {}",
                    process.id, source
                )),
                Some(&j) if !prev[i].contains(&j) => problems.push(format!(
                    "Process {} points to previous process {} which produces none of its inputs",
                    process.id, source
                )),
                Some(_) => {}
            }
        }
    }
    problems
}
