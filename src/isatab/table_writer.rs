//! Writer for study and assay tables
//!
//! The process sequence is expanded into its source-to-sink paths and each
//! path becomes one row. Every node a path visits is assigned a slot, keyed
//! by its column label and how often that label already occurred on the
//! path; the header is the union of all slots, ordered along the longest
//! path. Rows that differ only in data-file cells are merged afterwards.

use std::collections::HashMap;
use std::io::Write;

use log::{debug, info, warn};

use super::columns::{assay_name_label, Column, LABEL};
use super::IsaTabError;
use crate::model::{
    Comment, DataFile, Material, MaterialKind, NodeId, OntologyAnnotation, Process, Protocol,
    ProvenanceGraph, Value,
};

/// Everything one table is written from
pub(crate) struct TableInput<'a> {
    pub materials: Vec<&'a Material>,
    pub data_files: &'a [DataFile],
    pub processes: &'a [Process],
    pub protocols: &'a [Protocol],
    pub technology_type: &'a str,
    /// Assay tables write samples by name only
    pub assay: bool,
    /// Write `Factor Value[x]` columns on sample slots
    pub factor_values: bool,
}

#[derive(Debug, Clone, Copy)]
enum NodeRef<'a> {
    Material(&'a Material),
    Data(&'a DataFile),
    Process(&'a Process),
}

impl<'a> NodeRef<'a> {
    fn slot_label(&self) -> String {
        match self {
            NodeRef::Material(m) => m.kind.column_label().to_string(),
            NodeRef::Data(d) => d.label.label().to_string(),
            NodeRef::Process(p) => format!("Protocol REF:{}", p.executes_protocol),
        }
    }

    fn identity(&self) -> &'a str {
        match *self {
            NodeRef::Material(m) => &m.name,
            NodeRef::Data(d) => &d.name,
            NodeRef::Process(p) => &p.executes_protocol,
        }
    }

    fn comments(&self) -> &'a [Comment] {
        match *self {
            NodeRef::Material(m) => &m.comments,
            NodeRef::Data(d) => &d.comments,
            NodeRef::Process(p) => &p.comments,
        }
    }

    /// Number of attribute columns the node would fill
    fn weight(&self) -> usize {
        match self {
            NodeRef::Material(m) => {
                m.characteristics.len() + m.factor_values.len() + m.comments.len()
            }
            NodeRef::Data(d) => d.comments.len(),
            NodeRef::Process(p) => {
                p.parameter_values.len() + p.comments.len() + usize::from(!p.name.is_empty())
            }
        }
    }

    fn is_data(&self) -> bool {
        matches!(self, NodeRef::Data(_))
    }
}

/// Slot key: column label plus occurrence index on the path
type SlotKey = (String, usize);

/// Qualifier columns following a value column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Shape {
    Plain,
    Annotated,
    WithUnit,
}

impl Shape {
    fn of(value: &Value, unit: Option<&OntologyAnnotation>) -> Self {
        if unit.is_some() {
            Shape::WithUnit
        } else if value.as_annotation().is_some() {
            Shape::Annotated
        } else {
            Shape::Plain
        }
    }

    fn qualifiers(self) -> Vec<Column> {
        match self {
            Shape::Plain => Vec::new(),
            Shape::Annotated => vec![Column::TermSourceRef, Column::TermAccession],
            Shape::WithUnit => vec![Column::Unit, Column::TermSourceRef, Column::TermAccession],
        }
    }

    fn cells(self, value: &Value, unit: Option<&OntologyAnnotation>) -> Vec<String> {
        match self {
            Shape::Plain => vec![value.to_string()],
            Shape::Annotated => match value.as_annotation() {
                Some(a) => vec![
                    a.term.clone(),
                    a.source_name().to_string(),
                    a.term_accession.clone(),
                ],
                None => vec![value.to_string(), String::new(), String::new()],
            },
            Shape::WithUnit => match unit {
                Some(u) => vec![
                    value.to_string(),
                    u.term.clone(),
                    u.source_name().to_string(),
                    u.term_accession.clone(),
                ],
                None => vec![value.to_string(), String::new(), String::new(), String::new()],
            },
        }
    }
}

/// Attribute columns of a slot, after the identity column
#[derive(Debug, Clone)]
enum Field {
    Label(Shape),
    Characteristic(String, Shape),
    FactorValue(String, Shape),
    ParameterValue(String, Shape),
    AssayName(String),
    Date,
    Performer,
    ArrayDesignRef,
    Comment(String),
}

impl Field {
    fn columns(&self) -> Vec<Column> {
        let (head, shape) = match self {
            Field::Label(s) => (Column::Label, Some(*s)),
            Field::Characteristic(c, s) => (Column::Characteristic(c.clone()), Some(*s)),
            Field::FactorValue(f, s) => (Column::FactorValue(f.clone()), Some(*s)),
            Field::ParameterValue(p, s) => (Column::ParameterValue(p.clone()), Some(*s)),
            Field::AssayName(label) => (Column::AssayName(label.clone()), None),
            Field::Performer => (Column::Performer, None),
            Field::Date => (Column::Date, None),
            Field::ArrayDesignRef => (Column::ArrayDesignRef, None),
            Field::Comment(c) => (Column::Comment(c.clone()), None),
        };
        let mut columns = vec![head];
        if let Some(shape) = shape {
            columns.extend(shape.qualifiers());
        }
        columns
    }

    fn cells(&self, node: NodeRef<'_>) -> Vec<String> {
        let cells = match (self, node) {
            (Field::Label(s), NodeRef::Material(m)) => m
                .characteristic(LABEL)
                .map(|c| s.cells(&c.value, c.unit.as_ref())),
            (Field::Characteristic(name, s), NodeRef::Material(m)) => m
                .characteristic(name)
                .map(|c| s.cells(&c.value, c.unit.as_ref())),
            (Field::FactorValue(name, s), NodeRef::Material(m)) => m
                .factor_values
                .iter()
                .find(|f| f.factor_name == *name)
                .map(|f| s.cells(&f.value, f.unit.as_ref())),
            (Field::ParameterValue(name, s), NodeRef::Process(p)) => p
                .parameter_values
                .iter()
                .find(|pv| pv.parameter_name == *name)
                .map(|pv| s.cells(&pv.value, pv.unit.as_ref())),
            (Field::AssayName(_), NodeRef::Process(p)) => Some(vec![p.name.clone()]),
            (Field::Performer, NodeRef::Process(p)) => p.performer.clone().map(|v| vec![v]),
            (Field::Date, NodeRef::Process(p)) => p.date.clone().map(|v| vec![v]),
            (Field::ArrayDesignRef, NodeRef::Process(p)) => {
                p.array_design_ref.clone().map(|v| vec![v])
            }
            (Field::Comment(name), node) => node
                .comments()
                .iter()
                .find(|c| c.name == *name)
                .map(|c| vec![c.value.clone()]),
            _ => None,
        };
        cells.unwrap_or_else(|| vec![String::new(); self.columns().len()])
    }
}

/// Insertion-ordered value columns, widening the shape as values are seen
#[derive(Default)]
struct ValueColumns(Vec<(String, Shape)>);

impl ValueColumns {
    fn add(&mut self, name: &str, shape: Shape) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, s)) => *s = (*s).max(shape),
            None => self.0.push((name.to_string(), shape)),
        }
    }
}

fn comment_fields(nodes: &[NodeRef<'_>]) -> Vec<Field> {
    let mut names: Vec<&str> = Vec::new();
    for node in nodes {
        for comment in node.comments() {
            if !names.contains(&comment.name.as_str()) {
                names.push(&comment.name);
            }
        }
    }
    names.into_iter().map(|n| Field::Comment(n.to_string())).collect()
}

/// A run of header columns owned by one node slot
struct Slot {
    identity: Column,
    fields: Vec<Field>,
    offset: usize,
}

struct TableWriter<'a> {
    input: &'a TableInput<'a>,
    nodes: HashMap<&'a NodeId, NodeRef<'a>>,
}

/// Write a study or assay table
pub(crate) fn write_table<W: Write>(
    input: &TableInput<'_>,
    max_paths: usize,
    writer: W,
) -> Result<(), IsaTabError> {
    let table_writer = TableWriter::new(input);
    let (columns, rows) = table_writer.render(max_paths)?;

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);
    csv_writer.write_record(columns.iter().map(Column::label))?;
    for row in &rows {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

impl<'a> TableWriter<'a> {
    fn new(input: &'a TableInput<'a>) -> Self {
        let mut nodes = HashMap::new();
        for &material in &input.materials {
            nodes.insert(&material.id, NodeRef::Material(material));
        }
        for data in input.data_files {
            nodes.insert(&data.id, NodeRef::Data(data));
        }
        for process in input.processes {
            nodes.insert(&process.id, NodeRef::Process(process));
        }
        Self { input, nodes }
    }

    /// Header columns and data rows
    fn render(&self, max_paths: usize) -> Result<(Vec<Column>, Vec<Vec<String>>), IsaTabError> {
        let graph = ProvenanceGraph::build(
            self.input.materials.iter().copied(),
            self.input.data_files,
            self.input.processes,
        )?;
        let paths = graph.all_paths(max_paths)?;
        let keyed: Vec<Vec<(SlotKey, NodeRef<'a>)>> =
            paths.iter().map(|path| self.keyed_path(path)).collect();

        let order = self.slot_order(&keyed);
        let mut members: HashMap<&SlotKey, Vec<NodeRef<'a>>> = HashMap::new();
        for path in &keyed {
            for (key, node) in path {
                members.entry(key).or_default().push(*node);
            }
        }

        let mut columns = Vec::new();
        let mut data_columns = Vec::new();
        let mut slots: HashMap<&SlotKey, Slot> = HashMap::new();
        for key in &order {
            let nodes = members.get(key).map(Vec::as_slice).unwrap_or(&[]);
            let Some(first) = nodes.first() else {
                continue;
            };
            let slot = self.slot(*first, nodes, columns.len());
            let width = 1 + slot.fields.iter().map(|f| f.columns().len()).sum::<usize>();
            columns.push(slot.identity.clone());
            for field in &slot.fields {
                columns.extend(field.columns());
            }
            data_columns.extend(std::iter::repeat(first.is_data()).take(width));
            slots.insert(key, slot);
        }

        let mut rows = Vec::with_capacity(keyed.len());
        for path in &keyed {
            let mut row = vec![String::new(); columns.len()];
            for (key, node) in path {
                let Some(slot) = slots.get(key) else {
                    continue;
                };
                let mut cells = vec![node.identity().to_string()];
                for field in &slot.fields {
                    cells.extend(field.cells(*node));
                }
                for (i, cell) in cells.into_iter().enumerate() {
                    row[slot.offset + i] = cell;
                }
            }
            rows.push(row);
        }
        let rows = reduce_rows(rows, &data_columns);
        info!(
            "Rendered {} paths into {} rows of {} columns",
            paths.len(),
            rows.len(),
            columns.len()
        );
        Ok((columns, rows))
    }

    /// Slot keys of the nodes along a path
    fn keyed_path(&self, path: &[NodeId]) -> Vec<(SlotKey, NodeRef<'a>)> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut keyed = Vec::with_capacity(path.len());
        for id in path {
            let Some(node) = self.nodes.get(id) else {
                warn!("Node {} is referenced by a process but not declared; skipping", id);
                continue;
            };
            let label = node.slot_label();
            let count = seen.entry(label.clone()).or_insert(0);
            keyed.push(((label, *count), *node));
            *count += 1;
        }
        keyed
    }

    /// Header order: the heaviest path first, then every missing slot
    /// inserted after its predecessor on the path that introduces it
    fn slot_order(&self, keyed: &[Vec<(SlotKey, NodeRef<'a>)>]) -> Vec<SlotKey> {
        let weight = |path: &Vec<(SlotKey, NodeRef<'a>)>| -> usize {
            path.len() + path.iter().map(|(_, n)| n.weight()).sum::<usize>()
        };
        let mut best: Option<(usize, usize)> = None;
        for (i, path) in keyed.iter().enumerate() {
            let w = weight(path);
            if best.map_or(true, |(_, bw)| w > bw) {
                best = Some((i, w));
            }
        }
        let Some((base, _)) = best else {
            return Vec::new();
        };
        let mut order: Vec<SlotKey> = keyed[base].iter().map(|(k, _)| k.clone()).collect();
        let mut is_data: HashMap<SlotKey, bool> = keyed[base]
            .iter()
            .map(|(k, n)| (k.clone(), n.is_data()))
            .collect();

        for path in keyed {
            for (i, (key, node)) in path.iter().enumerate() {
                if order.contains(key) {
                    continue;
                }
                let at = match i.checked_sub(1).map(|p| &path[p].0) {
                    Some(prev) => {
                        let mut at = order.iter().position(|k| k == prev).map_or(0, |p| p + 1);
                        if !node.is_data() {
                            while at < order.len() && is_data.get(&order[at]) == Some(&true) {
                                at += 1;
                            }
                        }
                        at
                    }
                    None => path[1..]
                        .iter()
                        .find_map(|(k, _)| order.iter().position(|o| o == k))
                        .unwrap_or(order.len()),
                };
                debug!("Inserting slot {:?} at column group {}", key, at);
                order.insert(at, key.clone());
                is_data.insert(key.clone(), node.is_data());
            }
        }
        order
    }

    fn slot(&self, first: NodeRef<'a>, nodes: &[NodeRef<'a>], offset: usize) -> Slot {
        match first {
            NodeRef::Material(m) => self.material_slot(m.kind, nodes, offset),
            NodeRef::Data(d) => Slot {
                identity: Column::Data(d.label),
                fields: comment_fields(nodes),
                offset,
            },
            NodeRef::Process(p) => self.process_slot(&p.executes_protocol, nodes, offset),
        }
    }

    fn material_slot(&self, kind: MaterialKind, nodes: &[NodeRef<'a>], offset: usize) -> Slot {
        let materials: Vec<&Material> = nodes
            .iter()
            .filter_map(|n| match n {
                NodeRef::Material(m) => Some(*m),
                _ => None,
            })
            .collect();
        let mut fields = Vec::new();
        let labeled = kind == MaterialKind::LabeledExtract;
        let identity_only = self.input.assay && kind == MaterialKind::Sample;

        if !identity_only {
            let mut label: Option<Shape> = None;
            let mut characteristics = ValueColumns::default();
            for m in &materials {
                for c in &m.characteristics {
                    let shape = Shape::of(&c.value, c.unit.as_ref());
                    if labeled && c.category.term == LABEL {
                        label = Some(label.map_or(shape, |s| s.max(shape)));
                    } else {
                        characteristics.add(&c.category.term, shape);
                    }
                }
            }
            fields.extend(label.map(Field::Label));
            fields.extend(
                characteristics
                    .0
                    .into_iter()
                    .map(|(name, shape)| Field::Characteristic(name, shape)),
            );
        }
        if kind == MaterialKind::Sample && self.input.factor_values {
            let mut factors = ValueColumns::default();
            for m in &materials {
                for f in &m.factor_values {
                    factors.add(&f.factor_name, Shape::of(&f.value, f.unit.as_ref()));
                }
            }
            fields.extend(
                factors
                    .0
                    .into_iter()
                    .map(|(name, shape)| Field::FactorValue(name, shape)),
            );
        }
        if !identity_only {
            fields.extend(comment_fields(nodes));
        }
        Slot {
            identity: Column::Material(kind),
            fields,
            offset,
        }
    }

    fn process_slot(&self, protocol: &str, nodes: &[NodeRef<'a>], offset: usize) -> Slot {
        let processes: Vec<&Process> = nodes
            .iter()
            .filter_map(|n| match n {
                NodeRef::Process(p) => Some(*p),
                _ => None,
            })
            .collect();
        let mut parameters = ValueColumns::default();
        for p in &processes {
            for pv in &p.parameter_values {
                parameters.add(&pv.parameter_name, Shape::of(&pv.value, pv.unit.as_ref()));
            }
        }
        let mut fields: Vec<Field> = parameters
            .0
            .into_iter()
            .map(|(name, shape)| Field::ParameterValue(name, shape))
            .collect();
        if processes.iter().any(|p| p.date.is_some()) {
            fields.push(Field::Date);
        }
        if processes.iter().any(|p| p.performer.is_some()) {
            fields.push(Field::Performer);
        }
        if processes.iter().any(|p| p.array_design_ref.is_some()) {
            fields.push(Field::ArrayDesignRef);
        }
        if processes.iter().any(|p| !p.name.is_empty()) {
            let label = match processes.iter().find_map(|p| p.name_label.as_deref()) {
                Some(label) => label.to_string(),
                None => {
                    let protocol_type = self
                        .input
                        .protocols
                        .iter()
                        .find(|p| p.name == protocol)
                        .map(|p| p.protocol_type.term.as_str())
                        .unwrap_or("");
                    assay_name_label(protocol_type, self.input.technology_type).to_string()
                }
            };
            fields.push(Field::AssayName(label));
        }
        fields.extend(comment_fields(nodes));
        Slot {
            identity: Column::ProtocolRef,
            fields,
            offset,
        }
    }
}

/// Merge rows that agree on every non-data cell and whose data cells do
/// not conflict, then order rows by their first cell
fn reduce_rows(rows: Vec<Vec<String>>, data_columns: &[bool]) -> Vec<Vec<String>> {
    let mut reduced: Vec<Vec<String>> = Vec::new();
    let mut groups: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for row in rows {
        let key: Vec<String> = row
            .iter()
            .zip(data_columns)
            .filter(|(_, data)| !**data)
            .map(|(cell, _)| cell.clone())
            .collect();
        let members = groups.entry(key).or_default();
        let target = members.iter().copied().find(|&i| {
            reduced[i]
                .iter()
                .zip(&row)
                .zip(data_columns)
                .all(|((a, b), data)| !*data || a == b || a.is_empty() || b.is_empty())
        });
        match target {
            Some(i) => {
                for (cell, new) in reduced[i].iter_mut().zip(row) {
                    if cell.is_empty() {
                        *cell = new;
                    }
                }
            }
            None => {
                members.push(reduced.len());
                reduced.push(row);
            }
        }
    }
    reduced.sort_by(|a, b| a.first().cmp(&b.first()));
    reduced
}
