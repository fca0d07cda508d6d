//! Reader for study (`s_*.txt`) and assay (`a_*.txt`) tables
//!
//! A table encodes a fragment of the provenance graph by column adjacency.
//! Columns are grouped into objects, each spanning from an identity column
//! (`Source Name`, `Protocol REF`, `Raw Data File`, ...) up to the next one.
//! Material and data nodes are minted per distinct cell value; process nodes
//! are minted per distinct process key, so rows that share a key pool or
//! split through one process.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use log::{debug, info, warn};

use super::columns::{assay_name_label, Column, LABEL, MATERIAL_TYPE};
use super::{decode_text, IsaTabError};
use crate::model::graph::link_linear_processes;
use crate::model::{
    is_extended_date, Characteristic, Comment, DataFile, FactorValue, Material, MaterialKind,
    NodeId, OntologyAnnotation, OntologySource, ParameterValue, Process, Protocol, StudyFactor,
    Value, UNKNOWN_PROTOCOL,
};

/// Declarations a table is resolved against
pub(crate) struct TableContext<'a> {
    pub protocols: &'a [Protocol],
    pub factors: &'a [StudyFactor],
    pub term_sources: &'a [OntologySource],
    /// Study samples, when reading an assay table
    pub study_samples: Option<&'a [Material]>,
    /// Technology type of the assay, empty for study tables
    pub technology_type: &'a str,
}

/// Nodes and processes read from one table
#[derive(Debug, Default)]
pub(crate) struct ParsedTable {
    pub materials: Vec<Material>,
    pub data_files: Vec<DataFile>,
    pub processes: Vec<Process>,
    pub uses_unknown_protocol: bool,
}

/// A header column; `source` is `None` for an inserted `Protocol REF`
#[derive(Debug, Clone)]
struct TableColumn {
    column: Column,
    source: Option<usize>,
}

/// Column span of one object
#[derive(Debug, Clone, Copy)]
struct Object {
    start: usize,
    end: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum Last {
    Material,
    Data,
    Process,
}

/// Read raw rows of a TSV table, skipping comment and blank lines
///
/// Returns `(line_number, cells)` pairs with trimmed cells.
pub(crate) fn read_records<R: Read>(
    mut reader: R,
    name: &str,
) -> Result<Vec<(usize, Vec<String>)>, IsaTabError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = decode_text(&bytes, name);

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .has_headers(false)
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        records.push((line, cells));
    }
    Ok(records)
}

struct TableReader<'a> {
    ctx: &'a TableContext<'a>,
    columns: Vec<TableColumn>,
    objects: Vec<Object>,
    /// Object index owning each column
    owner: Vec<usize>,
    warned_sources: HashSet<String>,
}

/// Parse a study or assay table
pub(crate) fn parse_table<R: Read>(
    reader: R,
    name: &str,
    ctx: &TableContext<'_>,
) -> Result<ParsedTable, IsaTabError> {
    let mut records = read_records(reader, name)?.into_iter();
    let Some((_, header)) = records.next() else {
        return Err(IsaTabError::MalformedRow {
            row: 1,
            message: "table has no header".to_string(),
        });
    };
    let mut rows = Vec::new();
    for (line, mut cells) in records {
        if cells.len() > header.len() {
            if cells[header.len()..].iter().any(|c| !c.is_empty()) {
                return Err(IsaTabError::MalformedRow {
                    row: line,
                    message: format!(
                        "{} cells for {} header columns",
                        cells.len(),
                        header.len()
                    ),
                });
            }
            cells.truncate(header.len());
        }
        cells.resize(header.len(), String::new());
        rows.push(cells);
    }
    info!("Reading {}: {} columns, {} rows", name, header.len(), rows.len());

    let mut table_reader = TableReader::new(ctx, &header)?;
    table_reader.read(&rows)
}

impl<'a> TableReader<'a> {
    fn new(ctx: &'a TableContext<'a>, header: &[String]) -> Result<Self, IsaTabError> {
        let mut columns = Vec::with_capacity(header.len());
        let mut last: Option<Last> = None;
        for (i, label) in header.iter().enumerate() {
            let column =
                Column::parse(label).ok_or_else(|| IsaTabError::UnknownHeader(label.clone()))?;
            let needs_protocol = match &column {
                Column::Material(_) => matches!(last, Some(Last::Material) | Some(Last::Data)),
                Column::Data(_) => last == Some(Last::Material),
                Column::AssayName(_) => last != Some(Last::Process),
                _ => false,
            };
            if needs_protocol {
                let previous = columns
                    .iter()
                    .rev()
                    .find(|c: &&TableColumn| c.column.is_object())
                    .map(|c| c.column.label())
                    .unwrap_or_default();
                warn!(
                    "Protocol REF missing between '{}' and '{}'; inserting '{}'",
                    previous, label, UNKNOWN_PROTOCOL
                );
                columns.push(TableColumn {
                    column: Column::ProtocolRef,
                    source: None,
                });
            }
            match &column {
                Column::Material(_) => last = Some(Last::Material),
                Column::Data(_) => last = Some(Last::Data),
                Column::ProtocolRef | Column::AssayName(_) => last = Some(Last::Process),
                _ => {}
            }
            columns.push(TableColumn {
                column,
                source: Some(i),
            });
        }

        let starts: Vec<usize> = (0..columns.len())
            .filter(|&i| columns[i].column.is_object())
            .collect();
        match starts.first() {
            None => {
                return Err(IsaTabError::MalformedRow {
                    row: 1,
                    message: "header has no identity column".to_string(),
                })
            }
            Some(&first) if first > 0 => {
                return Err(IsaTabError::MisplacedColumn {
                    label: columns[0].column.label(),
                    owner: "start of table".to_string(),
                })
            }
            _ => {}
        }
        let objects: Vec<Object> = starts
            .iter()
            .enumerate()
            .map(|(k, &start)| Object {
                start,
                end: starts.get(k + 1).copied().unwrap_or(columns.len()),
            })
            .collect();
        let mut owner = vec![0; columns.len()];
        for (k, object) in objects.iter().enumerate() {
            for slot in &mut owner[object.start..object.end] {
                *slot = k;
            }
        }

        let reader = Self {
            ctx,
            columns,
            objects,
            owner,
            warned_sources: HashSet::new(),
        };
        reader.check_placement()?;
        Ok(reader)
    }

    /// Reject attribute columns that cannot belong to their object
    fn check_placement(&self) -> Result<(), IsaTabError> {
        for (j, col) in self.columns.iter().enumerate() {
            let owner = &self.columns[self.objects[self.owner[j]].start].column;
            let allowed = match &col.column {
                Column::Characteristic(_) | Column::MaterialType => {
                    matches!(owner, Column::Material(_))
                }
                Column::Label => *owner == Column::Material(MaterialKind::LabeledExtract),
                Column::ParameterValue(_)
                | Column::AssayName(_)
                | Column::Date
                | Column::Performer
                | Column::ArrayDesignRef => *owner == Column::ProtocolRef,
                Column::FactorValue(name) => {
                    if !self.ctx.factors.iter().any(|f| f.name == *name) {
                        return Err(IsaTabError::UndeclaredFactor(name.clone()));
                    }
                    true
                }
                _ => true,
            };
            if !allowed {
                return Err(IsaTabError::MisplacedColumn {
                    label: col.column.label(),
                    owner: owner.label(),
                });
            }
        }
        Ok(())
    }

    fn cell<'r>(&self, row: &'r [String], j: usize) -> &'r str {
        match self.columns[j].source {
            Some(i) => row[i].as_str(),
            None => UNKNOWN_PROTOCOL,
        }
    }

    fn column(&self, j: usize) -> Option<&Column> {
        self.columns.get(j).map(|c| &c.column)
    }

    fn node_columns(&self) -> Vec<usize> {
        self.objects
            .iter()
            .map(|o| o.start)
            .filter(|&j| self.columns[j].column.is_node())
            .collect()
    }

    fn read(&mut self, rows: &[Vec<String>]) -> Result<ParsedTable, IsaTabError> {
        let mut table = ParsedTable::default();
        let mut material_index: HashMap<NodeId, usize> = HashMap::new();
        let mut data_index: HashMap<NodeId, usize> = HashMap::new();

        // Nodes, column by column so declaration order follows the table
        for start in self.node_columns() {
            let object = self.objects[self.owner[start]];
            for row in rows {
                let name = self.cell(row, start);
                if name.is_empty() {
                    continue;
                }
                match self.columns[start].column.clone() {
                    Column::Material(kind) => {
                        let id = NodeId::material(kind, name);
                        if material_index.contains_key(&id) {
                            continue;
                        }
                        let material = self.read_material(kind, name, row, object);
                        material_index.insert(id, table.materials.len());
                        table.materials.push(material);
                    }
                    Column::Data(label) => {
                        let id = NodeId::data_file(name);
                        if data_index.contains_key(&id) {
                            continue;
                        }
                        let mut data = DataFile::new(label, name);
                        data.comments = self.read_comments(row, object);
                        data_index.insert(id, table.data_files.len());
                        table.data_files.push(data);
                    }
                    _ => {}
                }
            }
        }

        // Processes and row-level wiring
        let protocol_objects: Vec<usize> = (0..self.objects.len())
            .filter(|&k| self.columns[self.objects[k].start].column == Column::ProtocolRef)
            .collect();
        let prefer_output = self.output_keyed(rows, &protocol_objects);
        let mut process_index: HashMap<(usize, String), usize> = HashMap::new();

        for row in rows {
            let mut sequence: Vec<(usize, usize)> = Vec::new();
            for &k in &protocol_objects {
                let start = self.objects[k].start;
                let protocol = self.cell(row, start).to_string();
                if protocol.is_empty() {
                    continue;
                }
                let key = (k, self.process_key(row, k, &protocol, prefer_output[&k]));
                let p = match process_index.get(&key) {
                    Some(&p) => p,
                    None => {
                        let process = self.new_process(
                            NodeId::process(table.processes.len()),
                            &protocol,
                            row,
                            k,
                            &mut table.uses_unknown_protocol,
                        )?;
                        debug!("New process {} for key {:?}", process.id, key.1);
                        process_index.insert(key, table.processes.len());
                        table.processes.push(process);
                        table.processes.len() - 1
                    }
                };
                if let Some(id) = self.input_node(row, k) {
                    table.processes[p].add_input(&id)?;
                }
                for id in self.output_nodes(row, k) {
                    table.processes[p].add_output(&id)?;
                }
                sequence.push((k, p));
            }
            self.link_chained(row, &sequence, &mut table.processes);
            self.apply_row_to_samples(row, &mut table, &material_index)?;
        }

        let conflicts = link_linear_processes(&mut table.processes);
        if conflicts > 0 {
            warn!("{} ambiguous previous/next process bindings", conflicts);
        }
        Ok(table)
    }

    fn read_material(
        &mut self,
        kind: MaterialKind,
        name: &str,
        row: &[String],
        object: Object,
    ) -> Material {
        if kind == MaterialKind::Sample {
            if let Some(samples) = self.ctx.study_samples {
                match samples.iter().find(|s| s.name == name) {
                    Some(sample) => return sample.clone(),
                    None => warn!("Assay sample '{}' is not declared in the study", name),
                }
            }
        }
        let mut material = Material::new(kind, name);
        for j in object.start + 1..object.end {
            let category = match self.column(j) {
                Some(Column::Characteristic(c)) => c.clone(),
                Some(Column::MaterialType) => MATERIAL_TYPE.to_string(),
                Some(Column::Label) => LABEL.to_string(),
                _ => continue,
            };
            if material.characteristic(&category).is_some() {
                warn!("Duplicate characteristic '{}' on {}; keeping the first", category, name);
                continue;
            }
            let (value, unit) = self.read_value(row, j, object.end);
            material.characteristics.push(Characteristic {
                category: OntologyAnnotation::new(&category),
                value,
                unit,
            });
        }
        material.comments = self.read_comments(row, object);
        material
    }

    fn read_comments(&self, row: &[String], object: Object) -> Vec<Comment> {
        let mut comments: Vec<Comment> = Vec::new();
        for j in object.start + 1..object.end {
            if let Some(Column::Comment(name)) = self.column(j) {
                if !comments.iter().any(|c| c.name == *name) {
                    comments.push(Comment::new(name.clone(), self.cell(row, j)));
                }
            }
        }
        comments
    }

    /// Value of column `j`, upgraded by the qualifier columns that follow it
    fn read_value(
        &mut self,
        row: &[String],
        j: usize,
        end: usize,
    ) -> (Value, Option<OntologyAnnotation>) {
        let cell = self.cell(row, j);
        let at = |offset: usize| {
            if j + offset < end {
                self.column(j + offset)
            } else {
                None
            }
        };
        if cell.is_empty() {
            return (Value::default(), None);
        }
        if at(1) == Some(&Column::TermSourceRef) && at(2) == Some(&Column::TermAccession) {
            let source = self.cell(row, j + 1).to_string();
            self.check_term_source(&source);
            let annotation = OntologyAnnotation::from_cells(cell, &source, self.cell(row, j + 2));
            return (Value::Annotation(annotation), None);
        }
        if at(1) == Some(&Column::Unit) {
            let term = self.cell(row, j + 1);
            if term.is_empty() {
                return (Value::from(cell), None);
            }
            let unit = if at(2) == Some(&Column::TermSourceRef)
                && at(3) == Some(&Column::TermAccession)
            {
                let source = self.cell(row, j + 2).to_string();
                self.check_term_source(&source);
                OntologyAnnotation::from_cells(term, &source, self.cell(row, j + 3))
            } else {
                OntologyAnnotation::new(term)
            };
            let value = match cell.parse::<f64>() {
                Ok(n) => Value::Number(n),
                Err(_) => Value::from(cell),
            };
            return (value, Some(unit));
        }
        (Value::from(cell), None)
    }

    fn check_term_source(&mut self, source: &str) {
        if source.is_empty() || self.ctx.term_sources.iter().any(|s| s.name == source) {
            return;
        }
        if self.warned_sources.insert(source.to_string()) {
            warn!("Term source '{}' is not declared; keeping the name", source);
        }
    }

    /// Identifier of the node in column `j` on this row, if the cell is set
    fn node_id(&self, row: &[String], j: usize) -> Option<NodeId> {
        let name = self.cell(row, j);
        if name.is_empty() {
            return None;
        }
        match &self.columns[j].column {
            Column::Material(kind) => Some(NodeId::material(*kind, name)),
            Column::Data(_) => Some(NodeId::data_file(name)),
            _ => None,
        }
    }

    /// Input of protocol object `k` on a row: the nearest non-empty node
    /// before it, unless a non-empty process comes first
    fn input_node(&self, row: &[String], k: usize) -> Option<NodeId> {
        for object in self.objects[..k].iter().rev() {
            if self.cell(row, object.start).is_empty() {
                continue;
            }
            return self.node_id(row, object.start);
        }
        None
    }

    /// Outputs of protocol object `k` on a row: the nearest non-empty node
    /// after it, plus any data files directly following it
    fn output_nodes(&self, row: &[String], k: usize) -> Vec<NodeId> {
        let mut outputs = Vec::new();
        for object in &self.objects[k + 1..] {
            if self.cell(row, object.start).is_empty() {
                continue;
            }
            match &self.columns[object.start].column {
                Column::Material(_) if outputs.is_empty() => {
                    outputs.extend(self.node_id(row, object.start));
                    break;
                }
                Column::Data(_) => outputs.extend(self.node_id(row, object.start)),
                _ => break,
            }
        }
        outputs
    }

    /// Name of the nearest non-empty node on either side of protocol object
    /// `k`, looking past intervening processes
    fn nearest_node_name<'r>(&self, row: &'r [String], k: usize, forward: bool) -> &'r str {
        let is_set = |o: &&Object| {
            self.columns[o.start].column.is_node() && !self.cell(row, o.start).is_empty()
        };
        let found = if forward {
            self.objects[k + 1..].iter().find(is_set)
        } else {
            self.objects[..k].iter().rev().find(is_set)
        };
        found.map_or("", |o| self.cell(row, o.start))
    }

    /// For each protocol column, whether process keys use the output node:
    /// true when the column pairs with more distinct inputs than outputs
    fn output_keyed(
        &self,
        rows: &[Vec<String>],
        protocol_objects: &[usize],
    ) -> HashMap<usize, bool> {
        let mut result = HashMap::new();
        for &k in protocol_objects {
            let start = self.objects[k].start;
            let distinct = |forward: bool| -> usize {
                let pairs: HashSet<(&str, &str)> = rows
                    .iter()
                    .map(|row| (self.cell(row, start), self.nearest_node_name(row, k, forward)))
                    .collect();
                pairs.len()
            };
            result.insert(k, distinct(false) > distinct(true));
        }
        result
    }

    fn process_key(&self, row: &[String], k: usize, protocol: &str, prefer_output: bool) -> String {
        let object = self.objects[k];
        for j in object.start + 1..object.end {
            if let Some(Column::AssayName(_)) = self.column(j) {
                let name = self.cell(row, j);
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
        let node = self.nearest_node_name(row, k, prefer_output);
        let parameters: Vec<&str> = (object.start + 1..object.end)
            .filter(|&j| matches!(self.column(j), Some(Column::ParameterValue(_))))
            .map(|j| self.cell(row, j))
            .collect();
        let mut key = if parameters.is_empty() {
            format!("{}/{}", node, protocol)
        } else {
            format!("{}:{}:{}", node, protocol, parameters.join("/"))
        };
        for j in object.start + 1..object.end {
            if matches!(self.column(j), Some(Column::Date) | Some(Column::Performer)) {
                key.push(':');
                key.push_str(self.cell(row, j));
            }
        }
        key
    }

    fn new_process(
        &mut self,
        id: NodeId,
        protocol_name: &str,
        row: &[String],
        k: usize,
        uses_unknown: &mut bool,
    ) -> Result<Process, IsaTabError> {
        let ctx = self.ctx;
        let protocol = ctx.protocols.iter().find(|p| p.name == protocol_name);
        if protocol.is_none() {
            if protocol_name != UNKNOWN_PROTOCOL {
                return Err(IsaTabError::UndeclaredProtocol(protocol_name.to_string()));
            }
            *uses_unknown = true;
        }
        let object = self.objects[k];
        let mut process = Process::new(id, protocol_name);
        let mut parameter_values: Vec<ParameterValue> = Vec::new();
        for j in object.start + 1..object.end {
            match self.column(j).cloned() {
                Some(Column::AssayName(label)) => {
                    process.name = self.cell(row, j).to_string();
                    let protocol_type = protocol.map_or("", |p| p.protocol_type.term.as_str());
                    if label != assay_name_label(protocol_type, ctx.technology_type) {
                        process.name_label = Some(label);
                    }
                }
                Some(Column::Date) => {
                    let date = self.cell(row, j);
                    if !date.is_empty() && !is_extended_date(date) {
                        warn!("Date '{}' of protocol {} is not YYYY-MM-DD", date, protocol_name);
                    }
                    process.date = non_empty(date);
                }
                Some(Column::Performer) => process.performer = non_empty(self.cell(row, j)),
                Some(Column::ArrayDesignRef) => {
                    process.array_design_ref = non_empty(self.cell(row, j))
                }
                Some(Column::ParameterValue(name)) => {
                    if protocol.and_then(|p| p.parameter(&name)).is_none() {
                        return Err(IsaTabError::UndeclaredParameter {
                            protocol: protocol_name.to_string(),
                            parameter: name,
                        });
                    }
                    if parameter_values.iter().any(|pv| pv.parameter_name == name) {
                        continue;
                    }
                    let (value, unit) = self.read_value(row, j, object.end);
                    parameter_values.push(ParameterValue {
                        parameter_name: name,
                        value,
                        unit,
                    });
                }
                _ => {}
            }
        }
        process.set_parameter_values(parameter_values);
        process.comments = self.read_comments(row, object);
        Ok(process)
    }

    /// Link consecutive processes of a row that have no node between them
    fn link_chained(&self, row: &[String], sequence: &[(usize, usize)], processes: &mut [Process]) {
        for pair in sequence.windows(2) {
            let ((ka, a), (kb, b)) = (pair[0], pair[1]);
            let node_between = (ka + 1..kb).any(|m| {
                let start = self.objects[m].start;
                self.columns[start].column.is_node() && !self.cell(row, start).is_empty()
            });
            if node_between {
                continue;
            }
            let (a_id, b_id) = (processes[a].id.clone(), processes[b].id.clone());
            match &processes[a].next_process {
                None => processes[a].next_process = Some(b_id.clone()),
                Some(existing) if *existing != b_id => warn!(
                    "Process {} already links to {}, not {}; keeping the first binding",
                    a_id, existing, b_id
                ),
                Some(_) => {}
            }
            match &processes[b].previous_process {
                None => processes[b].previous_process = Some(a_id),
                Some(existing) if *existing != a_id => warn!(
                    "Process {} already follows {}, not {}; keeping the first binding",
                    b_id, existing, a_id
                ),
                Some(_) => {}
            }
        }
    }

    /// Sample derivation and factor values carried by a row
    fn apply_row_to_samples(
        &mut self,
        row: &[String],
        table: &mut ParsedTable,
        material_index: &HashMap<NodeId, usize>,
    ) -> Result<(), IsaTabError> {
        let mut source: Option<NodeId> = None;
        let mut first_sample: Option<usize> = None;
        for start in self.node_columns() {
            let Some(id) = self.node_id(row, start) else {
                continue;
            };
            match self.columns[start].column {
                Column::Material(MaterialKind::Source) => source = Some(id),
                Column::Material(MaterialKind::Sample) => {
                    let Some(&m) = material_index.get(&id) else {
                        continue;
                    };
                    if let Some(src) = &source {
                        table.materials[m].add_derives_from(src)?;
                    }
                    first_sample.get_or_insert(m);
                }
                _ => {}
            }
        }
        let Some(m) = first_sample else {
            return Ok(());
        };
        for j in 0..self.columns.len() {
            let Some(Column::FactorValue(name)) = self.column(j).cloned() else {
                continue;
            };
            if table.materials[m]
                .factor_values
                .iter()
                .any(|f| f.factor_name == name)
            {
                continue;
            }
            let end = self.objects[self.owner[j]].end;
            let (value, unit) = self.read_value(row, j, end);
            table.materials[m].add_factor_value(FactorValue {
                factor_name: name,
                value,
                unit,
            })?;
        }
        Ok(())
    }
}

fn non_empty(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}
