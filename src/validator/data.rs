use std::collections::HashSet;

use crate::model::graph::check_process_links;
use crate::model::{
    Investigation, Material, ModelError, NodeId, Process, ProvenanceGraph, Study,
};

use super::{Diagnostic, ValidationReport};

/// Step 4: declarations referenced by the tables, and the shape of every
/// provenance graph
pub(crate) fn check_data(investigation: &Investigation, report: &mut ValidationReport) {
    for study in &investigation.studies {
        check_references(study, report);
        check_graph(
            &study.filename,
            study.materials().map(|m| &m.id),
            &study.process_sequence,
            study.graph(),
            report,
        );
        for assay in &study.assays {
            check_assay_samples(study, &assay.filename, &assay.samples, report);
            check_graph(
                &assay.filename,
                assay
                    .materials()
                    .map(|m| &m.id)
                    .chain(assay.data_files.iter().map(|d| &d.id)),
                &assay.process_sequence,
                assay.graph(),
                report,
            );
        }
    }
}

fn all_processes(study: &Study) -> impl Iterator<Item = (&Process, &str)> {
    study
        .process_sequence
        .iter()
        .map(move |p| (p, study.filename.as_str()))
        .chain(study.assays.iter().flat_map(|a| {
            a.process_sequence
                .iter()
                .map(move |p| (p, a.filename.as_str()))
        }))
}

fn all_materials(study: &Study) -> impl Iterator<Item = (&Material, &str)> {
    study
        .materials()
        .map(move |m| (m, study.filename.as_str()))
        .chain(study.assays.iter().flat_map(|a| {
            a.materials().map(move |m| (m, a.filename.as_str()))
        }))
}

fn check_references(study: &Study, report: &mut ValidationReport) {
    let mut executed = HashSet::new();
    for (process, file) in all_processes(study) {
        let protocol = process.executes_protocol.as_str();
        executed.insert(protocol);
        if study.protocol(protocol).is_none() {
            report.add(Diagnostic::fatal(
                "1007",
                format!(
                    "Process {} executes protocol '{}' which study {} does not declare",
                    process.id, protocol, study.identifier
                ),
                file,
            ));
        }
    }
    for protocol in &study.protocols {
        if !executed.contains(protocol.name.as_str()) {
            report.add(Diagnostic::info(
                "1019",
                format!("Protocol '{}' is declared but never executed", protocol.name),
                study.filename.as_str(),
            ));
        }
    }

    let mut used = HashSet::new();
    let mut flagged = HashSet::new();
    for (material, file) in all_materials(study) {
        for factor_value in &material.factor_values {
            let factor = factor_value.factor_name.as_str();
            used.insert(factor);
            if study.factor(factor).is_none() && flagged.insert((factor, file)) {
                report.add(Diagnostic::fatal(
                    "1008",
                    format!(
                        "Factor value of {} names factor '{}' which study {} does not declare",
                        material.name, factor, study.identifier
                    ),
                    file,
                ));
            }
        }
    }
    for factor in &study.factors {
        if !used.contains(factor.name.as_str()) {
            report.add(Diagnostic::info(
                "1021",
                format!("Factor '{}' is declared but no sample uses it", factor.name),
                study.filename.as_str(),
            ));
        }
    }
}

fn check_assay_samples(
    study: &Study,
    assay_file: &str,
    samples: &[Material],
    report: &mut ValidationReport,
) {
    for sample in samples {
        if !study.samples.iter().any(|s| s.id == sample.id) {
            report.add(Diagnostic::warning(
                "1013",
                format!(
                    "Sample '{}' is not declared in study table {}",
                    sample.name, study.filename
                ),
                assay_file,
            ));
        }
    }
}

fn check_graph<'a>(
    file: &str,
    declared: impl Iterator<Item = &'a NodeId>,
    processes: &[Process],
    graph: Result<ProvenanceGraph, ModelError>,
    report: &mut ValidationReport,
) {
    let declared: HashSet<&NodeId> = declared.collect();
    let process_ids: HashSet<&NodeId> = processes.iter().map(|p| &p.id).collect();
    let mut process_edges = false;
    for process in processes {
        let ends = process
            .inputs
            .iter()
            .map(|id| ("input", id))
            .chain(process.outputs.iter().map(|id| ("output", id)));
        for (role, id) in ends {
            if process_ids.contains(id) {
                process_edges = true;
                report.add(Diagnostic::fatal(
                    "4001",
                    format!(
                        "Process {} has process {} as an {}; processes must alternate with materials and data",
                        process.id, id, role
                    ),
                    file,
                ));
            } else if !declared.contains(id) {
                report.add(Diagnostic::fatal(
                    "4001",
                    format!(
                        "Process {} {} {} is not a material or data file of this table",
                        process.id, role, id
                    ),
                    file,
                ));
            }
        }
    }

    match graph {
        Ok(graph) if !graph.is_acyclic() => report.add(Diagnostic::fatal(
            "4001",
            "Provenance graph contains a cycle",
            file,
        )),
        Ok(_) => {}
        // already reported above
        Err(_) if process_edges => {}
        Err(e) => report.add(Diagnostic::fatal("4001", e.to_string(), file)),
    }

    for problem in check_process_links(processes) {
        report.add(Diagnostic::warning("4002", problem, file));
    }
}
