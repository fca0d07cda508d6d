use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{
    is_extended_date, Characteristic, FactorValue, Investigation, Material, OntologyAnnotation,
    ParameterValue, Process, Publication, Value,
};

use super::{Diagnostic, ValidationReport};

/// Step 3: dates, publication identifiers and ontology references
pub(crate) fn check_metadata(
    investigation: &Investigation,
    source_file: &str,
    report: &mut ValidationReport,
) {
    check_identifier(investigation, source_file, report);
    check_ontology_sources(investigation, source_file, report);
    check_dates(investigation, source_file, report);
    check_publications(investigation, source_file, report);
    check_term_sources(investigation, source_file, report);
}

fn check_identifier(investigation: &Investigation, source_file: &str, report: &mut ValidationReport) {
    if investigation.identifier.trim().is_empty() {
        report.add(Diagnostic::fatal(
            "4003",
            "Investigation Identifier is required and empty",
            source_file,
        ));
    }
}

fn check_ontology_sources(
    investigation: &Investigation,
    source_file: &str,
    report: &mut ValidationReport,
) {
    for (i, source) in investigation.ontology_sources.iter().enumerate() {
        if source.name.trim().is_empty() {
            report.add(Diagnostic::warning(
                "3008",
                format!("Ontology source {} has no Term Source Name", i + 1),
                source_file,
            ));
        }
    }
}

fn check_dates(investigation: &Investigation, source_file: &str, report: &mut ValidationReport) {
    let mut dates = vec![
        (
            "Investigation Submission Date",
            investigation.submission_date.as_str(),
            source_file.to_string(),
        ),
        (
            "Investigation Public Release Date",
            investigation.public_release_date.as_str(),
            source_file.to_string(),
        ),
    ];
    for study in &investigation.studies {
        dates.push((
            "Study Submission Date",
            study.submission_date.as_str(),
            source_file.to_string(),
        ));
        dates.push((
            "Study Public Release Date",
            study.public_release_date.as_str(),
            source_file.to_string(),
        ));
        let processes = study
            .process_sequence
            .iter()
            .map(|p| (p, study.filename.as_str()))
            .chain(study.assays.iter().flat_map(|a| {
                a.process_sequence.iter().map(move |p| (p, a.filename.as_str()))
            }));
        for (process, file) in processes {
            if let Some(date) = &process.date {
                dates.push(("Date", date.as_str(), format!("{}: {}", file, process_label(process))));
            }
        }
    }
    for (label, value, location) in dates {
        if !value.is_empty() && !is_extended_date(value) {
            report.add(Diagnostic::warning(
                "3001",
                format!("{} '{}' is not an extended date (YYYY-MM-DD)", label, value),
                location,
            ));
        }
    }
}

fn process_label(process: &Process) -> String {
    if process.name.is_empty() {
        process.id.to_string()
    } else {
        process.name.clone()
    }
}

fn check_publications(
    investigation: &Investigation,
    source_file: &str,
    report: &mut ValidationReport,
) {
    let publications = investigation.publications.iter().chain(
        investigation
            .studies
            .iter()
            .flat_map(|s| s.publications.iter()),
    );
    for publication in publications {
        check_publication(publication, source_file, report);
    }
}

fn check_publication(publication: &Publication, source_file: &str, report: &mut ValidationReport) {
    let doi = publication.doi.trim();
    if !doi.is_empty() && !is_doi(doi) {
        report.add(Diagnostic::warning(
            "3002",
            format!("Publication DOI '{}' is not a valid DOI", doi),
            source_file,
        ));
    }
    let pubmed_id = publication.pubmed_id.trim();
    if !pubmed_id.is_empty() && !is_pubmed_id(pubmed_id) {
        report.add(Diagnostic::warning(
            "3003",
            format!("PubMed ID '{}' is not a PMID or PMCID", pubmed_id),
            source_file,
        ));
    }
}

static DOI: OnceLock<Regex> = OnceLock::new();
static PUBMED_ID: OnceLock<Regex> = OnceLock::new();
static PMC_ID: OnceLock<Regex> = OnceLock::new();

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).unwrap_or_else(|e| panic!("bad pattern {}: {}", source, e)))
}

/// `10.<registrant>/<suffix>`, the registrant being 4 to 9 digits
pub(crate) fn is_doi(value: &str) -> bool {
    pattern(&DOI, r"^10.\d{4,9}/[-._;()/:a-zA-Z0-9]+$").is_match(value)
}

/// An eight-digit PubMed ID or a `PMC` central ID
pub(crate) fn is_pubmed_id(value: &str) -> bool {
    pattern(&PUBMED_ID, r"^[0-9]{8}$").is_match(value)
        || pattern(&PMC_ID, r"^PMC[0-9]{8}$").is_match(value)
}

/// One warning per undeclared term source name and file
fn check_term_sources(
    investigation: &Investigation,
    source_file: &str,
    report: &mut ValidationReport,
) {
    let declared: BTreeSet<&str> = investigation
        .ontology_sources
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    let mut flagged = BTreeSet::new();
    let mut check = |annotation: &OntologyAnnotation, file: &str| {
        if let Some(source) = annotation.term_source.as_deref() {
            if !source.is_empty()
                && !declared.contains(source)
                && flagged.insert((file.to_string(), source.to_string()))
            {
                report.add(Diagnostic::warning(
                    "3007",
                    format!(
                        "Term source '{}' of '{}' is not declared in the ontology sources",
                        source, annotation.term
                    ),
                    file,
                ));
            }
        }
    };

    for publication in &investigation.publications {
        check(&publication.status, source_file);
    }
    for person in &investigation.contacts {
        person.roles.iter().for_each(|r| check(r, source_file));
    }
    for study in &investigation.studies {
        study.design_descriptors.iter().for_each(|d| check(d, source_file));
        for publication in &study.publications {
            check(&publication.status, source_file);
        }
        for person in &study.contacts {
            person.roles.iter().for_each(|r| check(r, source_file));
        }
        for factor in &study.factors {
            check(&factor.factor_type, source_file);
        }
        for protocol in &study.protocols {
            check(&protocol.protocol_type, source_file);
            protocol.parameters.iter().for_each(|p| check(&p.name, source_file));
            protocol
                .components
                .iter()
                .for_each(|c| check(&c.component_type, source_file));
        }
        for material in study.materials() {
            material_annotations(material, &mut |a| check(a, &study.filename));
        }
        for process in &study.process_sequence {
            parameter_annotations(&process.parameter_values, &mut |a| check(a, &study.filename));
        }
        for assay in &study.assays {
            check(&assay.measurement_type, source_file);
            check(&assay.technology_type, source_file);
            for material in assay.materials() {
                material_annotations(material, &mut |a| check(a, &assay.filename));
            }
            for process in &assay.process_sequence {
                parameter_annotations(&process.parameter_values, &mut |a| {
                    check(a, &assay.filename)
                });
            }
        }
    }
}

fn value_annotation(
    value: &Value,
    unit: &Option<OntologyAnnotation>,
    f: &mut dyn FnMut(&OntologyAnnotation),
) {
    if let Some(annotation) = value.as_annotation() {
        f(annotation);
    }
    if let Some(unit) = unit {
        f(unit);
    }
}

fn material_annotations(material: &Material, f: &mut dyn FnMut(&OntologyAnnotation)) {
    for Characteristic {
        category,
        value,
        unit,
    } in &material.characteristics
    {
        f(category);
        value_annotation(value, unit, f);
    }
    for FactorValue { value, unit, .. } in &material.factor_values {
        value_annotation(value, unit, f);
    }
}

fn parameter_annotations(values: &[ParameterValue], f: &mut dyn FnMut(&OntologyAnnotation)) {
    for ParameterValue { value, unit, .. } in values {
        value_annotation(value, unit, f);
    }
}
