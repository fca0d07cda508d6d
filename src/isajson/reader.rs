//! Document reader: resolves `@id` references into the object model
//!
//! Declarations are read first and registered in per-study lookup tables;
//! materials, data files and processes are then bound through those tables.
//! Previous/next process pointers are set last, once every process of a
//! sequence has an identifier.

use std::collections::HashMap;

use log::{debug, info};

use crate::model::{
    Assay, Characteristic, Comment, DataFile, DataFileLabel, FactorValue, Investigation,
    Material, MaterialKind, NodeId, OntologyAnnotation, OntologySource, ParameterValue, Person,
    Process, Protocol, ProtocolComponent, ProtocolParameter, Publication, Study, StudyFactor,
    Value,
};

use super::error::IsaJsonError;
use super::wire::{
    Reference, WireAnnotation, WireAssay, WireAttribute, WireCharacteristicCategory, WireComment,
    WireInvestigation, WireMaterial, WirePerson, WireProcess, WirePublication, WireStudy,
    WireValue,
};
use super::{ARRAY_DESIGN_COMMENT, NAME_LABEL_COMMENT};

/// Declarations of one study, keyed by `@id`
#[derive(Default)]
struct Declarations {
    protocols: HashMap<String, String>,
    parameters: HashMap<String, String>,
    factors: HashMap<String, String>,
    categories: HashMap<String, OntologyAnnotation>,
    units: HashMap<String, OntologyAnnotation>,
}

fn resolve<'m, T>(
    map: &'m HashMap<String, T>,
    kind: &'static str,
    reference: Option<&Reference>,
) -> Result<&'m T, IsaJsonError> {
    let id = reference.map(|r| r.id.as_str()).unwrap_or("");
    map.get(id).ok_or_else(|| IsaJsonError::UnresolvedReference {
        kind,
        id: id.to_string(),
    })
}

fn comments(list: &[WireComment]) -> Vec<Comment> {
    list.iter().map(|c| Comment::new(&c.name, &c.value)).collect()
}

fn annotation(wire: &WireAnnotation) -> OntologyAnnotation {
    OntologyAnnotation::from_cells(&wire.annotation_value, &wire.term_source, &wire.term_accession)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn publication(wire: &WirePublication) -> Publication {
    Publication {
        pubmed_id: wire.pubmed_id.clone(),
        doi: wire.doi.clone(),
        author_list: wire.author_list.clone(),
        title: wire.title.clone(),
        status: annotation(&wire.status),
        comments: comments(&wire.comments),
    }
}

fn person(wire: &WirePerson) -> Person {
    Person {
        last_name: wire.last_name.clone(),
        first_name: wire.first_name.clone(),
        mid_initials: wire.mid_initials.clone(),
        email: wire.email.clone(),
        phone: wire.phone.clone(),
        fax: wire.fax.clone(),
        address: wire.address.clone(),
        affiliation: wire.affiliation.clone(),
        roles: wire.roles.iter().map(annotation).collect(),
        comments: comments(&wire.comments),
    }
}

/// Value and unit of a characteristic, factor or parameter value
fn read_value(
    attribute: &WireAttribute,
    decls: &Declarations,
) -> Result<(Value, Option<OntologyAnnotation>), IsaJsonError> {
    let unit = match &attribute.unit {
        Some(reference) => Some(resolve(&decls.units, "unit", Some(reference))?.clone()),
        None => None,
    };
    let value = match &attribute.value {
        None => Value::default(),
        Some(WireValue::Text(s)) => Value::Text(s.clone()),
        Some(WireValue::Annotation(a)) => Value::Annotation(annotation(a)),
        Some(WireValue::Number(n)) => match n.as_f64() {
            Some(n) => Value::Number(n),
            None => Value::Text(n.to_string()),
        },
    };
    Ok((value, unit))
}

fn material_kind(type_label: &str) -> Result<MaterialKind, IsaJsonError> {
    match type_label {
        "Extract Name" | "extract material" => Ok(MaterialKind::Extract),
        "Labeled Extract Name" | "labeled extract material" => Ok(MaterialKind::LabeledExtract),
        other => Err(IsaJsonError::UnknownMaterialType(other.to_string())),
    }
}

fn material(
    wire: &WireMaterial,
    kind: MaterialKind,
    decls: &Declarations,
    nodes: &HashMap<String, NodeId>,
) -> Result<Material, IsaJsonError> {
    let mut material = Material::new(kind, &wire.name);
    for attribute in &wire.characteristics {
        let category = resolve(
            &decls.categories,
            "characteristic category",
            attribute.category.as_ref(),
        )?;
        let (value, unit) = read_value(attribute, decls)?;
        material.characteristics.push(Characteristic {
            category: category.clone(),
            value,
            unit,
        });
    }
    for attribute in wire.factor_values.iter().flatten() {
        let factor = resolve(&decls.factors, "factor", attribute.category.as_ref())?;
        let (value, unit) = read_value(attribute, decls)?;
        material.add_factor_value(FactorValue {
            factor_name: factor.clone(),
            value,
            unit,
        })?;
    }
    for reference in wire.derives_from.iter().flatten() {
        let source = resolve(nodes, "source", Some(reference))?;
        material.add_derives_from(source)?;
    }
    material.comments = comments(&wire.comments);
    Ok(material)
}

/// Read a list of materials of one kind, registering each under its `@id`
fn materials(
    wires: &[WireMaterial],
    kind: Option<MaterialKind>,
    decls: &Declarations,
    nodes: &mut HashMap<String, NodeId>,
) -> Result<Vec<Material>, IsaJsonError> {
    let mut out = Vec::with_capacity(wires.len());
    for wire in wires {
        let kind = match kind {
            Some(kind) => kind,
            None => material_kind(&wire.material_type)?,
        };
        let material = material(wire, kind, decls, nodes)?;
        nodes.insert(wire.id.clone(), material.id.clone());
        out.push(material);
    }
    Ok(out)
}

fn processes(
    wires: &[WireProcess],
    decls: &Declarations,
    nodes: &HashMap<String, NodeId>,
) -> Result<Vec<Process>, IsaJsonError> {
    let ids: HashMap<String, NodeId> = wires
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.clone(), NodeId::process(i)))
        .collect();

    let mut out = Vec::with_capacity(wires.len());
    for (i, wire) in wires.iter().enumerate() {
        let protocol = resolve(&decls.protocols, "protocol", Some(&wire.executes_protocol))?;
        let mut process = Process::new(NodeId::process(i), protocol);
        process.name = wire.name.clone();
        process.performer = non_empty(&wire.performer);
        process.date = non_empty(&wire.date);
        for attribute in &wire.parameter_values {
            let parameter = resolve(&decls.parameters, "parameter", attribute.category.as_ref())?;
            let (value, unit) = read_value(attribute, decls)?;
            process.parameter_values.push(ParameterValue {
                parameter_name: parameter.clone(),
                value,
                unit,
            });
        }
        for reference in &wire.inputs {
            process.add_input(resolve(nodes, "input", Some(reference))?)?;
        }
        for reference in &wire.outputs {
            process.add_output(resolve(nodes, "output", Some(reference))?)?;
        }
        for comment in &wire.comments {
            if comment.name == ARRAY_DESIGN_COMMENT {
                process.array_design_ref = Some(comment.value.clone());
            } else if comment.name == NAME_LABEL_COMMENT {
                process.name_label = Some(comment.value.clone());
            } else {
                process.comments.push(Comment::new(&comment.name, &comment.value));
            }
        }
        out.push(process);
    }

    for (process, wire) in out.iter_mut().zip(wires) {
        if let Some(previous) = &wire.previous_process {
            process.previous_process = Some(resolve(&ids, "process", Some(previous))?.clone());
        }
        if let Some(next) = &wire.next_process {
            process.next_process = Some(resolve(&ids, "process", Some(next))?.clone());
        }
    }
    Ok(out)
}

fn register_categories(
    decls: &mut Declarations,
    categories: &[WireCharacteristicCategory],
    units: &[WireAnnotation],
) {
    for category in categories {
        decls
            .categories
            .insert(category.id.clone(), annotation(&category.characteristic_type));
    }
    for unit in units {
        decls.units.insert(unit.id.clone(), annotation(unit));
    }
}

fn declarations(wire: &WireStudy, study: &mut Study) -> Result<Declarations, IsaJsonError> {
    let mut decls = Declarations::default();
    for wp in &wire.protocols {
        let mut protocol = Protocol::new(&wp.name, annotation(&wp.protocol_type));
        protocol.description = wp.description.clone();
        protocol.uri = wp.uri.clone();
        protocol.version = wp.version.clone();
        protocol.comments = comments(&wp.comments);
        for parameter in &wp.parameters {
            let name = annotation(&parameter.parameter_name);
            decls
                .parameters
                .insert(parameter.id.clone(), name.term.clone());
            protocol.parameters.push(ProtocolParameter { name });
        }
        protocol.components = wp
            .components
            .iter()
            .map(|c| ProtocolComponent {
                name: c.component_name.clone(),
                component_type: annotation(&c.component_type),
            })
            .collect();
        decls.protocols.insert(wp.id.clone(), wp.name.clone());
        study.add_protocol(protocol)?;
    }
    for wf in &wire.factors {
        let mut factor = StudyFactor::new(&wf.factor_name, annotation(&wf.factor_type));
        factor.comments = comments(&wf.comments);
        decls.factors.insert(wf.id.clone(), wf.factor_name.clone());
        study.add_factor(factor)?;
    }
    register_categories(&mut decls, &wire.characteristic_categories, &wire.unit_categories);
    for assay in &wire.assays {
        register_categories(&mut decls, &assay.characteristic_categories, &assay.unit_categories);
    }
    Ok(decls)
}

fn assay(
    wire: &WireAssay,
    decls: &Declarations,
    study: &Study,
    study_nodes: &HashMap<String, NodeId>,
) -> Result<Assay, IsaJsonError> {
    let mut assay = Assay::new(&wire.filename);
    assay.measurement_type = annotation(&wire.measurement_type);
    assay.technology_type = annotation(&wire.technology_type);
    assay.technology_platform = wire.technology_platform.clone();
    assay.comments = comments(&wire.comments);

    let mut nodes = study_nodes.clone();
    for ws in &wire.materials.samples {
        let declared = study_nodes
            .get(&ws.id)
            .and_then(|id| study.material(id))
            .filter(|m| m.kind == MaterialKind::Sample);
        let sample = match declared {
            Some(sample) => sample.clone(),
            None => material(ws, MaterialKind::Sample, decls, &nodes)?,
        };
        nodes.insert(ws.id.clone(), sample.id.clone());
        assay.samples.push(sample);
    }
    assay.other_materials = materials(&wire.materials.other_materials, None, decls, &mut nodes)?;
    for wd in &wire.data_files {
        let label = DataFileLabel::from_label(&wd.data_type)
            .ok_or_else(|| IsaJsonError::UnknownDataFileType(wd.data_type.clone()))?;
        let mut data_file = DataFile::new(label, &wd.name);
        data_file.comments = comments(&wd.comments);
        nodes.insert(wd.id.clone(), data_file.id.clone());
        assay.data_files.push(data_file);
    }
    assay.process_sequence = processes(&wire.process_sequence, decls, &nodes)?;
    debug!(
        "Assay {}: {} samples, {} data files, {} processes",
        assay.filename,
        assay.samples.len(),
        assay.data_files.len(),
        assay.process_sequence.len()
    );
    Ok(assay)
}

fn study(wire: &WireStudy) -> Result<Study, IsaJsonError> {
    let mut study = Study::new(&wire.identifier, &wire.filename);
    study.title = wire.title.clone();
    study.description = wire.description.clone();
    study.submission_date = wire.submission_date.clone();
    study.public_release_date = wire.public_release_date.clone();
    study.design_descriptors = wire.study_design_descriptors.iter().map(annotation).collect();
    study.publications = wire.publications.iter().map(publication).collect();
    study.contacts = wire.people.iter().map(person).collect();
    study.comments = comments(&wire.comments);

    let decls = declarations(wire, &mut study)?;

    let mut nodes = HashMap::new();
    study.sources = materials(
        &wire.materials.sources,
        Some(MaterialKind::Source),
        &decls,
        &mut nodes,
    )?;
    study.samples = materials(
        &wire.materials.samples,
        Some(MaterialKind::Sample),
        &decls,
        &mut nodes,
    )?;
    study.other_materials =
        materials(&wire.materials.other_materials, None, &decls, &mut nodes)?;
    study.process_sequence = processes(&wire.process_sequence, &decls, &nodes)?;

    let mut assays = Vec::with_capacity(wire.assays.len());
    for wa in &wire.assays {
        assays.push(assay(wa, &decls, &study, &nodes)?);
    }
    study.assays = assays;
    info!(
        "Study {}: {} sources, {} samples, {} processes, {} assays",
        study.identifier,
        study.sources.len(),
        study.samples.len(),
        study.process_sequence.len(),
        study.assays.len()
    );
    Ok(study)
}

/// Convert a parsed document into an investigation
pub(crate) fn from_document(wire: &WireInvestigation) -> Result<Investigation, IsaJsonError> {
    let mut investigation = Investigation::new(&wire.identifier);
    investigation.title = wire.title.clone();
    investigation.description = wire.description.clone();
    investigation.submission_date = wire.submission_date.clone();
    investigation.public_release_date = wire.public_release_date.clone();
    investigation.comments = comments(&wire.comments);
    for source in &wire.ontology_source_references {
        investigation.add_ontology_source(OntologySource {
            name: source.name.clone(),
            file: source.file.clone(),
            version: source.version.clone(),
            description: source.description.clone(),
            comments: comments(&source.comments),
        })?;
    }
    investigation.publications = wire.publications.iter().map(publication).collect();
    investigation.contacts = wire.people.iter().map(person).collect();
    for ws in &wire.studies {
        investigation.studies.push(study(ws)?);
    }
    Ok(investigation)
}
