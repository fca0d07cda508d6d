//! Document writer: mints positional `@id`s and emits wire records top-down

use std::collections::HashMap;

use log::warn;

use crate::model::{
    format_number, Assay, Comment, Investigation, Material, MaterialKind, NodeId,
    OntologyAnnotation, Person, Process, Publication, Study, Value,
};

use super::wire::{
    Reference, WireAnnotation, WireAssay, WireAssayMaterials, WireAttribute,
    WireCharacteristicCategory, WireComment, WireComponent, WireDataFile, WireFactor,
    WireInvestigation, WireMaterial, WireOntologySource, WirePerson, WireProcess,
    WireProtocol, WireProtocolParameter, WirePublication, WireStudy, WireStudyMaterials,
    WireValue,
};
use super::{ARRAY_DESIGN_COMMENT, NAME_LABEL_COMMENT};

/// Identifiers minted for the declarations and nodes of one study or assay
#[derive(Default, Clone)]
struct Ids {
    protocols: HashMap<String, String>,
    parameters: HashMap<(String, String), String>,
    factors: HashMap<String, String>,
    categories: Vec<(OntologyAnnotation, String)>,
    units: Vec<(OntologyAnnotation, String)>,
    nodes: HashMap<NodeId, String>,
}

fn lookup(found: Option<&String>, kind: &str, key: &str) -> Reference {
    match found {
        Some(id) => Reference::new(id.as_str()),
        None => {
            warn!("No {} declared for '{}'; writing a dangling reference", kind, key);
            Reference::new(format!("#undeclared/{}", key))
        }
    }
}

impl Ids {
    fn annotation_id(
        list: &[(OntologyAnnotation, String)],
        a: &OntologyAnnotation,
    ) -> Option<String> {
        list.iter().find(|(k, _)| k == a).map(|(_, id)| id.clone())
    }

    fn category(&self, a: &OntologyAnnotation) -> Reference {
        let id = Self::annotation_id(&self.categories, a);
        lookup(id.as_ref(), "characteristic category", &a.term)
    }

    fn unit(&self, a: &OntologyAnnotation) -> Reference {
        let id = Self::annotation_id(&self.units, a);
        lookup(id.as_ref(), "unit", &a.term)
    }

    fn node(&self, id: &NodeId) -> Reference {
        lookup(self.nodes.get(id), "node", id.as_str())
    }

    fn parameter(&self, protocol: &str, parameter: &str) -> Reference {
        let key = (protocol.to_string(), parameter.to_string());
        lookup(self.parameters.get(&key), "parameter", parameter)
    }

    fn declare_categories(
        &mut self,
        prefix: &str,
        categories: Vec<OntologyAnnotation>,
        units: Vec<OntologyAnnotation>,
    ) {
        self.categories = categories
            .into_iter()
            .enumerate()
            .map(|(k, c)| (c, format!("#characteristic_category/{}-{}", prefix, k)))
            .collect();
        self.units = units
            .into_iter()
            .enumerate()
            .map(|(k, u)| (u, format!("#unit/{}-{}", prefix, k)))
            .collect();
    }
}

fn comments(list: &[Comment]) -> Vec<WireComment> {
    list.iter()
        .map(|c| WireComment {
            name: c.name.clone(),
            value: c.value.clone(),
        })
        .collect()
}

fn annotation(a: &OntologyAnnotation) -> WireAnnotation {
    WireAnnotation {
        id: String::new(),
        annotation_value: a.term.clone(),
        term_source: a.source_name().to_string(),
        term_accession: a.term_accession.clone(),
    }
}

fn number(n: f64) -> Option<serde_json::Number> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        Some(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
    }
}

fn wire_value(value: &Value) -> WireValue {
    match value {
        Value::Text(s) => WireValue::Text(s.clone()),
        Value::Annotation(a) => WireValue::Annotation(annotation(a)),
        Value::Number(n) => match number(*n) {
            Some(n) => WireValue::Number(n),
            None => WireValue::Text(format_number(*n)),
        },
    }
}

fn attribute(
    category: Reference,
    value: &Value,
    unit: Option<&OntologyAnnotation>,
    ids: &Ids,
) -> WireAttribute {
    WireAttribute {
        category: Some(category),
        value: Some(wire_value(value)),
        unit: unit.map(|u| ids.unit(u)),
    }
}

fn publication(p: &Publication) -> WirePublication {
    WirePublication {
        pubmed_id: p.pubmed_id.clone(),
        doi: p.doi.clone(),
        author_list: p.author_list.clone(),
        title: p.title.clone(),
        status: annotation(&p.status),
        comments: comments(&p.comments),
    }
}

fn person(p: &Person) -> WirePerson {
    WirePerson {
        last_name: p.last_name.clone(),
        first_name: p.first_name.clone(),
        mid_initials: p.mid_initials.clone(),
        email: p.email.clone(),
        phone: p.phone.clone(),
        fax: p.fax.clone(),
        address: p.address.clone(),
        affiliation: p.affiliation.clone(),
        roles: p.roles.iter().map(annotation).collect(),
        comments: comments(&p.comments),
    }
}

fn material(m: &Material, ids: &Ids) -> WireMaterial {
    let characteristics = m
        .characteristics
        .iter()
        .map(|c| attribute(ids.category(&c.category), &c.value, c.unit.as_ref(), ids))
        .collect();
    let mut wire = WireMaterial {
        id: ids.nodes.get(&m.id).cloned().unwrap_or_default(),
        name: m.name.clone(),
        characteristics,
        comments: comments(&m.comments),
        ..Default::default()
    };
    match m.kind {
        MaterialKind::Source => {}
        MaterialKind::Sample => {
            wire.factor_values = Some(
                m.factor_values
                    .iter()
                    .map(|f| {
                        let factor =
                            lookup(ids.factors.get(&f.factor_name), "factor", &f.factor_name);
                        attribute(factor, &f.value, f.unit.as_ref(), ids)
                    })
                    .collect(),
            );
            wire.derives_from = Some(m.derives_from.iter().map(|s| ids.node(s)).collect());
        }
        MaterialKind::Extract | MaterialKind::LabeledExtract => {
            wire.material_type = m.kind.column_label().to_string();
        }
    }
    wire
}

fn processes(sequence: &[Process], prefix: &str, ids: &Ids) -> Vec<WireProcess> {
    let process_ids: HashMap<&NodeId, String> = sequence
        .iter()
        .enumerate()
        .map(|(k, p)| (&p.id, format!("#process/{}-{}", prefix, k)))
        .collect();
    let process_ref = |id: &NodeId| lookup(process_ids.get(id), "process", id.as_str());

    sequence
        .iter()
        .map(|p| {
            let mut comments = comments(&p.comments);
            if let Some(array_design) = &p.array_design_ref {
                comments.push(WireComment {
                    name: ARRAY_DESIGN_COMMENT.to_string(),
                    value: array_design.clone(),
                });
            }
            if let Some(label) = &p.name_label {
                comments.push(WireComment {
                    name: NAME_LABEL_COMMENT.to_string(),
                    value: label.clone(),
                });
            }
            WireProcess {
                id: process_ids.get(&p.id).cloned().unwrap_or_default(),
                name: p.name.clone(),
                executes_protocol: lookup(
                    ids.protocols.get(&p.executes_protocol),
                    "protocol",
                    &p.executes_protocol,
                ),
                parameter_values: p
                    .parameter_values
                    .iter()
                    .map(|v| {
                        let category = ids.parameter(&p.executes_protocol, &v.parameter_name);
                        attribute(category, &v.value, v.unit.as_ref(), ids)
                    })
                    .collect(),
                performer: p.performer.clone().unwrap_or_default(),
                date: p.date.clone().unwrap_or_default(),
                previous_process: p.previous_process.as_ref().map(process_ref),
                next_process: p.next_process.as_ref().map(process_ref),
                inputs: p.inputs.iter().map(|n| ids.node(n)).collect(),
                outputs: p.outputs.iter().map(|n| ids.node(n)).collect(),
                comments,
            }
        })
        .collect()
}

fn characteristic_categories(ids: &Ids) -> Vec<WireCharacteristicCategory> {
    ids.categories
        .iter()
        .map(|(c, id)| WireCharacteristicCategory {
            id: id.clone(),
            characteristic_type: annotation(c),
        })
        .collect()
}

fn unit_categories(ids: &Ids) -> Vec<WireAnnotation> {
    ids.units
        .iter()
        .map(|(u, id)| WireAnnotation {
            id: id.clone(),
            ..annotation(u)
        })
        .collect()
}

/// Assay samples keep the identifier of the study sample they stand for
fn assay(a: &Assay, prefix: &str, study_ids: &Ids) -> WireAssay {
    let mut ids = study_ids.clone();
    ids.declare_categories(prefix, a.characteristic_categories(), a.unit_categories());
    for (k, sample) in a.samples.iter().enumerate() {
        let id = study_ids
            .nodes
            .get(&sample.id)
            .cloned()
            .unwrap_or_else(|| format!("#sample/{}-{}", prefix, k));
        ids.nodes.insert(sample.id.clone(), id);
    }
    for (k, m) in a.other_materials.iter().enumerate() {
        ids.nodes.insert(m.id.clone(), format!("#material/{}-{}", prefix, k));
    }
    for (k, d) in a.data_files.iter().enumerate() {
        ids.nodes.insert(d.id.clone(), format!("#data/{}-{}", prefix, k));
    }

    WireAssay {
        measurement_type: annotation(&a.measurement_type),
        technology_type: annotation(&a.technology_type),
        technology_platform: a.technology_platform.clone(),
        filename: a.filename.clone(),
        characteristic_categories: characteristic_categories(&ids),
        unit_categories: unit_categories(&ids),
        materials: WireAssayMaterials {
            samples: a.samples.iter().map(|m| material(m, &ids)).collect(),
            other_materials: a.other_materials.iter().map(|m| material(m, &ids)).collect(),
        },
        data_files: a
            .data_files
            .iter()
            .map(|d| WireDataFile {
                id: ids.nodes.get(&d.id).cloned().unwrap_or_default(),
                name: d.name.clone(),
                data_type: d.label.label().to_string(),
                comments: comments(&d.comments),
            })
            .collect(),
        process_sequence: processes(&a.process_sequence, prefix, &ids),
        comments: comments(&a.comments),
    }
}

fn study(s: &Study, index: usize) -> WireStudy {
    let prefix = index.to_string();
    let mut ids = Ids::default();

    let protocols = s
        .protocols
        .iter()
        .enumerate()
        .map(|(k, p)| {
            let id = format!("#protocol/{}-{}", prefix, k);
            ids.protocols.insert(p.name.clone(), id.clone());
            let parameters = p
                .parameters
                .iter()
                .enumerate()
                .map(|(j, param)| {
                    let param_id = format!("#parameter/{}-{}-{}", prefix, k, j);
                    ids.parameters
                        .insert((p.name.clone(), param.name.term.clone()), param_id.clone());
                    WireProtocolParameter {
                        id: param_id,
                        parameter_name: annotation(&param.name),
                    }
                })
                .collect();
            WireProtocol {
                id,
                name: p.name.clone(),
                protocol_type: annotation(&p.protocol_type),
                description: p.description.clone(),
                uri: p.uri.clone(),
                version: p.version.clone(),
                parameters,
                components: p
                    .components
                    .iter()
                    .map(|c| WireComponent {
                        component_name: c.name.clone(),
                        component_type: annotation(&c.component_type),
                    })
                    .collect(),
                comments: comments(&p.comments),
            }
        })
        .collect();

    let factors = s
        .factors
        .iter()
        .enumerate()
        .map(|(k, f)| {
            let id = format!("#factor/{}-{}", prefix, k);
            ids.factors.insert(f.name.clone(), id.clone());
            WireFactor {
                id,
                factor_name: f.name.clone(),
                factor_type: annotation(&f.factor_type),
                comments: comments(&f.comments),
            }
        })
        .collect();

    ids.declare_categories(&prefix, s.characteristic_categories(), s.unit_categories());
    let kinds = [
        (&s.sources, "source"),
        (&s.samples, "sample"),
        (&s.other_materials, "material"),
    ];
    for (list, kind) in kinds {
        for (k, m) in list.iter().enumerate() {
            ids.nodes.insert(m.id.clone(), format!("#{}/{}-{}", kind, prefix, k));
        }
    }

    let assays = s
        .assays
        .iter()
        .enumerate()
        .map(|(a, record)| assay(record, &format!("{}-{}", prefix, a), &ids))
        .collect();

    WireStudy {
        filename: s.filename.clone(),
        identifier: s.identifier.clone(),
        title: s.title.clone(),
        description: s.description.clone(),
        submission_date: s.submission_date.clone(),
        public_release_date: s.public_release_date.clone(),
        publications: s.publications.iter().map(publication).collect(),
        people: s.contacts.iter().map(person).collect(),
        study_design_descriptors: s.design_descriptors.iter().map(annotation).collect(),
        protocols,
        factors,
        characteristic_categories: characteristic_categories(&ids),
        unit_categories: unit_categories(&ids),
        materials: WireStudyMaterials {
            sources: s.sources.iter().map(|m| material(m, &ids)).collect(),
            samples: s.samples.iter().map(|m| material(m, &ids)).collect(),
            other_materials: s.other_materials.iter().map(|m| material(m, &ids)).collect(),
        },
        process_sequence: processes(&s.process_sequence, &prefix, &ids),
        assays,
        comments: comments(&s.comments),
    }
}

/// Convert an investigation into its document form
pub(crate) fn to_document(investigation: &Investigation) -> WireInvestigation {
    WireInvestigation {
        identifier: investigation.identifier.clone(),
        title: investigation.title.clone(),
        description: investigation.description.clone(),
        submission_date: investigation.submission_date.clone(),
        public_release_date: investigation.public_release_date.clone(),
        ontology_source_references: investigation
            .ontology_sources
            .iter()
            .map(|o| WireOntologySource {
                name: o.name.clone(),
                file: o.file.clone(),
                version: o.version.clone(),
                description: o.description.clone(),
                comments: comments(&o.comments),
            })
            .collect(),
        publications: investigation.publications.iter().map(publication).collect(),
        people: investigation.contacts.iter().map(person).collect(),
        studies: investigation
            .studies
            .iter()
            .enumerate()
            .map(|(i, s)| study(s, i))
            .collect(),
        comments: comments(&investigation.comments),
    }
}
