//! Serde records mirroring the document layout key for key
//!
//! Every field defaults when absent so that documents written by other tools
//! with fewer keys still parse. Resolution of `@id` references into the
//! object model happens in the reader, not here.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A singleton `{ "@id": ... }` reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "@id")]
    pub id: String,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireComment {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireOntologySource {
    pub name: String,
    pub file: String,
    pub version: String,
    pub description: String,
    pub comments: Vec<WireComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireAnnotation {
    #[serde(rename = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub annotation_value: String,
    pub term_source: String,
    pub term_accession: String,
}

/// A characteristic, factor or parameter value: a bare number, a string or
/// an annotation record
///
/// Any other JSON shape fails deserialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireValue {
    Number(serde_json::Number),
    Text(String),
    Annotation(WireAnnotation),
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => Ok(WireValue::Number(n)),
            serde_json::Value::String(s) => Ok(WireValue::Text(s)),
            record @ serde_json::Value::Object(_) => serde_json::from_value(record)
                .map(WireValue::Annotation)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected a number, a string or an annotation record as value, found {}",
                other
            ))),
        }
    }
}

/// Category reference, value and optional unit reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireAttribute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<WireValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Reference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WirePublication {
    #[serde(rename = "pubMedID")]
    pub pubmed_id: String,
    pub doi: String,
    pub author_list: String,
    pub title: String,
    pub status: WireAnnotation,
    pub comments: Vec<WireComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WirePerson {
    pub last_name: String,
    pub first_name: String,
    pub mid_initials: String,
    pub email: String,
    pub phone: String,
    pub fax: String,
    pub address: String,
    pub affiliation: String,
    pub roles: Vec<WireAnnotation>,
    pub comments: Vec<WireComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireProtocolParameter {
    #[serde(rename = "@id")]
    pub id: String,
    pub parameter_name: WireAnnotation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireComponent {
    pub component_name: String,
    pub component_type: WireAnnotation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireProtocol {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub protocol_type: WireAnnotation,
    pub description: String,
    pub uri: String,
    pub version: String,
    pub parameters: Vec<WireProtocolParameter>,
    pub components: Vec<WireComponent>,
    pub comments: Vec<WireComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireFactor {
    #[serde(rename = "@id")]
    pub id: String,
    pub factor_name: String,
    pub factor_type: WireAnnotation,
    pub comments: Vec<WireComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireCharacteristicCategory {
    #[serde(rename = "@id")]
    pub id: String,
    pub characteristic_type: WireAnnotation,
}

/// Sources, samples and other materials share one record; the kind-specific
/// keys are omitted where they do not apply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireMaterial {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub material_type: String,
    pub characteristics: Vec<WireAttribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_values: Option<Vec<WireAttribute>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derives_from: Option<Vec<Reference>>,
    pub comments: Vec<WireComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireDataFile {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub comments: Vec<WireComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireProcess {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub executes_protocol: Reference,
    pub parameter_values: Vec<WireAttribute>,
    pub performer: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_process: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_process: Option<Reference>,
    pub inputs: Vec<Reference>,
    pub outputs: Vec<Reference>,
    pub comments: Vec<WireComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireStudyMaterials {
    pub sources: Vec<WireMaterial>,
    pub samples: Vec<WireMaterial>,
    pub other_materials: Vec<WireMaterial>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireAssayMaterials {
    pub samples: Vec<WireMaterial>,
    pub other_materials: Vec<WireMaterial>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireAssay {
    pub measurement_type: WireAnnotation,
    pub technology_type: WireAnnotation,
    pub technology_platform: String,
    pub filename: String,
    pub characteristic_categories: Vec<WireCharacteristicCategory>,
    pub unit_categories: Vec<WireAnnotation>,
    pub materials: WireAssayMaterials,
    pub data_files: Vec<WireDataFile>,
    pub process_sequence: Vec<WireProcess>,
    pub comments: Vec<WireComment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireStudy {
    pub filename: String,
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub submission_date: String,
    pub public_release_date: String,
    pub publications: Vec<WirePublication>,
    pub people: Vec<WirePerson>,
    pub study_design_descriptors: Vec<WireAnnotation>,
    pub protocols: Vec<WireProtocol>,
    pub factors: Vec<WireFactor>,
    pub characteristic_categories: Vec<WireCharacteristicCategory>,
    pub unit_categories: Vec<WireAnnotation>,
    pub materials: WireStudyMaterials,
    pub process_sequence: Vec<WireProcess>,
    pub assays: Vec<WireAssay>,
    pub comments: Vec<WireComment>,
}

/// Root record of a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireInvestigation {
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub submission_date: String,
    pub public_release_date: String,
    pub ontology_source_references: Vec<WireOntologySource>,
    pub publications: Vec<WirePublication>,
    pub people: Vec<WirePerson>,
    pub studies: Vec<WireStudy>,
    pub comments: Vec<WireComment>,
}
