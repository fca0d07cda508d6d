//! Column vocabulary of study and assay tables

use crate::model::{DataFileLabel, MaterialKind};

/// Labels of columns that name the enclosing process
pub const ASSAY_NAME_LABELS: [&str; 7] = [
    "Assay Name",
    "MS Assay Name",
    "NMR Assay Name",
    "Hybridization Assay Name",
    "Scan Name",
    "Data Transformation Name",
    "Normalization Name",
];

/// A parsed table header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    /// Material identity column
    Material(MaterialKind),
    /// Data file identity column
    Data(DataFileLabel),
    /// `Protocol REF`
    ProtocolRef,
    /// One of [`ASSAY_NAME_LABELS`]
    AssayName(String),
    /// `Characteristics[x]`
    Characteristic(String),
    /// `Factor Value[x]`
    FactorValue(String),
    /// `Parameter Value[x]`
    ParameterValue(String),
    /// `Comment[x]`
    Comment(String),
    /// `Material Type`, shorthand for `Characteristics[Material Type]`
    MaterialType,
    /// `Label`, the label characteristic of a labeled extract
    Label,
    /// `Term Source REF`
    TermSourceRef,
    /// `Term Accession Number`
    TermAccession,
    /// `Unit`
    Unit,
    /// `Date`
    Date,
    /// `Performer`
    Performer,
    /// `Array Design REF`
    ArrayDesignRef,
}

/// Characteristic category written for a `Material Type` column
pub const MATERIAL_TYPE: &str = "Material Type";

/// Characteristic category written for a `Label` column
pub const LABEL: &str = "Label";

fn bracketed<'a>(label: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = label.strip_prefix(prefix)?.trim_start();
    let inner = rest.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.trim())
}

impl Column {
    /// Parse a header label; `None` for labels outside the vocabulary
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Some(kind) = MaterialKind::from_column_label(label) {
            return Some(Column::Material(kind));
        }
        if let Some(data) = DataFileLabel::from_label(label) {
            return Some(Column::Data(data));
        }
        if ASSAY_NAME_LABELS.contains(&label) {
            return Some(Column::AssayName(label.to_string()));
        }
        let column = match label {
            "Protocol REF" => Column::ProtocolRef,
            "Material Type" => Column::MaterialType,
            "Label" => Column::Label,
            "Term Source REF" => Column::TermSourceRef,
            "Term Accession Number" => Column::TermAccession,
            "Unit" => Column::Unit,
            "Date" => Column::Date,
            "Performer" => Column::Performer,
            "Array Design REF" => Column::ArrayDesignRef,
            _ => {
                if let Some(x) = bracketed(label, "Characteristics") {
                    Column::Characteristic(x.to_string())
                } else if let Some(x) = bracketed(label, "Factor Value") {
                    Column::FactorValue(x.to_string())
                } else if let Some(x) = bracketed(label, "Parameter Value") {
                    Column::ParameterValue(x.to_string())
                } else if let Some(x) = bracketed(label, "Comment") {
                    Column::Comment(x.to_string())
                } else {
                    return None;
                }
            }
        };
        Some(column)
    }

    /// True for material and data identity columns
    pub fn is_node(&self) -> bool {
        matches!(self, Column::Material(_) | Column::Data(_))
    }

    /// True for columns that start a new object
    pub fn is_object(&self) -> bool {
        self.is_node() || *self == Column::ProtocolRef
    }

    /// True for columns whose cells may be upgraded by qualifier columns
    pub fn takes_qualifiers(&self) -> bool {
        matches!(
            self,
            Column::Characteristic(_)
                | Column::FactorValue(_)
                | Column::ParameterValue(_)
                | Column::MaterialType
                | Column::Label
        )
    }

    /// Surface label
    pub fn label(&self) -> String {
        match self {
            Column::Material(kind) => kind.column_label().to_string(),
            Column::Data(data) => data.label().to_string(),
            Column::ProtocolRef => "Protocol REF".to_string(),
            Column::AssayName(label) => label.clone(),
            Column::Characteristic(x) => format!("Characteristics[{}]", x),
            Column::FactorValue(x) => format!("Factor Value[{}]", x),
            Column::ParameterValue(x) => format!("Parameter Value[{}]", x),
            Column::Comment(x) => format!("Comment[{}]", x),
            Column::MaterialType => MATERIAL_TYPE.to_string(),
            Column::Label => LABEL.to_string(),
            Column::TermSourceRef => "Term Source REF".to_string(),
            Column::TermAccession => "Term Accession Number".to_string(),
            Column::Unit => "Unit".to_string(),
            Column::Date => "Date".to_string(),
            Column::Performer => "Performer".to_string(),
            Column::ArrayDesignRef => "Array Design REF".to_string(),
        }
    }
}

/// Assay-name column label for a process, chosen from its protocol type and
/// falling back to the assay technology type
pub fn assay_name_label(protocol_type: &str, technology_type: &str) -> &'static str {
    let by_term = |term: &str| -> Option<&'static str> {
        let term = term.to_lowercase();
        if term.contains("mass spectrometry") {
            Some("MS Assay Name")
        } else if term.contains("nmr") {
            Some("NMR Assay Name")
        } else if term.contains("hybridization") || term.contains("microarray") {
            Some("Hybridization Assay Name")
        } else if term.contains("data transformation") {
            Some("Data Transformation Name")
        } else if term.contains("normalization") {
            Some("Normalization Name")
        } else if term.contains("scan") {
            Some("Scan Name")
        } else {
            None
        }
    };
    by_term(protocol_type)
        .or_else(|| by_term(technology_type))
        .unwrap_or("Assay Name")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(
            Column::parse("Characteristics[organism]"),
            Some(Column::Characteristic("organism".to_string()))
        );
        assert_eq!(
            Column::parse("Factor Value [dose]"),
            Some(Column::FactorValue("dose".to_string()))
        );
        assert_eq!(
            Column::parse("Sample Name"),
            Some(Column::Material(MaterialKind::Sample))
        );
        assert_eq!(
            Column::parse("Free Induction Decay Data File"),
            Some(Column::Data(DataFileLabel::FreeInductionDecayData))
        );
        assert_eq!(
            Column::parse("MS Assay Name"),
            Some(Column::AssayName("MS Assay Name".to_string()))
        );
        assert_eq!(Column::parse("Sample name"), None);
        assert_eq!(Column::parse("Characteristics"), None);
    }

    #[test]
    fn test_assay_name_label() {
        assert_eq!(assay_name_label("mass spectrometry", ""), "MS Assay Name");
        assert_eq!(assay_name_label("", "NMR spectroscopy"), "NMR Assay Name");
        assert_eq!(
            assay_name_label("nucleic acid hybridization", "DNA microarray"),
            "Hybridization Assay Name"
        );
        assert_eq!(assay_name_label("extraction", ""), "Assay Name");
    }
}
