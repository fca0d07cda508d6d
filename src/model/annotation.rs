use std::fmt;

/// A free-form (name, value) pair attachable to most entities
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Comment {
    /// Comment name, the `x` of a `Comment[x]` column
    pub name: String,
    /// Comment text
    pub value: String,
}

impl Comment {
    /// Create a new comment
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A named controlled vocabulary, unique by name within an investigation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OntologySource {
    /// Short name used by `Term Source REF` cells (e.g. "OBI")
    pub name: String,
    /// Location of the vocabulary file
    pub file: String,
    /// Vocabulary version
    pub version: String,
    /// Human-readable description
    pub description: String,
    /// Attached comments
    pub comments: Vec<Comment>,
}

impl OntologySource {
    /// Create an ontology source with only a name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the vocabulary file
    pub fn with_file(mut self, file: &str) -> Self {
        self.file = file.to_string();
        self
    }

    /// Set the vocabulary version
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// A term drawn from an ontology source
///
/// The source reference is the ontology source *name*; `None` means the term
/// is free text with no declared vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OntologyAnnotation {
    /// Term text
    pub term: String,
    /// Name of the ontology source the term comes from
    pub term_source: Option<String>,
    /// Accession IRI or CURIE of the term
    pub term_accession: String,
}

impl OntologyAnnotation {
    /// Create an annotation holding only a term
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_string(),
            ..Default::default()
        }
    }

    /// Attach a term source and accession
    pub fn with_source(mut self, term_source: &str, term_accession: &str) -> Self {
        self.term_source = if term_source.is_empty() {
            None
        } else {
            Some(term_source.to_string())
        };
        self.term_accession = term_accession.to_string();
        self
    }

    /// Build an annotation from the three cells of a tabular value group
    pub fn from_cells(term: &str, term_source: &str, term_accession: &str) -> Self {
        Self::new(term).with_source(term_source, term_accession)
    }

    /// True when term, source and accession are all blank
    pub fn is_empty(&self) -> bool {
        self.term.is_empty() && self.term_source.is_none() && self.term_accession.is_empty()
    }

    /// Term source name, or the empty string
    pub fn source_name(&self) -> &str {
        self.term_source.as_deref().unwrap_or("")
    }
}

impl From<&str> for OntologyAnnotation {
    fn from(term: &str) -> Self {
        Self::new(term)
    }
}

impl fmt::Display for OntologyAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.term_source {
            Some(source) if !self.term_accession.is_empty() => {
                write!(f, "{} [{}: {}]", self.term, source, self.term_accession)
            }
            Some(source) => write!(f, "{} [{}]", self.term, source),
            None => write!(f, "{}", self.term),
        }
    }
}

/// Value of a characteristic, factor value or parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Plain text
    Text(String),
    /// A number, usually paired with a unit
    Number(f64),
    /// An ontology term
    Annotation(OntologyAnnotation),
}

impl Value {
    /// True for empty text and empty annotations
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) => s.is_empty(),
            Value::Number(_) => false,
            Value::Annotation(a) => a.term.is_empty(),
        }
    }

    /// The annotation, if this value is one
    pub fn as_annotation(&self) -> Option<&OntologyAnnotation> {
        match self {
            Value::Annotation(a) => Some(a),
            _ => None,
        }
    }

    /// The number, if this value is one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Text(String::new())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<OntologyAnnotation> for Value {
    fn from(a: OntologyAnnotation) -> Self {
        Value::Annotation(a)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Annotation(a) => write!(f, "{}", a.term),
        }
    }
}

/// Render a number the way a table cell shows it: integral values lose the
/// trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// True for an extended-format date (`YYYY-MM-DD`), optionally followed by
/// a time of day with or without an offset
pub fn is_extended_date(value: &str) -> bool {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || chrono::DateTime::parse_from_rfc3339(value).is_ok()
}
