use std::path::PathBuf;

use crate::model::ModelError;

/// Errors raised while reading or writing the tabular layout
#[derive(Debug, thiserror::Error)]
pub enum IsaTabError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TSV parsing or writing error
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Object model rejected a value
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A required section of the investigation file is absent
    #[error("Missing section: {0}")]
    MissingSection(String),

    /// A section has records but lacks a required label
    #[error("Missing field '{label}' in section {section}")]
    MissingField {
        /// Section name, upper case as written in the file
        section: String,
        /// Missing row label
        label: String,
    },

    /// A row does not fit the shape of its table
    #[error("Malformed row {row}: {message}")]
    MalformedRow {
        /// One-based line number of the offending row
        row: usize,
        /// What is wrong with it
        message: String,
    },

    /// A column header outside the table vocabulary
    #[error("Unknown header: {0}")]
    UnknownHeader(String),

    /// A column that cannot attach to the object preceding it
    #[error("Column '{label}' cannot follow '{owner}'")]
    MisplacedColumn {
        /// The misplaced column
        label: String,
        /// Identity column of the object it would attach to
        owner: String,
    },

    /// A `Protocol REF` cell names a protocol the study does not declare
    #[error("Undeclared protocol: {0}")]
    UndeclaredProtocol(String),

    /// A `Factor Value[x]` column names a factor the study does not declare
    #[error("Undeclared factor: {0}")]
    UndeclaredFactor(String),

    /// A `Parameter Value[x]` column names a parameter its protocol lacks
    #[error("Protocol '{protocol}' declares no parameter '{parameter}'")]
    UndeclaredParameter {
        /// Protocol executed by the process
        protocol: String,
        /// Parameter named by the column
        parameter: String,
    },

    /// A file referenced by the investigation file, or the investigation
    /// file itself, does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A directory holds more than one `i_*.txt` file
    #[error("Multiple investigation files in {0}")]
    MultipleInvestigationFiles(PathBuf),

    /// Error while processing a specific file
    #[error("{file}: {source}")]
    InFile {
        /// File name
        file: String,
        /// Underlying error
        #[source]
        source: Box<IsaTabError>,
    },
}

impl IsaTabError {
    /// Attach the name of the file being processed
    pub fn in_file(self, file: &str) -> Self {
        IsaTabError::InFile {
            file: file.to_string(),
            source: Box::new(self),
        }
    }
}
