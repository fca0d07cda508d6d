use crate::model::ModelError;

/// Errors raised while reading or writing the document form
#[derive(Debug, thiserror::Error)]
pub enum IsaJsonError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON, or a record whose shape does not match the schema
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Object model rejected a value
    #[error(transparent)]
    Model(#[from] ModelError),

    /// An `@id` reference with no matching record
    #[error("Unresolved {kind} reference: {id}")]
    UnresolvedReference {
        /// Kind of record the reference should name
        kind: &'static str,
        /// The dangling identifier
        id: String,
    },

    /// A material record whose `type` is not a known material kind
    #[error("Unknown material type: {0}")]
    UnknownMaterialType(String),

    /// A data file record whose `type` is not a known data file label
    #[error("Unknown data file type: {0}")]
    UnknownDataFileType(String),

    /// The investigation has no identifier to emit
    #[error("Investigation identifier is empty")]
    MissingIdentifier,
}
