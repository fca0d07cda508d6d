/// Errors raised by the object model and the provenance graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A value outside an attribute's contract was assigned
    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    /// A declaration with the same name already exists in its container
    #[error("Duplicate {kind}: {name}")]
    Duplicate {
        /// Kind of declaration (protocol, factor, study arm, ...)
        kind: &'static str,
        /// The clashing name
        name: String,
    },

    /// An edge would connect two material/data nodes or two processes
    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    /// Path enumeration exceeded the configured cap
    #[error("Graph too complex: more than {limit} source-to-sink paths")]
    GraphTooComplex {
        /// The cap that was exceeded
        limit: usize,
    },
}
