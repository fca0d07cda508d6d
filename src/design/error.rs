use crate::model::ModelError;

/// Errors raised while assembling or expanding a study design
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DesignError {
    /// An element cannot be placed in a cell
    #[error("Cell rule violated: {0}")]
    CellRule(String),

    /// A cell cannot be placed in an arm
    #[error("Arm rule violated: {0}")]
    ArmRule(String),

    /// A value outside an attribute's contract was assigned
    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    /// A name or identifier is already taken in its container
    #[error("Duplicate {kind}: {name}")]
    Duplicate {
        /// Kind of entity (arm, cell, node, ...)
        kind: &'static str,
        /// The clashing name
        name: String,
    },

    /// A link or mapping names a node the graph or plan does not hold
    #[error("Unknown {kind}: {name}")]
    UnknownNode {
        /// Kind of entity looked up
        kind: &'static str,
        /// The missing identifier
        name: String,
    },

    /// A link between two product nodes
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    /// No arm has a cell at the requested position
    #[error("Epoch {0} is out of bounds for every arm")]
    EpochOutOfBounds(usize),

    /// The object model rejected a generated entity
    #[error(transparent)]
    Model(#[from] ModelError),
}
