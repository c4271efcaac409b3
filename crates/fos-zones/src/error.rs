//! Zone engine errors

use fos_dom::{DomError, NodeId};
use fos_html::ParseError;

/// Result type for zone operations
pub type ZoneResult<T> = Result<T, ZoneError>;

/// Zone engine errors
///
/// Only registration and setup report errors. Placement never does: an
/// unresolved zone is an expected state, tracked through the lost registry.
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("Invalid zone marker {node:?}: expected an element matching `{selector}`")]
    InvalidMarker { node: NodeId, selector: String },

    #[error("Zone marker {0:?} has no name")]
    MissingName(NodeId),

    #[error("Zone marker {0:?} has no parent node")]
    MissingParent(NodeId),

    #[error("Zone marker {0:?} is already registered")]
    AlreadyRegistered(NodeId),

    #[error("Zone marker {0:?} has already been placed")]
    AlreadyPlaced(NodeId),

    #[error("Node {0:?} is not a zone component")]
    UnknownComponent(NodeId),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Invalid zone configuration: {0}")]
    Config(#[from] serde_json::Error),
}
