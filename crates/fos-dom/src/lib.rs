//! fOS DOM - Document Object Model
//!
//! Arena-backed DOM tree used by the markup parser and the zone engine.

mod node;
mod tree;
mod document;
mod selector;
mod error;

pub use node::{Attribute, ElementData, Node, NodeData, TextData};
pub use tree::{Ancestors, Children, DomTree};
pub use document::Document;
pub use selector::{AttrSelector, Selector};
pub use error::{DomError, DomResult};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Absent link
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
