//! Zone resolution
//!
//! Finds where a zone goes: the owner is the nearest host above the
//! marker's parent node that owns zones, the placeholder is the owner's
//! first descendant matching its resolver selector, and the target is the
//! host that contains the placeholder.

use fos_dom::{DomTree, NodeId, Selector};
use tracing::warn;

use crate::host::PlacementPayload;
use crate::{ZoneConfig, ZoneEngine, ZoneId};

/// Result of resolving a zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        target: NodeId,
        placeholder: NodeId,
        payload: PlacementPayload,
    },
    /// No owner, placeholder or target. Not an error.
    Unresolved {
        owner: Option<NodeId>,
        payload: PlacementPayload,
    },
}

impl Resolution {
    pub fn payload(&self) -> &PlacementPayload {
        match self {
            Resolution::Resolved { payload, .. } | Resolution::Unresolved { payload, .. } => payload,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

impl ZoneEngine {
    /// Resolve a registered zone. `None` if the id is unknown.
    pub fn resolve_zone(&self, tree: &DomTree, id: ZoneId) -> Option<Resolution> {
        let marker = self.markers.get(&id)?;
        let mut payload = PlacementPayload {
            zone_id: id,
            zone: marker.node,
            zone_name: marker.name.clone(),
            zone_component: None,
            zone_container: None,
            nodes: Vec::new(),
        };

        let Some(owner) = self.nearest_owner(tree, marker.parent_node) else {
            return Some(Resolution::Unresolved { owner: None, payload });
        };

        let template = self
            .hosts
            .get(&owner)
            .map_or(self.config.resolver_selector.as_str(), |host| {
                host.resolver_template(&self.config.resolver_selector)
            });
        let selector_text = ZoneConfig::resolver_for(template, &marker.name);
        let placeholder = match Selector::parse(&selector_text) {
            Ok(selector) => tree.query_selector(owner, &selector),
            Err(err) => {
                warn!(zone = id.get(), "Bad resolver selector: {}", err);
                None
            }
        };

        if let Some(placeholder) = placeholder {
            payload.zone_container = Some(placeholder);
            payload.nodes = tree.child_ids(placeholder);
            payload.zone_component = self.nearest_host(tree, placeholder);
        }

        Some(match (payload.zone_container, payload.zone_component) {
            (Some(placeholder), Some(target)) => Resolution::Resolved { target, placeholder, payload },
            _ => Resolution::Unresolved { owner: Some(owner), payload },
        })
    }
}
