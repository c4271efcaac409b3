//! Zone engine state
//!
//! Owns the marker table, the host table, the pending/lost registries and
//! the zones-loaded callbacks for one page. The engine never owns the DOM:
//! every operation that reads or mutates nodes takes the tree explicitly.
//! Extraction, resolution and placement live in their own modules as further
//! `impl ZoneEngine` blocks.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use fos_dom::{DomTree, NodeId};
use tracing::{debug, warn};

use crate::host::{PlacementPayload, ZoneHost};
use crate::{ZoneConfig, ZoneId, ZoneRegistry};

/// Attribute on a zone's parent element listing the zone names found there
pub const ZONE_REGISTRY_ATTR: &str = "zone-registry";

/// Zone marker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    /// Waiting for an attempt
    Pending,
    /// Last attempt found no placeholder
    Lost,
    /// Resolved, insertion waits for the target's render
    Placing { target: NodeId, placeholder: NodeId },
    /// Content moved into the placeholder
    Placed,
    /// Discarded without placement
    Dropped,
}

impl ZoneState {
    /// Whether the marker has been consumed by a successful resolution
    pub fn is_consumed(self) -> bool {
        matches!(self, ZoneState::Placing { .. } | ZoneState::Placed)
    }
}

/// A registered zone marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneMarker {
    pub id: ZoneId,
    /// Marker element, detached after extraction
    pub node: NodeId,
    pub name: String,
    /// Node the marker was found under, fixed at registration
    pub parent_node: NodeId,
    /// Host the zone was registered into
    pub owner: Option<NodeId>,
    pub state: ZoneState,
}

pub(crate) enum LoadedCallback {
    Host { host: NodeId, payload: PlacementPayload },
    Listener(Box<dyn FnOnce(&mut DomTree)>),
}

impl fmt::Debug for LoadedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadedCallback::Host { host, payload } => f
                .debug_struct("Host")
                .field("host", host)
                .field("zone", &payload.zone_name)
                .finish(),
            LoadedCallback::Listener(_) => f.write_str("Listener"),
        }
    }
}

/// Zone engine
#[derive(Debug)]
pub struct ZoneEngine {
    pub(crate) config: ZoneConfig,
    pub(crate) registry: ZoneRegistry,
    pub(crate) markers: BTreeMap<ZoneId, ZoneMarker>,
    pub(crate) by_node: HashMap<NodeId, ZoneId>,
    pub(crate) hosts: HashMap<NodeId, ZoneHost>,
    pub(crate) loaded: Vec<LoadedCallback>,
    pub(crate) placed_total: usize,
    next_id: u64,
}

impl ZoneEngine {
    pub fn new(config: ZoneConfig) -> Self {
        Self {
            config,
            registry: ZoneRegistry::new(),
            markers: BTreeMap::new(),
            by_node: HashMap::new(),
            hosts: HashMap::new(),
            loaded: Vec::new(),
            placed_total: 0,
            next_id: 1,
        }
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub(crate) fn allocate_id(&mut self) -> ZoneId {
        let id = ZoneId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn marker(&self, id: ZoneId) -> Option<&ZoneMarker> {
        self.markers.get(&id)
    }

    /// Zone registered for a marker node
    pub fn zone_of(&self, node: NodeId) -> Option<ZoneId> {
        self.by_node.get(&node).copied()
    }

    /// All known markers in registration order
    pub fn markers(&self) -> impl Iterator<Item = &ZoneMarker> {
        self.markers.values()
    }

    pub fn host(&self, component: NodeId) -> Option<&ZoneHost> {
        self.hosts.get(&component)
    }

    pub fn is_host(&self, node: NodeId) -> bool {
        self.hosts.contains_key(&node)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Content insertions performed so far
    pub fn placed_total(&self) -> usize {
        self.placed_total
    }

    pub fn pending_len(&self) -> usize {
        self.registry.pending_len()
    }

    pub fn lost_len(&self) -> usize {
        self.registry.lost_len()
    }

    pub(crate) fn set_state(&mut self, id: ZoneId, state: ZoneState) {
        if let Some(marker) = self.markers.get_mut(&id) {
            marker.state = state;
        }
    }

    /// Nearest host at or above `from`
    pub fn nearest_host(&self, tree: &DomTree, from: NodeId) -> Option<NodeId> {
        tree.ancestors(from).find(|id| self.hosts.contains_key(id))
    }

    /// Nearest host at or above `from` that owns at least one zone
    pub fn nearest_owner(&self, tree: &DomTree, from: NodeId) -> Option<NodeId> {
        tree.ancestors(from)
            .find(|id| self.hosts.get(id).is_some_and(|host| !host.zones.is_empty()))
    }

    /// Whether `component` knows a zone called `name`.
    ///
    /// Checks the component's `zone-registry` attribute, then its own name
    /// set, then the name set of its parent element.
    pub fn has_zone(&self, tree: &DomTree, component: NodeId, name: &str) -> bool {
        let registered = tree
            .get_attribute(component, ZONE_REGISTRY_ATTR)
            .is_some_and(|list| list.split(',').any(|n| n.trim() == name));
        let own = self.hosts.get(&component).is_some_and(|h| h.has_zone_name(name));
        let parent = tree
            .parent_element(component)
            .and_then(|p| self.hosts.get(&p))
            .is_some_and(|h| h.has_zone_name(name));
        registered || own || parent
    }

    /// Marker node of the first zone named `name` owned by `component`
    pub fn get_zone(&self, component: NodeId, name: &str) -> Option<NodeId> {
        let host = self.hosts.get(&component)?;
        host.zones
            .iter()
            .filter_map(|id| self.markers.get(id))
            .find(|marker| marker.name == name)
            .map(|marker| marker.node)
    }

    /// Queue a callback for when no zones are pending
    pub fn on_zones_loaded(&mut self, listener: impl FnOnce(&mut DomTree) + 'static) {
        self.loaded.push(LoadedCallback::Listener(Box::new(listener)));
    }

    pub fn loaded_callbacks(&self) -> usize {
        self.loaded.len()
    }

    /// Run and clear queued zones-loaded callbacks. Callbacks queued while
    /// flushing wait for the next flush.
    pub fn flush_zones_loaded(&mut self, tree: &mut DomTree) -> usize {
        let callbacks = std::mem::take(&mut self.loaded);
        let count = callbacks.len();
        for callback in callbacks {
            match callback {
                LoadedCallback::Host { host, payload } => {
                    if let Some(host) = self.hosts.get_mut(&host) {
                        host.hooks.on_zones_loaded(tree, &payload);
                    }
                }
                LoadedCallback::Listener(listener) => listener(tree),
            }
        }
        if count > 0 {
            debug!("Ran {} zones-loaded callbacks", count);
        }
        count
    }

    /// Drop every zone owned by `component` from the registries and the
    /// marker table, and clear its zone set. Returns how many were removed.
    pub fn release_component(&mut self, component: NodeId) -> usize {
        let Some(host) = self.hosts.get_mut(&component) else {
            return 0;
        };
        let zones = std::mem::take(&mut host.zones);
        for id in &zones {
            self.registry.forget(*id);
            if let Some(marker) = self.markers.remove(id) {
                self.by_node.remove(&marker.node);
            }
        }
        debug!(?component, released = zones.len(), "Released component zones");
        zones.len()
    }

    /// Close a component's render gate until `notify_rendered`
    pub fn begin_render(&mut self, component: NodeId) -> bool {
        self.hosts.get_mut(&component).is_some_and(ZoneHost::begin_render)
    }

    /// Open a component's render gate and run the insertions it held back.
    ///
    /// An insertion only runs if its marker is still waiting in `Placing`,
    /// so zones released in the meantime are skipped.
    pub fn notify_rendered(&mut self, tree: &mut DomTree, component: NodeId) -> usize {
        let Some(host) = self.hosts.get_mut(&component) else {
            return 0;
        };
        let queued = host.mark_rendered();

        let mut inserted = 0;
        for id in queued {
            let Some(ZoneState::Placing { placeholder, .. }) = self.markers.get(&id).map(|m| m.state) else {
                debug!(zone = id.get(), "Skipping deferred insertion");
                continue;
            };
            match self.insert_content(tree, id, placeholder) {
                Ok(()) => inserted += 1,
                Err(err) => {
                    warn!(zone = id.get(), "Deferred zone insertion failed: {}", err);
                    self.registry.mark_lost(id);
                    self.set_state(id, ZoneState::Lost);
                }
            }
        }
        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostOptions, NoHooks};

    #[test]
    fn test_has_zone_sources() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("outer-comp");
        let inner = tree.create_element("inner-comp");
        tree.append_child(tree.root(), outer).unwrap();
        tree.append_child(outer, inner).unwrap();

        let mut engine = ZoneEngine::new(ZoneConfig::default());
        let mut host = ZoneHost::new(outer, HostOptions::new(), Box::new(NoHooks));
        host.zones_by_name.insert("footer".to_string());
        engine.hosts.insert(outer, host);
        tree.set_attribute(inner, ZONE_REGISTRY_ATTR, "header,aside").unwrap();

        assert!(engine.has_zone(&tree, inner, "header"));
        assert!(engine.has_zone(&tree, inner, "aside"));
        assert!(engine.has_zone(&tree, inner, "footer"));
        assert!(engine.has_zone(&tree, outer, "footer"));
        assert!(!engine.has_zone(&tree, outer, "header"));
    }

    #[test]
    fn test_flush_zones_loaded_runs_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut tree = DomTree::new();
        let mut engine = ZoneEngine::new(ZoneConfig::default());
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        engine.on_zones_loaded(move |_| seen.set(seen.get() + 1));

        assert_eq!(engine.flush_zones_loaded(&mut tree), 1);
        assert_eq!(engine.flush_zones_loaded(&mut tree), 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_release_unknown_component() {
        let mut engine = ZoneEngine::new(ZoneConfig::default());
        assert_eq!(engine.release_component(NodeId::ROOT), 0);
        assert!(!engine.begin_render(NodeId::ROOT));
    }
}
