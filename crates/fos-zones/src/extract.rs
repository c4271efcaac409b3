//! Zone extraction and registration

use fos_dom::{DomError, DomTree, NodeId, Selector};
use fos_html::inner_html;
use tracing::{debug, error, warn};

use crate::engine::{ZoneMarker, ZoneState, ZONE_REGISTRY_ATTR};
use crate::host::{HostOptions, ZoneHooks, ZoneHost};
use crate::{ZoneEngine, ZoneError, ZoneId, ZoneResult};

/// Whether a marker carries anything worth placing
pub(crate) fn has_content(tree: &DomTree, marker: NodeId) -> bool {
    !inner_html(tree, marker).trim().is_empty()
}

impl ZoneEngine {
    /// Make `component` a zone host and extract the markers in its subtree.
    ///
    /// A component that is already a host keeps its zone sets, options and
    /// hooks; only extraction runs again. Returns the number of zones
    /// registered.
    pub fn attach_component(
        &mut self,
        tree: &mut DomTree,
        component: NodeId,
        parent: Option<NodeId>,
        options: HostOptions,
        hooks: Box<dyn ZoneHooks>,
    ) -> ZoneResult<usize> {
        if tree.element(component).is_none() {
            return Err(DomError::NotAnElement(component).into());
        }
        if self.hosts.contains_key(&component) {
            debug!(?component, "Component already attached, re-extracting");
        } else {
            self.hosts.insert(component, ZoneHost::new(component, options, hooks));
        }
        self.extract_zones(tree, component, parent)
    }

    /// Lift every marker out of a host's subtree.
    ///
    /// Markers with empty content are removed without being registered.
    /// Rejected markers are removed as well. Running it twice finds nothing
    /// the second time.
    pub fn extract_zones(
        &mut self,
        tree: &mut DomTree,
        component: NodeId,
        parent: Option<NodeId>,
    ) -> ZoneResult<usize> {
        let host = self.hosts.get(&component).ok_or(ZoneError::UnknownComponent(component))?;
        let selector = Selector::parse(host.marker_selector(&self.config.selector))?;
        let found = tree.query_selector_all(component, &selector);
        let found = host.hooks.filter_zones(tree, found);

        let mut registered = 0;
        for node in found {
            if has_content(tree, node) && self.register_zone(tree, node, parent, Some(component)).is_ok() {
                registered += 1;
            }
            tree.detach(node);
        }
        debug!(?component, registered, "Extracted zones");
        Ok(registered)
    }

    /// Register one marker and queue it for placement.
    ///
    /// `parent` overrides the marker's DOM parent as the node placement
    /// starts from. `fallback_owner` receives the zone when no host sits at
    /// or above that node.
    pub fn register_zone(
        &mut self,
        tree: &mut DomTree,
        node: NodeId,
        parent: Option<NodeId>,
        fallback_owner: Option<NodeId>,
    ) -> ZoneResult<ZoneId> {
        let selector_text = fallback_owner
            .and_then(|owner| self.hosts.get(&owner))
            .map_or(self.config.selector.as_str(), |host| host.marker_selector(&self.config.selector))
            .to_string();
        let selector = Selector::parse(&selector_text)?;

        let Some(element) = tree.element(node).filter(|e| selector.matches(e)) else {
            error!(?node, selector = %selector_text, "Invalid zone marker");
            return Err(ZoneError::InvalidMarker { node, selector: selector_text });
        };

        if let Some(existing) = self.by_node.get(&node).and_then(|id| self.markers.get(id)) {
            if existing.state != ZoneState::Dropped {
                error!(?node, zone = existing.id.get(), "Zone marker already registered");
                return Err(if existing.state.is_consumed() {
                    ZoneError::AlreadyPlaced(node)
                } else {
                    ZoneError::AlreadyRegistered(node)
                });
            }
        }

        let name = element
            .get_attr("name")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let Some(name) = name else {
            warn!(?node, "Zone has no name");
            return Err(ZoneError::MissingName(node));
        };

        let Some(parent_node) = parent.or_else(|| tree.parent(node)) else {
            error!(?node, "Zone has no parent");
            return Err(ZoneError::MissingParent(node));
        };

        let owner = self
            .nearest_host(tree, parent_node)
            .or_else(|| fallback_owner.filter(|owner| self.hosts.contains_key(owner)));

        let id = self.allocate_id();
        if let Some(host) = owner.and_then(|owner| self.hosts.get_mut(&owner)) {
            host.zones.insert(id);
            host.zones_by_name.insert(name.clone());
        }
        add_to_zone_registry(tree, parent_node, &name);

        debug!(zone = id.get(), %name, ?owner, "Registered zone");
        self.markers.insert(id, ZoneMarker {
            id,
            node,
            name,
            parent_node,
            owner,
            state: ZoneState::Pending,
        });
        self.by_node.insert(node, id);
        self.registry.push_pending(id);
        Ok(id)
    }

    /// Hand a marker to `component` while a drain may be running.
    ///
    /// A marker that is already waiting is re-pointed at the component and
    /// queued again; a new one is registered. The marker is removed from the
    /// live tree either way.
    pub fn insert_zone(&mut self, tree: &mut DomTree, marker: NodeId, component: NodeId) -> ZoneResult<ZoneId> {
        let waiting = self
            .by_node
            .get(&marker)
            .and_then(|id| self.markers.get_mut(id))
            .filter(|m| matches!(m.state, ZoneState::Pending | ZoneState::Lost));

        let id = match waiting {
            Some(existing) => {
                existing.parent_node = component;
                existing.state = ZoneState::Pending;
                let id = existing.id;
                self.registry.push_pending(id);
                id
            }
            None => self.register_zone(tree, marker, Some(component), Some(component))?,
        };
        tree.detach(marker);
        Ok(id)
    }
}

/// Append `name` to the `zone-registry` list of `parent`, once
fn add_to_zone_registry(tree: &mut DomTree, parent: NodeId, name: &str) {
    let Some(element) = tree.element_mut(parent) else {
        return;
    };
    let mut names: Vec<String> = element
        .get_attr(ZONE_REGISTRY_ATTR)
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    if names.iter().any(|n| n == name) {
        return;
    }
    names.push(name.to_string());
    element.set_attr(ZONE_REGISTRY_ATTR, names.join(","));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoHooks;
    use crate::ZoneConfig;
    use fos_html::HtmlParser;

    fn setup(html: &str) -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let comp = tree.create_element("my-comp");
        tree.append_child(tree.root(), comp).unwrap();
        HtmlParser::new().parse_fragment_into(&mut tree, comp, html).unwrap();
        (tree, comp)
    }

    fn attach(engine: &mut ZoneEngine, tree: &mut DomTree, comp: NodeId) -> usize {
        engine
            .attach_component(tree, comp, None, HostOptions::new(), Box::new(NoHooks))
            .unwrap()
    }

    #[test]
    fn test_extract_registers_and_detaches() {
        let (mut tree, comp) = setup(r#"<zone name="header"><b>Hi</b></zone><p>body</p>"#);
        let mut engine = ZoneEngine::new(ZoneConfig::default());

        assert_eq!(attach(&mut engine, &mut tree, comp), 1);
        assert_eq!(tree.child_ids(comp).len(), 1);
        assert_eq!(engine.pending_len(), 1);

        let marker = engine.markers().next().unwrap();
        assert_eq!(marker.name, "header");
        assert_eq!(marker.parent_node, comp);
        assert_eq!(marker.owner, Some(comp));
        assert!(!tree.is_connected(marker.node));
        assert_eq!(tree.get_attribute(comp, ZONE_REGISTRY_ATTR), Some("header"));
        assert!(engine.host(comp).unwrap().has_zone_name("header"));
    }

    #[test]
    fn test_empty_marker_is_skipped() {
        let (mut tree, comp) = setup(r#"<zone name="empty">   </zone>"#);
        let mut engine = ZoneEngine::new(ZoneConfig::default());

        assert_eq!(attach(&mut engine, &mut tree, comp), 0);
        assert!(engine.registry().is_empty());
        assert!(!tree.has_child_nodes(comp));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let (mut tree, comp) = setup(r#"<zone name="a">A</zone><zone name="b">B</zone>"#);
        let mut engine = ZoneEngine::new(ZoneConfig::default());

        assert_eq!(attach(&mut engine, &mut tree, comp), 2);
        assert_eq!(attach(&mut engine, &mut tree, comp), 0);
        assert_eq!(engine.pending_len(), 2);
        assert_eq!(tree.get_attribute(comp, ZONE_REGISTRY_ATTR), Some("a,b"));
    }

    #[test]
    fn test_missing_name_rejected() {
        let (mut tree, comp) = setup(r#"<zone>Orphan</zone>"#);
        let mut engine = ZoneEngine::new(ZoneConfig::default());

        assert_eq!(attach(&mut engine, &mut tree, comp), 0);
        assert!(engine.registry().is_empty());
        assert_eq!(engine.markers().count(), 0);
    }

    #[test]
    fn test_register_rejects_invalid_and_duplicate() {
        let (mut tree, comp) = setup(r#"<div>not a zone</div>"#);
        let mut engine = ZoneEngine::new(ZoneConfig::default());
        attach(&mut engine, &mut tree, comp);

        let div = tree.child_ids(comp)[0];
        assert!(matches!(
            engine.register_zone(&mut tree, div, None, Some(comp)),
            Err(ZoneError::InvalidMarker { .. })
        ));

        let marker = tree.create_element("zone");
        tree.set_attribute(marker, "name", "late").unwrap();
        let text = tree.create_text("x");
        tree.append_child(marker, text).unwrap();

        engine.register_zone(&mut tree, marker, Some(comp), Some(comp)).unwrap();
        assert!(matches!(
            engine.register_zone(&mut tree, marker, Some(comp), Some(comp)),
            Err(ZoneError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_detached_marker_without_parent() {
        let mut tree = DomTree::new();
        let mut engine = ZoneEngine::new(ZoneConfig::default());
        let marker = tree.create_element("zone");
        tree.set_attribute(marker, "name", "x").unwrap();

        assert!(matches!(
            engine.register_zone(&mut tree, marker, None, None),
            Err(ZoneError::MissingParent(_))
        ));
    }

    #[test]
    fn test_custom_marker_selector() {
        let (mut tree, comp) = setup(r#"<slot-in name="side">S</slot-in><zone name="main">M</zone>"#);
        let mut engine = ZoneEngine::new(ZoneConfig::default());
        let options = HostOptions::new().with_selector("slot-in");

        let count = engine
            .attach_component(&mut tree, comp, None, options, Box::new(NoHooks))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(engine.markers().next().unwrap().name, "side");
        assert_eq!(tree.child_ids(comp).len(), 1);
    }

    #[test]
    fn test_filter_hook() {
        struct OnlyMain;
        impl ZoneHooks for OnlyMain {
            fn filter_zones(&self, tree: &DomTree, zones: Vec<NodeId>) -> Vec<NodeId> {
                zones
                    .into_iter()
                    .filter(|&z| tree.get_attribute(z, "name") == Some("main"))
                    .collect()
            }
        }

        let (mut tree, comp) = setup(r#"<zone name="main">M</zone><zone name="other">O</zone>"#);
        let mut engine = ZoneEngine::new(ZoneConfig::default());
        let count = engine
            .attach_component(&mut tree, comp, None, HostOptions::new(), Box::new(OnlyMain))
            .unwrap();

        assert_eq!(count, 1);
        // The filtered-out marker stays in the light DOM
        assert_eq!(tree.child_ids(comp).len(), 1);
    }

    #[test]
    fn test_insert_zone_requeues_lost() {
        let (mut tree, comp) = setup(r#"<zone name="late">L</zone>"#);
        let mut engine = ZoneEngine::new(ZoneConfig::default());
        attach(&mut engine, &mut tree, comp);

        let marker = engine.markers().next().unwrap().clone();
        engine.registry.mark_lost(marker.id);
        engine.set_state(marker.id, ZoneState::Lost);

        let other = tree.create_element("other-comp");
        tree.append_child(tree.root(), other).unwrap();
        let id = engine.insert_zone(&mut tree, marker.node, other).unwrap();

        assert_eq!(id, marker.id);
        assert!(engine.registry().is_pending(id));
        assert_eq!(engine.marker(id).unwrap().parent_node, other);
    }
}
