//! Zone host capability
//!
//! A component becomes a zone host when it is attached to the engine. The
//! host keeps the zones it owns, the names it has seen, its selector
//! overrides, an optional render gate, and the hooks the engine calls
//! during placement.

use std::collections::BTreeSet;
use std::fmt;

use fos_dom::{DomTree, NodeId};

use crate::ZoneId;

/// Attribute overriding the marker selector for one component
pub const ZONE_SELECTOR_ATTR: &str = "zone-selector";
/// Attribute overriding the placeholder selector template for one component
pub const ZONE_RESOLVER_SELECTOR_ATTR: &str = "zone-resolver-selector";

/// Per-component options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostOptions {
    /// Marker selector, engine default when `None`
    pub selector: Option<String>,
    /// Placeholder selector template, engine default when `None`
    pub resolver_selector: Option<String>,
    /// Insertions into this host wait for `notify_rendered`
    pub render_hook: bool,
}

impl HostOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the component's `zone-selector` and
    /// `zone-resolver-selector` attributes
    pub fn from_element(tree: &DomTree, component: NodeId) -> Self {
        let read = |name: &str| {
            tree.get_attribute(component, name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            selector: read(ZONE_SELECTOR_ATTR),
            resolver_selector: read(ZONE_RESOLVER_SELECTOR_ATTR),
            render_hook: false,
        }
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selector = Some(selector.to_string());
        self
    }

    pub fn with_resolver_selector(mut self, template: &str) -> Self {
        self.resolver_selector = Some(template.to_string());
        self
    }

    pub fn with_render_hook(mut self, enabled: bool) -> Self {
        self.render_hook = enabled;
        self
    }
}

/// What to do with a zone whose placeholder could not be found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LostZoneAction {
    /// Keep it in the lost registry for the next sweep
    #[default]
    Register,
    /// Drop it
    Discard,
    /// Drop it and call the owner's `on_zones_loaded` once all zones load
    DiscardUntilLoaded,
}

/// Data handed to hooks about one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPayload {
    pub zone_id: ZoneId,
    /// The marker node
    pub zone: NodeId,
    pub zone_name: String,
    /// Component that contains the placeholder
    pub zone_component: Option<NodeId>,
    /// The placeholder
    pub zone_container: Option<NodeId>,
    /// Placeholder children before insertion
    pub nodes: Vec<NodeId>,
}

/// Component hooks. Every method has a no-op default.
pub trait ZoneHooks {
    /// Narrow down the markers found during extraction
    fn filter_zones(&self, _tree: &DomTree, zones: Vec<NodeId>) -> Vec<NodeId> {
        zones
    }

    /// Called on the target component right before content is inserted
    fn on_place_zone(&mut self, _tree: &mut DomTree, _payload: &PlacementPayload) {}

    /// Called on the owner when a zone has no placeholder
    fn on_lost_zone(&mut self, _tree: &DomTree, _payload: &PlacementPayload) -> LostZoneAction {
        LostZoneAction::Register
    }

    /// Deferred callback for zones discarded with `DiscardUntilLoaded`
    fn on_zones_loaded(&mut self, _tree: &mut DomTree, _payload: &PlacementPayload) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ZoneHooks for NoHooks {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RenderGate {
    Untracked,
    Tracked { rendered: bool, queued: Vec<ZoneId> },
}

/// Zone state attached to one component
pub struct ZoneHost {
    node: NodeId,
    pub(crate) zones: BTreeSet<ZoneId>,
    pub(crate) zones_by_name: BTreeSet<String>,
    pub(crate) options: HostOptions,
    pub(crate) render: RenderGate,
    pub(crate) hooks: Box<dyn ZoneHooks>,
}

impl ZoneHost {
    pub(crate) fn new(node: NodeId, options: HostOptions, hooks: Box<dyn ZoneHooks>) -> Self {
        let render = if options.render_hook {
            RenderGate::Tracked { rendered: false, queued: Vec::new() }
        } else {
            RenderGate::Untracked
        };
        Self {
            node,
            zones: BTreeSet::new(),
            zones_by_name: BTreeSet::new(),
            options,
            render,
            hooks,
        }
    }

    /// Component node
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    /// Zones this component owns, in registration order
    pub fn zones(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.zones.iter().copied()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn owns(&self, id: ZoneId) -> bool {
        self.zones.contains(&id)
    }

    /// Every zone name this component has seen
    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones_by_name.iter().map(String::as_str)
    }

    pub fn has_zone_name(&self, name: &str) -> bool {
        self.zones_by_name.contains(name)
    }

    /// Whether insertions run immediately
    pub fn is_rendered(&self) -> bool {
        match &self.render {
            RenderGate::Untracked => true,
            RenderGate::Tracked { rendered, .. } => *rendered,
        }
    }

    /// Insertions waiting for the next render
    pub fn deferred_len(&self) -> usize {
        match &self.render {
            RenderGate::Untracked => 0,
            RenderGate::Tracked { queued, .. } => queued.len(),
        }
    }

    pub(crate) fn marker_selector<'a>(&'a self, default: &'a str) -> &'a str {
        self.options.selector.as_deref().unwrap_or(default)
    }

    pub(crate) fn resolver_template<'a>(&'a self, default: &'a str) -> &'a str {
        self.options.resolver_selector.as_deref().unwrap_or(default)
    }

    /// Queue an insertion if the gate is closed. Returns false when the
    /// caller should insert right away.
    pub(crate) fn defer(&mut self, id: ZoneId) -> bool {
        match &mut self.render {
            RenderGate::Tracked { rendered: false, queued } => {
                queued.push(id);
                true
            }
            _ => false,
        }
    }

    /// Close the gate until the next `mark_rendered`
    pub(crate) fn begin_render(&mut self) -> bool {
        match &mut self.render {
            RenderGate::Tracked { rendered, .. } => {
                *rendered = false;
                true
            }
            RenderGate::Untracked => false,
        }
    }

    /// Open the gate and hand back queued insertions in order
    pub(crate) fn mark_rendered(&mut self) -> Vec<ZoneId> {
        match &mut self.render {
            RenderGate::Tracked { rendered, queued } => {
                *rendered = true;
                std::mem::take(queued)
            }
            RenderGate::Untracked => Vec::new(),
        }
    }
}

impl fmt::Debug for ZoneHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneHost")
            .field("node", &self.node)
            .field("zones", &self.zones)
            .field("zones_by_name", &self.zones_by_name)
            .field("options", &self.options)
            .field("render", &self.render)
            .finish_non_exhaustive()
    }
}
