//! Zone placement

use fos_dom::{DomResult, DomTree, NodeId};
use tracing::{debug, trace, warn};

use crate::engine::{LoadedCallback, ZoneState};
use crate::extract::has_content;
use crate::host::{LostZoneAction, PlacementPayload};
use crate::resolve::Resolution;
use crate::{ZoneEngine, ZoneId};

/// Marker attribute prefix copied onto the placeholder
pub const FORWARD_ATTR_PREFIX: &str = "el-";

/// Result of one placement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// Content moved into the placeholder
    Placed,
    /// Resolved, waiting for the target to render
    Deferred,
    /// No placeholder yet, kept for the next sweep
    Lost,
    /// Discarded
    Dropped,
    /// Unknown, already placed or dropped
    Skipped,
}

impl ZoneEngine {
    /// Try to place one zone. Never fails: an unresolved zone is tracked
    /// through the lost registry or dropped.
    pub fn place_zone(&mut self, tree: &mut DomTree, id: ZoneId) -> PlaceOutcome {
        match self.markers.get(&id).map(|m| m.state) {
            Some(ZoneState::Pending | ZoneState::Lost) => {}
            Some(_) => {
                self.registry.forget(id);
                trace!(zone = id.get(), "Zone already handled");
                return PlaceOutcome::Skipped;
            }
            None => return PlaceOutcome::Skipped,
        }

        let Some(resolution) = self.resolve_zone(tree, id) else {
            return PlaceOutcome::Skipped;
        };
        let (target, placeholder, payload) = match resolution {
            Resolution::Resolved { target, placeholder, payload } => (target, placeholder, payload),
            Resolution::Unresolved { owner, payload } => return self.handle_lost(tree, owner, payload),
        };

        if let Some(host) = self.hosts.get_mut(&target) {
            host.hooks.on_place_zone(tree, &payload);
        }
        self.registry.forget(id);
        forward_attributes(tree, payload.zone, placeholder);

        let deferred = self.hosts.get_mut(&target).is_some_and(|host| host.defer(id));
        let outcome = if deferred {
            self.set_state(id, ZoneState::Placing { target, placeholder });
            debug!(zone = id.get(), ?target, "Zone insertion deferred until render");
            PlaceOutcome::Deferred
        } else {
            match self.insert_content(tree, id, placeholder) {
                Ok(()) => PlaceOutcome::Placed,
                Err(err) => {
                    warn!(zone = id.get(), "Zone insertion failed: {}", err);
                    self.registry.mark_lost(id);
                    self.set_state(id, ZoneState::Lost);
                    PlaceOutcome::Lost
                }
            }
        };

        if !self.registry.has_pending() {
            self.flush_zones_loaded(tree);
        }
        outcome
    }

    /// Move a marker's children into its placeholder
    pub(crate) fn insert_content(&mut self, tree: &mut DomTree, id: ZoneId, placeholder: NodeId) -> DomResult<()> {
        let Some(marker) = self.markers.get_mut(&id) else {
            return Ok(());
        };
        let nodes = tree.child_ids(marker.node);
        tree.append_nodes(placeholder, &nodes)?;

        marker.state = ZoneState::Placed;
        self.placed_total += 1;
        debug!(zone = id.get(), name = %marker.name, nodes = nodes.len(), "Placed zone");
        Ok(())
    }

    /// Decide the fate of a zone without a placeholder
    pub(crate) fn handle_lost(
        &mut self,
        tree: &mut DomTree,
        owner: Option<NodeId>,
        payload: PlacementPayload,
    ) -> PlaceOutcome {
        let id = payload.zone_id;
        let action = match owner.and_then(|owner| self.hosts.get_mut(&owner)) {
            Some(host) => {
                host.zones_by_name.insert(payload.zone_name.clone());
                host.hooks.on_lost_zone(tree, &payload)
            }
            None => LostZoneAction::Register,
        };

        match action {
            LostZoneAction::Register if has_content(tree, payload.zone) => {
                self.registry.mark_lost(id);
                self.set_state(id, ZoneState::Lost);
                trace!(zone = id.get(), name = %payload.zone_name, "Zone lost");
                PlaceOutcome::Lost
            }
            LostZoneAction::DiscardUntilLoaded => {
                if let Some(host) = owner {
                    self.loaded.push(LoadedCallback::Host { host, payload });
                }
                self.drop_zone(id);
                PlaceOutcome::Dropped
            }
            LostZoneAction::Register | LostZoneAction::Discard => {
                self.drop_zone(id);
                PlaceOutcome::Dropped
            }
        }
    }

    fn drop_zone(&mut self, id: ZoneId) {
        self.registry.forget(id);
        self.set_state(id, ZoneState::Dropped);
        debug!(zone = id.get(), "Dropped zone");
    }

    /// One batch pass: attempt up to `batch_size` pending zones in order.
    /// Returns the number that resolved, placed or deferred.
    pub fn drain_batch(&mut self, tree: &mut DomTree) -> usize {
        let batch = self.registry.pending_batch(self.config.effective_batch_size());
        batch
            .into_iter()
            .map(|id| self.place_zone(tree, id))
            .filter(|outcome| matches!(outcome, PlaceOutcome::Placed | PlaceOutcome::Deferred))
            .count()
    }

    /// One attempt over every lost zone. Returns the number attempted.
    pub fn retry_lost(&mut self, tree: &mut DomTree) -> usize {
        let lost = self.registry.lost_ids();
        for &id in &lost {
            self.place_zone(tree, id);
        }
        lost.len()
    }
}

/// Copy `el-*` attributes from the marker onto the placeholder
fn forward_attributes(tree: &mut DomTree, marker: NodeId, placeholder: NodeId) {
    let attrs = tree
        .element(marker)
        .map(|e| e.attributes_with_prefix(FORWARD_ATTR_PREFIX))
        .unwrap_or_default();
    if let Some(element) = tree.element_mut(placeholder) {
        for (name, value) in attrs {
            element.set_attr(&name, value);
        }
    }
}
