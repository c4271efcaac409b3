//! fOS Zones - content distribution for components
//!
//! Components declare `<zone name="...">` markers in their light DOM. The
//! engine lifts those markers out of the tree, remembers which component owns
//! them, and later moves each marker's children into the `[zone="name"]`
//! placeholder of whatever component rendered it.
//!
//! Child components may not have rendered when a marker is extracted, so
//! placement is best-effort: a throttled trigger starts a drain cycle that
//! places pending markers in batches, parks the ones without a placeholder in
//! a lost set, and retries them on the next cycle.
//!
//! Features:
//! - Explicit owner capability per component (`ZoneHost` + `ZoneHooks`)
//! - Pending/lost registries owned by one engine, no global state
//! - Render gate so insertion waits for a component's next render
//! - Virtual-time event loop with throttle and debounce gates
//! - Drain reports with printable unplaced zones

pub mod config;
pub mod error;
pub mod event_loop;
pub mod timing;

mod diagnostics;
mod engine;
mod extract;
mod host;
mod page;
mod place;
mod registry;
mod resolve;

pub use config::{
    ZoneConfig, DEFAULT_BATCH_SIZE, ZONE_BENCHMARK_INTERVAL_MS, ZONE_DESTROY_DELAY_MS,
    ZONE_INSERTION_INTERVAL_MS, ZONE_RESOLVER_SELECTOR, ZONE_SELECTOR,
};
pub use diagnostics::{DrainReport, PrintableZone};
pub use engine::{ZoneEngine, ZoneMarker, ZoneState, ZONE_REGISTRY_ATTR};
pub use error::{ZoneError, ZoneResult};
pub use host::{
    HostOptions, LostZoneAction, NoHooks, PlacementPayload, ZoneHooks, ZoneHost,
    ZONE_RESOLVER_SELECTOR_ATTR, ZONE_SELECTOR_ATTR,
};
pub use page::{DrainStats, ZonePage};
pub use place::{PlaceOutcome, FORWARD_ATTR_PREFIX};
pub use registry::ZoneRegistry;
pub use resolve::Resolution;

/// Zone marker identifier, allocated in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub(crate) u64);

impl ZoneId {
    /// Raw sequence number
    pub fn get(self) -> u64 {
        self.0
    }
}
