//! Zone Engine Configuration

use serde::Deserialize;

use crate::ZoneResult;

/// Default marker selector
pub const ZONE_SELECTOR: &str = "zone";
/// Default placeholder selector template, `{zoneName}` is substituted
pub const ZONE_RESOLVER_SELECTOR: &str = r#"[zone="{zoneName}"]"#;
/// Markers attempted per batch pass
pub const DEFAULT_BATCH_SIZE: usize = 25;
/// Minimum spacing between throttled drain cycles
pub const ZONE_INSERTION_INTERVAL_MS: u64 = 10;
/// Quiet period before verbose diagnostics are logged
pub const ZONE_BENCHMARK_INTERVAL_MS: u64 = 500;
/// Grace period before a disconnected component's zones are released
pub const ZONE_DESTROY_DELAY_MS: u64 = 5;
/// Tasks run by one `run_until_idle` call before bailing out
pub const DEFAULT_MAX_TASKS_PER_RUN: usize = 10_000;

/// Zone engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Marker selector used when a component has no override
    pub selector: String,

    /// Placeholder selector template
    pub resolver_selector: String,

    /// Markers attempted per batch pass
    pub batch_size: usize,

    /// Throttle window for `handle_zones` (ms)
    pub insertion_interval_ms: u64,

    /// Debounce window for verbose diagnostics (ms)
    pub benchmark_interval_ms: u64,

    /// Delay before releasing a disconnected component's zones (ms)
    pub destroy_delay_ms: u64,

    /// Log unplaced zones and drain timing
    pub verbose: bool,

    /// Task budget for one `run_until_idle` call
    pub max_tasks_per_run: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            selector: ZONE_SELECTOR.to_string(),
            resolver_selector: ZONE_RESOLVER_SELECTOR.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            insertion_interval_ms: ZONE_INSERTION_INTERVAL_MS,
            benchmark_interval_ms: ZONE_BENCHMARK_INTERVAL_MS,
            destroy_delay_ms: ZONE_DESTROY_DELAY_MS,
            verbose: false,
            max_tasks_per_run: DEFAULT_MAX_TASKS_PER_RUN,
        }
    }
}

impl ZoneConfig {
    /// Parse a JSON configuration; missing keys keep their defaults
    pub fn from_json(json: &str) -> ZoneResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selector = selector.to_string();
        self
    }

    pub fn with_resolver_selector(mut self, template: &str) -> Self {
        self.resolver_selector = template.to_string();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Batch size, never zero
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Placeholder selector for a zone name
    pub fn resolver_for(template: &str, zone_name: &str) -> String {
        template.replace("{zoneName}", zone_name)
    }
}
