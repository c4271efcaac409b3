//! Drain diagnostics

use std::time::Duration;

use fos_dom::DomTree;
use fos_html::outer_html;
use serde::Serialize;
use tracing::{info, warn};

use crate::{ZoneEngine, ZoneId};

/// Printable view of a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintableZone {
    pub name: String,
    #[serde(rename = "zoneHTML")]
    pub zone_html: String,
    pub zone_text: String,
    #[serde(rename = "parentHTML")]
    pub parent_html: String,
}

/// Summary of one drain cycle
#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport {
    /// Page time when the cycle started (ms)
    pub started_ms: u64,
    /// Page time when the final pass ran (ms)
    pub finished_ms: u64,
    /// Real time spent between the two
    pub wall_time: Duration,
    /// Insertions made during the cycle
    pub placed: usize,
    /// Batch passes run
    pub passes: usize,
    /// Zones still lost after the final pass
    pub unplaced: Vec<PrintableZone>,
}

impl DrainReport {
    pub fn elapsed_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }

    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Unplaced zones as a JSON array
    pub fn unplaced_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.unplaced).unwrap_or(serde_json::Value::Null)
    }

    /// Emit the report through tracing
    pub fn log(&self) {
        if !self.unplaced.is_empty() {
            warn!(
                count = self.unplaced.len(),
                zones = %self.unplaced_json(),
                "{} zones could not be placed",
                self.unplaced.len()
            );
        }
        info!(
            placed = self.placed,
            passes = self.passes,
            wall_us = self.wall_time.as_micros() as u64,
            "All zones placed in {} ms",
            self.elapsed_ms()
        );
    }
}

impl ZoneEngine {
    /// Printable views of the given zones, unknown ids skipped
    pub fn printable_zones(&self, tree: &DomTree, ids: &[ZoneId]) -> Vec<PrintableZone> {
        ids.iter()
            .filter_map(|id| self.markers.get(id))
            .map(|marker| PrintableZone {
                name: marker.name.clone(),
                zone_html: outer_html(tree, marker.node),
                zone_text: tree.text_content(marker.node),
                parent_html: outer_html(tree, marker.parent_node),
            })
            .collect()
    }

    /// Printable views of every zone still registered, pending first
    pub fn unplaced_zones(&self, tree: &DomTree) -> Vec<PrintableZone> {
        let mut ids = self.registry.pending_ids();
        ids.extend(self.registry.lost_ids());
        self.printable_zones(tree, &ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(unplaced: Vec<PrintableZone>) -> DrainReport {
        DrainReport {
            started_ms: 10,
            finished_ms: 12,
            wall_time: Duration::from_micros(150),
            placed: 3,
            passes: 2,
            unplaced,
        }
    }

    #[test]
    fn test_elapsed_and_flags() {
        let r = report(Vec::new());
        assert_eq!(r.elapsed_ms(), 2);
        assert!(r.all_placed());
        assert_eq!(r.unplaced_json(), serde_json::json!([]));
    }

    #[test]
    fn test_printable_zone_json_keys() {
        let r = report(vec![PrintableZone {
            name: "header".into(),
            zone_html: "<zone name=\"header\">Hi</zone>".into(),
            zone_text: "Hi".into(),
            parent_html: "<my-comp></my-comp>".into(),
        }]);

        let json = r.unplaced_json();
        assert_eq!(json[0]["name"], "header");
        assert_eq!(json[0]["zoneText"], "Hi");
        assert_eq!(json[0]["zoneHTML"], "<zone name=\"header\">Hi</zone>");
        assert_eq!(json[0]["parentHTML"], "<my-comp></my-comp>");
        assert!(!r.all_placed());
    }
}
