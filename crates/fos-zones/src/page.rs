//! Zone page
//!
//! Owns a document, a zone engine and the task queue that drives drain
//! cycles. This is the single-threaded context everything runs in: tasks
//! are closures over the page, and the page runs them one at a time.

use std::time::Instant;

use fos_dom::{Document, DomTree, NodeId};
use fos_html::{HtmlParser, ParseError};
use tracing::{debug, trace, warn};

use crate::event_loop::{TaskQueue, TimerId};
use crate::host::{HostOptions, NoHooks, ZoneHooks};
use crate::timing::{Debounce, Throttle, ThrottleDecision};
use crate::{DrainReport, ZoneConfig, ZoneEngine, ZoneId, ZoneResult};

/// Counters over the page's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// `handle_zones` calls
    pub requests: usize,
    /// Calls absorbed by the throttle
    pub suppressed: usize,
    pub drain_cycles: usize,
    pub batch_passes: usize,
    pub final_passes: usize,
    /// Insertions made by drain cycles
    pub placements: usize,
    /// Verbose drain reports that survived the debounce and were logged
    pub reports_logged: usize,
}

#[derive(Debug, Clone, Copy)]
struct DrainCycle {
    started_ms: u64,
    started_at: Instant,
    placed_before: usize,
    passes: usize,
}

/// Document plus zone engine plus event loop
pub struct ZonePage {
    document: Document,
    engine: ZoneEngine,
    tasks: TaskQueue<ZonePage>,
    throttle: Throttle,
    benchmark: Debounce,
    stats: DrainStats,
    last_report: Option<DrainReport>,
}

impl ZonePage {
    /// Page over an empty `html/head/body` document
    pub fn new(config: ZoneConfig) -> Self {
        Self::with_document(Document::new("about:blank"), config)
    }

    pub fn with_document(document: Document, config: ZoneConfig) -> Self {
        Self {
            document,
            throttle: Throttle::new(config.insertion_interval_ms),
            benchmark: Debounce::new(config.benchmark_interval_ms),
            engine: ZoneEngine::new(config),
            tasks: TaskQueue::new(),
            stats: DrainStats::default(),
            last_report: None,
        }
    }

    /// Parse markup into a new page
    pub fn load_html(html: &str, config: ZoneConfig) -> ZoneResult<Self> {
        let document = HtmlParser::new().parse(html)?;
        Ok(Self::with_document(document, config))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn tree(&self) -> &DomTree {
        &self.document.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.document.tree
    }

    pub fn engine(&self) -> &ZoneEngine {
        &self.engine
    }

    pub fn config(&self) -> &ZoneConfig {
        self.engine.config()
    }

    pub fn stats(&self) -> DrainStats {
        self.stats
    }

    /// Report of the most recent drain cycle
    pub fn last_report(&self) -> Option<&DrainReport> {
        self.last_report.as_ref()
    }

    /// Current page time (ms)
    pub fn now_ms(&self) -> u64 {
        self.tasks.now_ms()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Parse markup and append it under `parent`, as a component render would
    pub fn render_into(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, ParseError> {
        HtmlParser::new().parse_fragment_into(&mut self.document.tree, parent, html)
    }

    /// Attach a component with options read from its attributes and no hooks
    pub fn attach_component(&mut self, component: NodeId) -> ZoneResult<usize> {
        let options = HostOptions::from_element(&self.document.tree, component);
        self.attach_component_with(component, None, options, NoHooks)
    }

    /// Attach a component with explicit options and hooks
    pub fn attach_component_with(
        &mut self,
        component: NodeId,
        parent: Option<NodeId>,
        options: HostOptions,
        hooks: impl ZoneHooks + 'static,
    ) -> ZoneResult<usize> {
        self.engine
            .attach_component(&mut self.document.tree, component, parent, options, Box::new(hooks))
    }

    /// Hand a marker to a component while a drain may be running
    pub fn insert_zone(&mut self, marker: NodeId, component: NodeId) -> ZoneResult<ZoneId> {
        self.engine.insert_zone(&mut self.document.tree, marker, component)
    }

    pub fn has_zone(&self, component: NodeId, name: &str) -> bool {
        self.engine.has_zone(&self.document.tree, component, name)
    }

    pub fn get_zone(&self, component: NodeId, name: &str) -> Option<NodeId> {
        self.engine.get_zone(component, name)
    }

    /// Run `listener` the next time no zones are pending
    pub fn on_zones_loaded(&mut self, listener: impl FnOnce(&mut DomTree) + 'static) {
        self.engine.on_zones_loaded(listener);
    }

    pub fn begin_render(&mut self, component: NodeId) -> bool {
        self.engine.begin_render(component)
    }

    /// Report that a component finished rendering, running held-back insertions
    pub fn notify_rendered(&mut self, component: NodeId) -> usize {
        let inserted = self.engine.notify_rendered(&mut self.document.tree, component);
        self.stats.placements += inserted;
        inserted
    }

    /// Throttled drain trigger. Calls within one window share one cycle.
    pub fn handle_zones(&mut self) {
        self.stats.requests += 1;
        match self.throttle.request() {
            ThrottleDecision::Schedule(delay) => {
                self.tasks.set_timeout(delay, |page: &mut ZonePage| {
                    let now = page.tasks.now_ms();
                    page.throttle.fire(now);
                    page.insert_zones();
                });
            }
            ThrottleDecision::Suppressed => {
                self.stats.suppressed += 1;
                trace!("Zone drain already scheduled");
            }
        }
    }

    /// Start a drain cycle now: lost zones are requeued and the first batch
    /// pass runs. Follow-up passes run as zero-delay tasks.
    pub fn insert_zones(&mut self) {
        self.stats.drain_cycles += 1;
        let requeued = self.engine.registry.requeue_lost();
        debug!(
            pending = self.engine.pending_len(),
            requeued,
            "Starting zone drain cycle"
        );

        let cycle = DrainCycle {
            started_ms: self.tasks.now_ms(),
            started_at: Instant::now(),
            placed_before: self.engine.placed_total(),
            passes: 0,
        };
        self.batch_pass(cycle, true);
    }

    /// Every attempted zone leaves pending whatever the outcome, so progress
    /// is counted in resolved zones. A pass that resolves nothing ends the
    /// cycle; whatever is still pending waits for the next trigger.
    fn batch_pass(&mut self, mut cycle: DrainCycle, first: bool) {
        let before = self.engine.pending_len();
        let resolved = self.engine.drain_batch(&mut self.document.tree);
        cycle.passes += 1;
        self.stats.batch_passes += 1;
        trace!(resolved, before, after = self.engine.pending_len(), "Zone batch pass");

        let retry = first || resolved > 0;
        self.tasks.set_timeout(0, move |page: &mut ZonePage| {
            if page.engine.registry.has_pending() && retry {
                page.batch_pass(cycle, false);
            } else {
                page.final_pass(cycle);
            }
        });
    }

    fn final_pass(&mut self, cycle: DrainCycle) {
        let tree = &mut self.document.tree;
        self.engine.retry_lost(tree);
        if !self.engine.registry.has_pending() {
            self.engine.flush_zones_loaded(tree);
        }
        self.stats.final_passes += 1;

        let placed = self.engine.placed_total() - cycle.placed_before;
        self.stats.placements += placed;
        let report = DrainReport {
            started_ms: cycle.started_ms,
            finished_ms: self.tasks.now_ms(),
            wall_time: cycle.started_at.elapsed(),
            placed,
            passes: cycle.passes,
            unplaced: self.engine.unplaced_zones(&self.document.tree),
        };
        debug!(
            placed,
            unplaced = report.unplaced.len(),
            passes = cycle.passes,
            "Zone drain cycle finished"
        );
        self.last_report = Some(report);

        if self.engine.config().verbose {
            let generation = self.benchmark.call();
            self.tasks.set_timeout(self.benchmark.delay_ms(), move |page: &mut ZonePage| {
                if page.benchmark.is_current(generation) {
                    if let Some(report) = &page.last_report {
                        report.log();
                        page.stats.reports_logged += 1;
                    }
                }
            });
        }
    }

    /// Release a component's zones once it has stayed out of the document
    /// for the destroy delay. Returns false if it owns no zones.
    pub fn destroy_component_zones(&mut self, component: NodeId) -> bool {
        if self.engine.host(component).is_none_or(|host| host.zone_count() == 0) {
            return false;
        }
        let delay = self.engine.config().destroy_delay_ms;
        self.tasks.set_timeout(delay, move |page: &mut ZonePage| {
            if !page.document.tree.is_connected(component) {
                page.engine.release_component(component);
            }
        });
        true
    }

    /// Schedule an arbitrary task on the page
    pub fn set_timeout(&mut self, delay_ms: u64, task: impl FnOnce(&mut ZonePage) + 'static) -> TimerId {
        self.tasks.set_timeout(delay_ms, task)
    }

    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.tasks.clear_timeout(id)
    }

    /// Run tasks until the queue is empty or the task budget is spent.
    /// Returns the number of tasks run.
    pub fn run_until_idle(&mut self) -> usize {
        let budget = self.engine.config().max_tasks_per_run;
        let mut ran = 0;
        while let Some(task) = self.tasks.pop_next() {
            task(self);
            ran += 1;
            if ran >= budget && !self.tasks.is_empty() {
                warn!(ran, remaining = self.tasks.len(), "Task budget exhausted");
                break;
            }
        }
        ran
    }

    /// Run every task due within the next `ms` and move the clock forward.
    /// Returns the number of tasks run.
    pub fn advance_by(&mut self, ms: u64) -> usize {
        let deadline = self.tasks.now_ms().saturating_add(ms);
        let mut ran = 0;
        while let Some(task) = self.tasks.pop_due_by(deadline) {
            task(self);
            ran += 1;
        }
        self.tasks.advance_to(deadline);
        ran
    }
}

impl std::fmt::Debug for ZonePage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZonePage")
            .field("url", &self.document.url())
            .field("engine", &self.engine)
            .field("tasks", &self.tasks)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
