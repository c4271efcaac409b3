//! Comprehensive tests for fos-zones
//!
//! Full drain cycles on a page: extraction, throttled triggers, retries,
//! render gates, teardown and diagnostics.

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::{NodeId, Selector};
use fos_html::inner_html;
use fos_zones::{HostOptions, NoHooks, ZoneConfig, ZonePage, ZoneState};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn page(html: &str) -> ZonePage {
    ZonePage::load_html(html, ZoneConfig::default()).unwrap()
}

fn by_id(page: &ZonePage, id: &str) -> NodeId {
    page.document().get_element_by_id(id).unwrap()
}

fn placeholder(page: &ZonePage, name: &str) -> NodeId {
    let tree = page.tree();
    tree.query_selector(tree.root(), &Selector::attribute("zone", name)).unwrap()
}

fn drain(page: &mut ZonePage) {
    page.handle_zones();
    page.run_until_idle();
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_scenario_a_single_drain_places_content() {
    init_tracing();
    let mut page = page(r#"<my-comp id="parent"><zone name="header">Hi</zone></my-comp>"#);
    let parent = by_id(&page, "parent");
    assert_eq!(page.attach_component(parent).unwrap(), 1);

    let marker = page.engine().markers().next().unwrap().node;
    let original = page.tree().child_ids(marker);

    let child = page
        .render_into(parent, r#"<child-comp><div zone="header"></div></child-comp>"#)
        .unwrap()[0];
    page.attach_component(child).unwrap();

    drain(&mut page);

    let div = placeholder(&page, "header");
    assert_eq!(page.tree().child_ids(div), original);
    assert_eq!(page.tree().text_content(div), "Hi");
    assert!(page.engine().registry().is_empty());
    assert_eq!(page.stats().drain_cycles, 1);
    assert_eq!(page.stats().placements, 1);
}

#[test]
fn test_scenario_b_placeholder_rendered_later() {
    init_tracing();
    let mut page = page(r#"<my-comp id="parent"><zone name="header">Hi</zone></my-comp>"#);
    let parent = by_id(&page, "parent");
    page.attach_component(parent).unwrap();

    drain(&mut page);
    let id = page.engine().markers().next().unwrap().id;
    assert!(page.engine().registry().is_lost(id));
    assert_eq!(page.last_report().unwrap().unplaced.len(), 1);
    assert_eq!(page.last_report().unwrap().unplaced[0].name, "header");

    page.render_into(parent, r#"<div zone="header"></div>"#).unwrap();
    drain(&mut page);

    assert_eq!(page.tree().text_content(placeholder(&page, "header")), "Hi");
    assert_eq!(page.engine().marker(id).unwrap().state, ZoneState::Placed);
    assert!(page.last_report().unwrap().all_placed());
    assert_eq!(page.stats().drain_cycles, 2);
}

#[test]
fn test_scenario_c_nameless_marker() {
    init_tracing();
    let mut page = page(r#"<my-comp id="parent"><zone>Nameless</zone><div zone=""></div></my-comp>"#);
    let parent = by_id(&page, "parent");

    assert_eq!(page.attach_component(parent).unwrap(), 0);
    assert!(page.engine().registry().is_empty());
    assert_eq!(page.engine().markers().count(), 0);

    drain(&mut page);
    assert_eq!(page.stats().placements, 0);
    assert!(!page.tree().has_child_nodes(placeholder(&page, "")));
}

#[test]
fn test_scenario_d_one_cycle_per_window() {
    let mut page = page(r#"<my-comp id="parent"><zone name="a">A</zone><div zone="a"></div></my-comp>"#);
    let parent = by_id(&page, "parent");
    page.attach_component(parent).unwrap();

    page.handle_zones();
    page.handle_zones();
    page.run_until_idle();

    let stats = page.stats();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.suppressed, 1);
    assert_eq!(stats.drain_cycles, 1);
    assert_eq!(stats.final_passes, 1);
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn test_every_pair_placed_with_original_children() {
    let markers: String = (0..40)
        .map(|i| format!(r#"<zone name="z{i}"><span>{i}</span> text {i}</zone>"#))
        .collect();
    let mut page = page(&format!(r#"<my-comp id="parent">{markers}</my-comp>"#));
    let parent = by_id(&page, "parent");
    page.attach_component(parent).unwrap();

    let originals: Vec<(String, Vec<NodeId>)> = page
        .engine()
        .markers()
        .map(|m| (m.name.clone(), page.tree().child_ids(m.node)))
        .collect();
    assert_eq!(originals.len(), 40);

    let slots: String = (0..40).rev().map(|i| format!(r#"<div zone="z{i}"></div>"#)).collect();
    page.render_into(parent, &slots).unwrap();
    drain(&mut page);

    for (name, children) in originals {
        assert_eq!(page.tree().child_ids(placeholder(&page, &name)), children, "zone {name}");
    }
    // 40 markers at 25 per pass
    assert_eq!(page.stats().batch_passes, 2);
    assert_eq!(page.stats().placements, 40);
}

#[test]
fn test_empty_markers_never_registered() {
    let mut page = page(r#"<my-comp id="parent"><zone name="a"></zone><zone name="b">  </zone><zone name="c"><!-- --></zone></my-comp>"#);
    let parent = by_id(&page, "parent");

    assert_eq!(page.attach_component(parent).unwrap(), 1);
    assert_eq!(page.engine().pending_len(), 1);
    assert_eq!(page.engine().markers().next().unwrap().name, "c");
    assert!(!page.tree().has_child_nodes(parent));
}

#[test]
fn test_disconnected_component_never_receives_content() {
    let mut page = page(r#"<my-comp id="parent"><zone name="a">A</zone></my-comp>"#);
    let parent = by_id(&page, "parent");
    page.attach_component(parent).unwrap();

    page.tree_mut().detach(parent);
    assert!(page.destroy_component_zones(parent));
    let slot = page.render_into(parent, r#"<div zone="a"></div>"#).unwrap()[0];
    drain(&mut page);

    assert!(!page.tree().has_child_nodes(slot));
    assert!(page.engine().registry().is_empty());
    assert_eq!(page.engine().markers().count(), 0);
    assert_eq!(page.engine().host(parent).unwrap().zone_count(), 0);
}

#[test]
fn test_reconnected_component_keeps_zones() {
    let mut page = page(r#"<my-comp id="parent"><zone name="a">A</zone></my-comp>"#);
    let parent = by_id(&page, "parent");
    page.attach_component(parent).unwrap();

    let body = page.document().body();
    page.tree_mut().detach(parent);
    page.destroy_component_zones(parent);
    page.tree_mut().append_child(body, parent).unwrap();
    page.run_until_idle();

    assert_eq!(page.engine().pending_len(), 1);
}

#[test]
fn test_placement_is_idempotent() {
    let mut page = page(r#"<my-comp id="parent"><zone name="a">A</zone><p zone="a"></p></my-comp>"#);
    let parent = by_id(&page, "parent");
    page.attach_component(parent).unwrap();

    drain(&mut page);
    drain(&mut page);
    page.insert_zones();
    page.run_until_idle();

    let slot = placeholder(&page, "a");
    assert_eq!(inner_html(page.tree(), slot), "A");
    assert_eq!(page.engine().placed_total(), 1);
}

// ============================================================================
// OWNERSHIP AND QUERIES
// ============================================================================

#[test]
fn test_nested_components_route_to_owner() {
    let html = r#"
        <outer-comp id="outer">
            <zone name="title">Outer title</zone>
            <inner-comp id="inner">
                <zone name="body">Inner body</zone>
            </inner-comp>
        </outer-comp>
    "#;
    let mut page = page(html);
    let outer = by_id(&page, "outer");
    let inner = by_id(&page, "inner");

    // Inner components attach first, the way custom elements upgrade
    page.attach_component(inner).unwrap();
    page.attach_component(outer).unwrap();
    assert_eq!(page.engine().host(inner).unwrap().zone_count(), 1);
    assert_eq!(page.engine().host(outer).unwrap().zone_count(), 1);

    page.render_into(inner, r#"<section zone="body"></section>"#).unwrap();
    page.render_into(outer, r#"<h1 zone="title"></h1>"#).unwrap();
    drain(&mut page);

    assert_eq!(page.tree().text_content(placeholder(&page, "title")), "Outer title");
    assert_eq!(page.tree().text_content(placeholder(&page, "body")), "Inner body");
}

#[test]
fn test_has_zone_and_get_zone() {
    let mut page = page(r#"<my-comp id="parent"><zone name="header">H</zone><child-comp id="child"></child-comp></my-comp>"#);
    let parent = by_id(&page, "parent");
    let child = by_id(&page, "child");
    page.attach_component(parent).unwrap();
    page.attach_component(child).unwrap();

    assert!(page.has_zone(parent, "header"));
    assert!(page.has_zone(child, "header"), "falls back to the parent's names");
    assert!(!page.has_zone(parent, "footer"));
    assert_eq!(page.tree().get_attribute(parent, "zone-registry"), Some("header"));

    let marker = page.get_zone(parent, "header").unwrap();
    assert_eq!(page.tree().tag_name(marker), Some("zone"));
    assert_eq!(page.get_zone(parent, "footer"), None);
}

#[test]
fn test_component_selector_attributes() {
    let html = r#"
        <my-comp id="parent" zone-selector="slot-in" zone-resolver-selector="[data-slot=&quot;{zoneName}&quot;]">
            <slot-in name="side" el-role="note">Side</slot-in>
            <zone name="ignored">Kept</zone>
            <aside data-slot="side"></aside>
        </my-comp>
    "#;
    let mut page = page(html);
    let parent = by_id(&page, "parent");
    assert_eq!(page.attach_component(parent).unwrap(), 1);

    drain(&mut page);

    let tree = page.tree();
    let aside = tree.query_selector(parent, &Selector::parse("aside").unwrap()).unwrap();
    assert_eq!(tree.text_content(aside), "Side");
    assert_eq!(tree.get_attribute(aside, "role"), Some("note"));
    assert!(tree.query_selector(parent, &Selector::parse("zone").unwrap()).is_some());
}

// ============================================================================
// RENDER GATE AND CALLBACKS
// ============================================================================

#[test]
fn test_render_gate_through_page() {
    let mut page = page(r#"<my-comp id="parent"><zone name="a">A</zone><gated-comp id="gated"></gated-comp></my-comp>"#);
    let parent = by_id(&page, "parent");
    let gated = by_id(&page, "gated");
    page.attach_component(parent).unwrap();
    page.attach_component_with(gated, None, HostOptions::new().with_render_hook(true), NoHooks)
        .unwrap();
    let slot = page.render_into(gated, r#"<div zone="a"></div>"#).unwrap()[0];

    drain(&mut page);
    assert!(!page.tree().has_child_nodes(slot));
    assert_eq!(page.engine().host(gated).unwrap().deferred_len(), 1);

    assert_eq!(page.notify_rendered(gated), 1);
    assert_eq!(page.tree().text_content(slot), "A");

    // Later renders do not replay anything
    page.begin_render(gated);
    assert_eq!(page.notify_rendered(gated), 0);
}

#[test]
fn test_zones_loaded_listener() {
    let mut page = page(r#"<my-comp id="parent"><zone name="a">A</zone></my-comp>"#);
    let parent = by_id(&page, "parent");
    page.attach_component(parent).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    page.on_zones_loaded(move |tree| log.borrow_mut().push(tree.len()));

    page.insert_zones();
    page.run_until_idle();
    // The only zone went lost, nothing is pending any more
    assert_eq!(seen.borrow().len(), 1);

    drain(&mut page);
    assert_eq!(seen.borrow().len(), 1, "listeners run once");
}

// ============================================================================
// CONFIGURATION AND DIAGNOSTICS
// ============================================================================

#[test]
fn test_config_from_json_drives_page() {
    let config = ZoneConfig::from_json(r#"{ "batch_size": 1, "insertion_interval_ms": 50 }"#).unwrap();
    let mut page = ZonePage::load_html(
        r#"<my-comp id="parent"><zone name="a">A</zone><zone name="b">B</zone><div zone="a"></div><div zone="b"></div></my-comp>"#,
        config,
    )
    .unwrap();
    let parent = by_id(&page, "parent");
    page.attach_component(parent).unwrap();

    drain(&mut page);
    assert_eq!(page.now_ms(), 50);
    assert_eq!(page.stats().batch_passes, 2);
    assert_eq!(page.stats().placements, 2);
}

#[test]
fn test_verbose_report_is_debounced() {
    init_tracing();
    let config = ZoneConfig::default().with_verbose(true);
    let mut page = ZonePage::load_html(r#"<my-comp id="parent"><zone name="lost">L</zone></my-comp>"#, config)
        .unwrap();
    let parent = by_id(&page, "parent");
    page.attach_component(parent).unwrap();

    page.handle_zones();
    page.advance_by(10);
    page.handle_zones();
    page.advance_by(10);
    assert_eq!(page.stats().drain_cycles, 2);

    assert_eq!(page.stats().reports_logged, 0);

    page.run_until_idle();
    // Only the second cycle's report survives the debounce window
    assert_eq!(page.now_ms(), 20 + 500);
    assert_eq!(page.stats().reports_logged, 1);

    // A cycle after the window logs again
    page.handle_zones();
    page.run_until_idle();
    assert_eq!(page.stats().drain_cycles, 3);
    assert_eq!(page.stats().reports_logged, 2);

    let report = page.last_report().unwrap();
    assert_eq!(report.unplaced.len(), 1);
    let json = report.unplaced_json();
    assert_eq!(json[0]["name"], "lost");
    assert_eq!(json[0]["zoneText"], "L");
}
