use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;
use efl_shared::models::Facility;
use geo::{coord, Intersects, LineString, Rect};

use crate::api;
use crate::components::legend::Legend;
use crate::map::cluster::ClusterGroup;
use crate::map::config::MapConfig;
use crate::map::controller::{BoundaryOutcome, VisualizationController};
use crate::map::lifecycle::MapContainer;
use crate::map::overlay::{ChoroplethLayer, OverlayVisibility};
use crate::map::projection::{LatLng, LatLngBounds, PixelPoint, TILE_SIZE};
use crate::map::widget::{Layer, MapWidget, ScreenSize, SlippyMap, TileRef};

const MAP_CONTAINER_ID: &str = "facility-map-container";

/// Drag threshold in pixels; movement below this is a click.
const DRAG_THRESHOLD: f64 = 3.0;

/// Touch is less precise than a mouse.
const TOUCH_DRAG_THRESHOLD: f64 = 8.0;

/// Used until the container has been measured.
const FALLBACK_SIZE: ScreenSize = ScreenSize {
    width: 960.0,
    height: 640.0,
};

/// Extra room around the container before a marker is culled.
const CULL_MARGIN: f64 = 40.0;

const MARKER_COLOR: &str = "#3388ff";

/// Click distance (container pixels) that still hits a cluster bubble.
const CLUSTER_HIT_RADIUS: f64 = 22.0;

/// Open marker popup, anchored to its facility position.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupState {
    pub at: LatLng,
    pub title: String,
    pub subtitle: String,
}

/// What a click on the map landed on, topmost layer first.
#[derive(Debug, Clone, PartialEq)]
enum ClickTarget {
    Cluster(LatLngBounds),
    Marker(PopupState),
    Area { at: PixelPoint, tooltip: String },
    Nothing,
}

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

fn container_rect() -> Option<web_sys::DomRect> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(MAP_CONTAINER_ID)?;
    Some(element.get_bounding_client_rect())
}

/// Client coordinates to container pixels, resizing the map to the live
/// container on the way.
fn to_container_point(map: &mut SlippyMap, client_x: f64, client_y: f64) -> Option<PixelPoint> {
    let rect = container_rect()?;
    let size = ScreenSize {
        width: rect.width(),
        height: rect.height(),
    };
    if size != map.size() && size.width > 0.0 && size.height > 0.0 {
        map.resize(size);
    }
    Some(PixelPoint::new(client_x - rect.left(), client_y - rect.top()))
}

fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

fn point_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Index of the nearest position within `threshold`.
fn find_nearest(positions: &[(f64, f64)], click: (f64, f64), threshold: f64) -> Option<usize> {
    let mut best_idx = None;
    let mut best_dist = threshold;
    for (i, pos) in positions.iter().enumerate() {
        let dist = point_distance(*pos, click);
        if dist < best_dist {
            best_dist = dist;
            best_idx = Some(i);
        }
    }
    best_idx
}

// ---------------------------------------------------------------------------
// Hit testing
// ---------------------------------------------------------------------------

fn click_target(map: &SlippyMap, point: PixelPoint) -> ClickTarget {
    let mut layers = map.layers_by_pane();
    layers.reverse();
    for (_, layer) in layers {
        match layer {
            Layer::Markers(group) => {
                let clusters = group.clusters_at(map.view().zoom);
                let positions: Vec<(f64, f64)> = clusters
                    .iter()
                    .map(|c| {
                        let p = map.to_container(c.center);
                        (p.x, p.y)
                    })
                    .collect();
                let Some(i) = find_nearest(&positions, (point.x, point.y), CLUSTER_HIT_RADIUS) else {
                    continue;
                };
                let cluster = &clusters[i];
                if !cluster.is_single() {
                    return ClickTarget::Cluster(cluster.bounds);
                }
                let marker = &group.markers()[cluster.members[0]];
                return ClickTarget::Marker(PopupState {
                    at: marker.lat_lng(),
                    title: marker.label.title.clone(),
                    subtitle: marker.label.subtitle.clone(),
                });
            }
            Layer::Choropleth(overlay) => {
                if let Some(feature) = overlay.feature_at(map.to_lat_lng(point)) {
                    return ClickTarget::Area {
                        at: point,
                        tooltip: feature.tooltip.clone(),
                    };
                }
            }
            Layer::Tiles(_) => {}
        }
    }
    ClickTarget::Nothing
}

// ---------------------------------------------------------------------------
// SVG builder
// ---------------------------------------------------------------------------

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Full SVG document for the map, layers painted in pane order.
fn build_map_svg(map: &SlippyMap) -> String {
    let size = map.size();
    let mut svg = String::with_capacity(16384);
    for (_, layer) in map.layers_by_pane() {
        match layer {
            Layer::Tiles(tiles) => build_tiles(&mut svg, &map.visible_tiles(tiles)),
            Layer::Choropleth(overlay) => build_choropleth(&mut svg, map, overlay),
            Layer::Markers(group) => build_clusters(&mut svg, map, group),
        }
    }
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" style="position:absolute;top:0;left:0;pointer-events:none;">{svg}</svg>"#,
        w = size.width,
        h = size.height,
    )
}

fn build_tiles(svg: &mut String, tiles: &[TileRef]) {
    for tile in tiles {
        let href = escape_xml(&tile.url);
        svg.push_str(&format!(
            r#"<image href="{href}" x="{}" y="{}" width="{TILE_SIZE}" height="{TILE_SIZE}"/>"#,
            tile.left, tile.top
        ));
    }
}

/// Viewport as a lng/lat rectangle for culling.
fn view_rect(map: &SlippyMap) -> Rect<f64> {
    let size = map.size();
    let nw = map.to_lat_lng(PixelPoint::new(0.0, 0.0));
    let se = map.to_lat_lng(PixelPoint::new(size.width, size.height));
    Rect::new(coord! { x: nw.lng, y: se.lat }, coord! { x: se.lng, y: nw.lat })
}

fn push_ring(d: &mut String, map: &SlippyMap, ring: &LineString<f64>) {
    for (i, c) in ring.coords().enumerate() {
        let p = map.to_container(LatLng::new(c.y, c.x));
        let cmd = if i == 0 { 'M' } else { 'L' };
        d.push_str(&format!("{cmd}{:.1} {:.1}", p.x, p.y));
    }
    d.push('Z');
}

fn build_choropleth(svg: &mut String, map: &SlippyMap, overlay: &ChoroplethLayer) {
    let view = view_rect(map);
    for feature in overlay.features() {
        if !feature.bbox.is_some_and(|b| b.intersects(&view)) {
            continue;
        }
        let mut d = String::new();
        for polygon in feature.geometry.0.iter() {
            push_ring(&mut d, map, polygon.exterior());
            for hole in polygon.interiors() {
                push_ring(&mut d, map, hole);
            }
        }
        let s = &feature.style;
        let tooltip = escape_xml(&feature.tooltip);
        svg.push_str(&format!(
            r#"<path d="{d}" fill="{}" fill-opacity="{}" fill-rule="evenodd" stroke="{}" stroke-width="{}" stroke-opacity="{}" stroke-dasharray="{}"><title>{tooltip}</title></path>"#,
            s.fill_color, s.fill_opacity, s.color, s.weight, s.opacity, s.dash_array
        ));
    }
}

/// Bubble fill and radius by member count, small/medium/large.
fn cluster_style(count: usize) -> (&'static str, f64) {
    if count < 10 {
        ("rgba(110,204,57,0.85)", 15.0)
    } else if count < 100 {
        ("rgba(240,194,12,0.85)", 18.0)
    } else {
        ("rgba(241,128,23,0.85)", 21.0)
    }
}

fn build_clusters(svg: &mut String, map: &SlippyMap, group: &ClusterGroup) {
    let size = map.size();
    let on_screen = |p: PixelPoint| {
        p.x >= -CULL_MARGIN
            && p.y >= -CULL_MARGIN
            && p.x <= size.width + CULL_MARGIN
            && p.y <= size.height + CULL_MARGIN
    };
    for cluster in group.clusters_at(map.view().zoom).iter() {
        let p = map.to_container(cluster.center);
        if !on_screen(p) {
            continue;
        }
        let (x, y) = (p.x, p.y);
        if cluster.is_single() {
            let marker = &group.markers()[cluster.members[0]];
            let st = marker.style;
            let label = escape_xml(&format!("{}, {}", marker.label.title, marker.label.subtitle));
            svg.push_str(&format!(
                r#"<circle cx="{x}" cy="{y}" r="{}" fill="{MARKER_COLOR}" fill-opacity="{}" stroke="{MARKER_COLOR}" stroke-width="{}"><title>{label}</title></circle>"#,
                st.radius, st.fill_opacity, st.weight
            ));
        } else {
            let n = cluster.len();
            let (fill, r) = cluster_style(n);
            let inner = r - 4.0;
            svg.push_str(&format!(
                r#"<g role="img"><title>{n} facilities</title><circle cx="{x}" cy="{y}" r="{r}" fill="{fill}" fill-opacity="0.5"/><circle cx="{x}" cy="{y}" r="{inner}" fill="{fill}"/><text x="{x}" y="{y}" font-size="12" font-family="sans-serif" font-weight="700" text-anchor="middle" dominant-baseline="central">{n}</text></g>"#
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Boundary loading
// ---------------------------------------------------------------------------

async fn load_boundaries(mut controller: Signal<VisualizationController>, mut loading: Signal<bool>) {
    let token = controller.write().begin_boundary_fetch();
    loading.set(true);
    let result = api::fetch_municipalities().await;
    // The component may be gone by now.
    let Ok(mut ctl) = controller.try_write() else {
        return;
    };
    match ctl.apply_boundaries(token, result) {
        BoundaryOutcome::Applied { .. } | BoundaryOutcome::Failed(_) => loading.set(false),
        BoundaryOutcome::Stale => {}
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[component]
pub fn FacilityMap(facilities: ReadSignal<Vec<Facility>>, config: MapConfig) -> Element {
    let mut controller = use_signal(move || VisualizationController::new(config));
    let mut popup = use_signal(|| None::<PopupState>);
    let mut area_tip = use_signal(|| None::<(PixelPoint, String)>);
    let boundaries_loading = use_signal(|| false);

    // Drag state (mouse)
    let mut is_dragging = use_signal(|| false);
    let mut did_drag = use_signal(|| false);
    let mut drag_start = use_signal(|| (0.0_f64, 0.0_f64));
    let mut drag_last = use_signal(|| (0.0_f64, 0.0_f64));

    // Touch state
    let mut touch_start = use_signal(|| None::<(f64, f64)>);
    let mut touch_last = use_signal(|| (0.0_f64, 0.0_f64));
    let mut touch_did_pan = use_signal(|| false);

    use_effect(move || {
        let list = facilities.read();
        controller.write().update_facilities(&list);
        popup.set(None);
    });

    use_future(move || load_boundaries(controller, boundaries_loading));

    use_drop(move || {
        if let Ok(mut ctl) = controller.try_write() {
            ctl.teardown();
        }
    });

    let mut handle_click = move |client_x: f64, client_y: f64| {
        let mut ctl = controller.write();
        let padding = ctl.config().fit_padding;
        let Some(map) = ctl.map_mut() else { return };
        let Some(point) = to_container_point(map, client_x, client_y) else {
            return;
        };
        area_tip.set(None);
        match click_target(map, point) {
            ClickTarget::Cluster(bounds) => {
                map.fit_bounds(&bounds, padding);
                popup.set(None);
            }
            ClickTarget::Marker(state) => popup.set(Some(state)),
            ClickTarget::Area { at, tooltip } => {
                popup.set(None);
                area_tip.set(Some((at, tooltip)));
            }
            ClickTarget::Nothing => popup.set(None),
        }
    };

    let ctl = controller.read();
    let svg_html = (*ctl).map().map(build_map_svg).unwrap_or_default();
    let popup_view = popup.read().clone().and_then(|p| {
        let at = (*ctl).map()?.to_container(p.at);
        Some((at, p))
    });
    let zoom = (*ctl).map().map(|m| m.view().zoom);
    let shown = ctl.last_rebuild().map(|r| r.markers).unwrap_or(0);
    let skipped = ctl.last_rebuild().map(|r| r.skipped).unwrap_or(0);
    let overlay_visible = ctl.overlay().visibility() == OverlayVisibility::Visible;
    let legend_visible = ctl.overlay().legend_visible();
    let boundary_error = ctl.last_error().map(str::to_string);
    let attribution = ctl.config().tile_attribution.clone();
    drop(ctl);

    let container_class = if *is_dragging.read() && *did_drag.read() {
        "map-container dragging"
    } else {
        "map-container"
    };

    rsx! {
        div { class: "map-wrapper",
            div {
                id: MAP_CONTAINER_ID,
                class: "{container_class}",

                onmounted: move |_| {
                    let size = container_rect()
                        .map(|r| ScreenSize { width: r.width(), height: r.height() })
                        .filter(|s| s.width > 0.0 && s.height > 0.0)
                        .unwrap_or(FALLBACK_SIZE);
                    controller
                        .write()
                        .mount(&MapContainer::new(MAP_CONTAINER_ID, size.width, size.height));
                },

                onwheel: move |evt: Event<WheelData>| {
                    evt.prevent_default();
                    let delta_y = wheel_delta_y(evt.data().delta());
                    if delta_y.abs() < 1e-9 {
                        return;
                    }
                    let client = evt.data().client_coordinates();
                    let mut ctl = controller.write();
                    let Some(map) = ctl.map_mut() else { return };
                    let Some(anchor) = to_container_point(map, client.x, client.y) else {
                        return;
                    };
                    map.zoom_at(anchor, if delta_y < 0.0 { 1 } else { -1 });
                    area_tip.set(None);
                },

                onmousedown: move |evt: Event<MouseData>| {
                    if evt.trigger_button() != Some(MouseButton::Primary) {
                        return;
                    }
                    let client = evt.client_coordinates();
                    is_dragging.set(true);
                    did_drag.set(false);
                    drag_start.set((client.x, client.y));
                    drag_last.set((client.x, client.y));
                },

                onmousemove: move |evt: Event<MouseData>| {
                    if !*is_dragging.read() {
                        return;
                    }
                    let client = evt.client_coordinates();
                    let start = *drag_start.read();
                    if !*did_drag.read()
                        && ((client.x - start.0).abs() > DRAG_THRESHOLD
                            || (client.y - start.1).abs() > DRAG_THRESHOLD)
                    {
                        did_drag.set(true);
                    }
                    if *did_drag.read() {
                        let last = *drag_last.read();
                        if let Some(map) = controller.write().map_mut() {
                            map.pan_by(client.x - last.0, client.y - last.1);
                        }
                        drag_last.set((client.x, client.y));
                    }
                },

                onmouseup: move |evt: Event<MouseData>| {
                    let was_dragging = *is_dragging.read();
                    let was_drag = *did_drag.read();
                    is_dragging.set(false);
                    if was_dragging && !was_drag {
                        let client = evt.client_coordinates();
                        handle_click(client.x, client.y);
                    }
                },

                onmouseleave: move |_| {
                    is_dragging.set(false);
                },

                ondoubleclick: move |evt: Event<MouseData>| {
                    evt.prevent_default();
                    let client = evt.client_coordinates();
                    let mut ctl = controller.write();
                    let Some(map) = ctl.map_mut() else { return };
                    if let Some(anchor) = to_container_point(map, client.x, client.y) {
                        map.zoom_at(anchor, 1);
                    }
                },

                ontouchstart: move |evt: Event<TouchData>| {
                    evt.prevent_default();
                    let touches = evt.data().touches();
                    if let Some(t) = touches.first() {
                        let p = (t.client_coordinates().x, t.client_coordinates().y);
                        touch_start.set(Some(p));
                        touch_last.set(p);
                        touch_did_pan.set(false);
                    }
                },

                ontouchmove: move |evt: Event<TouchData>| {
                    evt.prevent_default();
                    let touches = evt.data().touches();
                    let (Some(t), Some(start)) = (touches.first(), *touch_start.read()) else {
                        return;
                    };
                    let cur = (t.client_coordinates().x, t.client_coordinates().y);
                    if !*touch_did_pan.read() && point_distance(start, cur) > TOUCH_DRAG_THRESHOLD {
                        touch_did_pan.set(true);
                    }
                    if *touch_did_pan.read() {
                        let last = *touch_last.read();
                        if let Some(map) = controller.write().map_mut() {
                            map.pan_by(cur.0 - last.0, cur.1 - last.1);
                        }
                        touch_last.set(cur);
                    }
                },

                ontouchend: move |evt: Event<TouchData>| {
                    evt.prevent_default();
                    if !evt.data().touches().is_empty() {
                        return;
                    }
                    if !*touch_did_pan.read() {
                        if let Some(start) = *touch_start.read() {
                            handle_click(start.0, start.1);
                        }
                    }
                    touch_start.set(None);
                },

                ontouchcancel: move |_evt: Event<TouchData>| {
                    touch_start.set(None);
                    touch_did_pan.set(false);
                },

                div {
                    class: "map-layers",
                    dangerous_inner_html: "{svg_html}",
                }

                if let Some((at, p)) = popup_view {
                    div {
                        class: "map-popup",
                        style: "left: {at.x}px; top: {at.y}px;",
                        onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                        onmouseup: move |evt: Event<MouseData>| evt.stop_propagation(),
                        button {
                            class: "map-popup-close",
                            onclick: move |_| popup.set(None),
                            "×"
                        }
                        b { "{p.title}" }
                        br {}
                        "{p.subtitle}"
                    }
                }

                if let Some((at, text)) = area_tip.read().clone() {
                    div {
                        class: "map-tooltip",
                        style: "left: {at.x}px; top: {at.y}px;",
                        "{text}"
                    }
                }

                div { class: "map-attribution", "{attribution}" }
            }

            div { class: "map-controls",
                button {
                    title: "Zoom in",
                    onclick: move |_| {
                        if let Some(map) = controller.write().map_mut() {
                            let s = map.size();
                            map.zoom_at(PixelPoint::new(s.width / 2.0, s.height / 2.0), 1);
                        }
                    },
                    "+"
                }
                button {
                    title: "Zoom out",
                    onclick: move |_| {
                        if let Some(map) = controller.write().map_mut() {
                            let s = map.size();
                            map.zoom_at(PixelPoint::new(s.width / 2.0, s.height / 2.0), -1);
                        }
                    },
                    "−"
                }
                button {
                    class: if overlay_visible { "active" } else { "" },
                    onclick: move |_| {
                        controller.write().toggle_overlay();
                        area_tip.set(None);
                    },
                    if overlay_visible { "Hide French ratio" } else { "Show French ratio" }
                }
                if *boundaries_loading.read() {
                    span { class: "map-status", "Loading boundaries…" }
                }
                if let Some(err) = boundary_error {
                    span { class: "map-status error", "Boundaries unavailable: {err}" }
                    button {
                        class: "secondary",
                        onclick: move |_| {
                            spawn(load_boundaries(controller, boundaries_loading));
                        },
                        "Retry"
                    }
                }
            }

            if legend_visible {
                Legend {}
            }

            div { class: "coord-readout",
                if let Some(z) = zoom {
                    span { class: "coord-tag", "Zoom {z}" }
                }
                span { class: "coord-tag", "{shown} facilities mapped" }
                if skipped > 0 {
                    span { class: "coord-tag muted", "{skipped} without location" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use efl_shared::ratios::RatioTable;
    use efl_shared::wkt::parse_point;

    use crate::map::cluster::{self, CircleStyle, Marker, MarkerLabel};
    use crate::map::overlay::{BoundaryCollection, ChoroplethOverlay};
    use crate::map::widget::TileLayer;

    const SQUARE: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"name": "A & B"},
         "geometry": {"type": "Polygon", "coordinates": [[[-100,50],[-90,50],[-90,55],[-100,55],[-100,50]]]}}
    ]}"#;

    fn marker(id: i64, wkt: &str, title: &str) -> Marker {
        Marker {
            facility_id: id,
            position: parse_point(wkt).unwrap(),
            label: MarkerLabel {
                title: title.into(),
                subtitle: "TOWN".into(),
            },
            style: CircleStyle::default(),
        }
    }

    fn map() -> SlippyMap {
        let mut m = SlippyMap::new(
            "map",
            ScreenSize {
                width: 800.0,
                height: 600.0,
            },
            1,
            18,
        );
        m.set_view(LatLng::new(52.0, -95.0), 4);
        m
    }

    fn square_overlay(m: &mut SlippyMap) {
        let names = vec!["name".to_string()];
        let mut b = BoundaryCollection::from_geojson_str(SQUARE, &names).unwrap();
        let mut overlay = ChoroplethOverlay::new();
        overlay.show(m);
        overlay.render(m, &mut b, &RatioTable::from([("A & B".to_string(), 0.8)]));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<b>"A" & 'B'</b>"#), "&lt;b&gt;&quot;A&quot; &amp; &apos;B&apos;&lt;/b&gt;");
        assert_eq!(escape_xml("plain"), "plain");
    }

    #[test]
    fn test_build_tiles_positions_images() {
        let mut svg = String::new();
        build_tiles(
            &mut svg,
            &[TileRef {
                url: "https://tile.openstreetmap.org/4/3/5.png".into(),
                left: -12.5,
                top: 40.0,
            }],
        );
        assert!(svg.contains(r#"href="https://tile.openstreetmap.org/4/3/5.png""#));
        assert!(svg.contains(r#"x="-12.5""#));
        assert!(svg.contains(r#"width="256""#));
    }

    #[test]
    fn test_single_marker_uses_circle_style() {
        let m = map();
        let group = cluster::install().group(vec![marker(1, "POINT (-95 52)", "École <Nord>")]);
        let mut svg = String::new();
        build_clusters(&mut svg, &m, &group);
        assert!(svg.contains(r#"r="6""#));
        assert!(svg.contains(r#"fill-opacity="0.9""#));
        assert!(svg.contains(r#"stroke-width="1""#));
        assert!(svg.contains("<title>École &lt;Nord&gt;, TOWN</title>"));
    }

    #[test]
    fn test_nearby_markers_draw_one_bubble() {
        let m = map();
        let group = cluster::install().group(vec![
            marker(1, "POINT (-95 52)", "A"),
            marker(2, "POINT (-95.1 52.05)", "B"),
        ]);
        let mut svg = String::new();
        build_clusters(&mut svg, &m, &group);
        assert!(svg.contains("<title>2 facilities</title>"));
        assert_eq!(svg.matches("<g ").count(), 1);
    }

    #[test]
    fn test_offscreen_markers_are_culled() {
        let m = map();
        let group = cluster::install().group(vec![marker(1, "POINT (150 -30)", "Far")]);
        let mut svg = String::new();
        build_clusters(&mut svg, &m, &group);
        assert!(svg.is_empty());
    }

    #[test]
    fn test_cluster_style_by_size() {
        assert_eq!(cluster_style(2).1, 15.0);
        assert_eq!(cluster_style(10).1, 18.0);
        assert_eq!(cluster_style(100).1, 21.0);
    }

    #[test]
    fn test_build_choropleth_styles_path() {
        let mut m = map();
        square_overlay(&mut m);
        let svg = build_map_svg(&m);
        assert!(svg.contains(r##"fill="#0c5603""##));
        assert!(svg.contains(r#"fill-opacity="0.7""#));
        assert!(svg.contains(r#"stroke="white""#));
        assert!(svg.contains(r#"stroke-width="2""#));
        assert!(svg.contains(r#"stroke-dasharray="3""#));
        assert!(svg.contains("<title>A &amp; B: 80% French programs</title>"));
    }

    #[test]
    fn test_layers_painted_in_pane_order() {
        let mut m = map();
        m.add_layer(Layer::Markers(Rc::new(
            cluster::install().group(vec![marker(1, "POINT (-95 52)", "A")]),
        )));
        square_overlay(&mut m);
        m.add_layer(Layer::Tiles(TileLayer::new("https://t/{z}/{x}/{y}.png", "")));
        let svg = build_map_svg(&m);
        let tile = svg.find("<image").unwrap();
        let path = svg.find("<path").unwrap();
        let circle = svg.find("<circle").unwrap();
        assert!(tile < path && path < circle);
    }

    #[test]
    fn test_click_on_marker_opens_popup() {
        let mut m = map();
        m.add_layer(Layer::Markers(Rc::new(
            cluster::install().group(vec![marker(1, "POINT (-95 52)", "École")]),
        )));
        square_overlay(&mut m);
        let p = m.to_container(LatLng::new(52.0, -95.0));
        let ClickTarget::Marker(popup) = click_target(&m, PixelPoint::new(p.x + 2.0, p.y)) else {
            panic!("expected a marker hit");
        };
        assert_eq!(popup.title, "École");
        assert_eq!(popup.subtitle, "TOWN");
    }

    #[test]
    fn test_click_on_cluster_returns_bounds() {
        let mut m = map();
        m.add_layer(Layer::Markers(Rc::new(cluster::install().group(vec![
            marker(1, "POINT (-95 52)", "A"),
            marker(2, "POINT (-95.1 52.05)", "B"),
        ]))));
        let p = m.to_container(LatLng::new(52.0, -95.0));
        let ClickTarget::Cluster(bounds) = click_target(&m, p) else {
            panic!("expected a cluster hit");
        };
        assert!(bounds.contains(LatLng::new(52.05, -95.1)));
    }

    #[test]
    fn test_click_inside_area_shows_tooltip() {
        let mut m = map();
        square_overlay(&mut m);
        let p = m.to_container(LatLng::new(53.0, -97.0));
        match click_target(&m, p) {
            ClickTarget::Area { tooltip, .. } => assert_eq!(tooltip, "A & B: 80% French programs"),
            other => panic!("unexpected {other:?}"),
        }
        let outside = m.to_container(LatLng::new(45.0, -75.0));
        assert_eq!(click_target(&m, outside), ClickTarget::Nothing);
    }

    #[test]
    fn test_find_nearest_picks_closest() {
        let positions = vec![(100.0, 100.0), (110.0, 110.0)];
        assert_eq!(find_nearest(&positions, (108.0, 108.0), 30.0), Some(1));
        assert_eq!(find_nearest(&positions, (102.0, 102.0), 30.0), Some(0));
        assert_eq!(find_nearest(&positions, (300.0, 300.0), 30.0), None);
    }
}
