//! Composition root for one facility-map session.

use efl_shared::models::Facility;
use efl_shared::ratios::{municipality_ratios, RatioTable};

use super::cluster;
use super::config::MapConfig;
use super::lifecycle::{MapContainer, MapLifecycle};
use super::markers::{MarkerClusterManager, MarkerRebuild};
use super::overlay::{BoundaryCollection, ChoroplethOverlay, OverlayVisibility};
use super::widget::SlippyMap;

/// Captured when a boundary fetch starts; checked when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken {
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryOutcome {
    Applied { features: usize },
    /// A newer fetch or a teardown happened first; result dropped.
    Stale,
    Failed(String),
}

#[derive(Debug)]
pub struct VisualizationController {
    config: MapConfig,
    lifecycle: MapLifecycle,
    markers: MarkerClusterManager,
    overlay: ChoroplethOverlay,
    facilities: Vec<Facility>,
    boundaries: Option<BoundaryCollection>,
    ratios: RatioTable,
    generation: u64,
    last_error: Option<String>,
    last_rebuild: Option<MarkerRebuild>,
}

impl VisualizationController {
    pub fn new(config: MapConfig) -> Self {
        let factory = cluster::install();
        let markers = MarkerClusterManager::new(factory, config.fit_padding);
        VisualizationController {
            config,
            lifecycle: MapLifecycle::new(),
            markers,
            overlay: ChoroplethOverlay::new(),
            facilities: Vec::new(),
            boundaries: None,
            ratios: RatioTable::new(),
            generation: 0,
            last_error: None,
            last_rebuild: None,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Create the map if needed. Facilities that arrived before the map
    /// existed are drawn now.
    pub fn mount(&mut self, container: &MapContainer) -> &mut SlippyMap {
        if !self.lifecycle.is_mounted() {
            self.lifecycle.ensure_mounted(container, &self.config);
            if !self.facilities.is_empty() {
                self.refresh();
            }
        }
        self.lifecycle.ensure_mounted(container, &self.config)
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }

    pub fn map(&self) -> Option<&SlippyMap> {
        self.lifecycle.map()
    }

    pub fn map_mut(&mut self) -> Option<&mut SlippyMap> {
        self.lifecycle.map_mut()
    }

    /// New facility set: recompute ratios, rebuild markers, rebuild the
    /// overlay when boundaries are loaded. Visibility is left as is.
    pub fn update_facilities(&mut self, facilities: &[Facility]) {
        self.facilities = facilities.to_vec();
        self.refresh();
    }

    fn refresh(&mut self) {
        self.ratios = municipality_ratios(&self.facilities, self.config.facility_key);
        let Some(map) = self.lifecycle.map_mut() else {
            return;
        };
        let rebuild = self.markers.rebuild(map, &self.facilities);
        if let Some(boundaries) = self.boundaries.as_mut() {
            self.overlay.render(map, boundaries, &self.ratios);
        }
        self.last_rebuild = Some(rebuild);
    }

    pub fn begin_boundary_fetch(&mut self) -> FetchToken {
        self.generation += 1;
        FetchToken {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, token: FetchToken) -> bool {
        token.generation == self.generation
    }

    /// Apply the fetched GeoJSON text. A failure keeps whatever overlay is
    /// already built or attached.
    pub fn apply_boundaries(&mut self, token: FetchToken, result: Result<String, String>) -> BoundaryOutcome {
        if !self.is_current(token) {
            tracing::warn!(
                token = token.generation,
                current = self.generation,
                "discarding stale boundary data"
            );
            return BoundaryOutcome::Stale;
        }
        let parsed = result.and_then(|text| {
            BoundaryCollection::from_geojson_str(&text, &self.config.boundary_name_properties)
        });
        let mut boundaries = match parsed {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "boundary load failed");
                self.last_error = Some(e.clone());
                return BoundaryOutcome::Failed(e);
            }
        };
        self.last_error = None;
        let features = boundaries.len();
        if let Some(map) = self.lifecycle.map_mut() {
            self.overlay.render(map, &mut boundaries, &self.ratios);
        }
        self.boundaries = Some(boundaries);
        tracing::info!(features, "boundaries loaded");
        BoundaryOutcome::Applied { features }
    }

    pub fn show_overlay(&mut self) {
        if let Some(map) = self.lifecycle.map_mut() {
            self.overlay.show(map);
        }
    }

    pub fn hide_overlay(&mut self) {
        if let Some(map) = self.lifecycle.map_mut() {
            self.overlay.remove(map);
        }
    }

    pub fn toggle_overlay(&mut self) {
        match self.overlay.visibility() {
            OverlayVisibility::Hidden => self.show_overlay(),
            OverlayVisibility::Visible => self.hide_overlay(),
        }
    }

    /// End the session: pending fetches go stale and the map is dropped.
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.lifecycle.unmount();
        self.overlay.reset();
        self.boundaries = None;
        self.last_rebuild = None;
    }

    pub fn overlay(&self) -> &ChoroplethOverlay {
        &self.overlay
    }

    pub fn ratios(&self) -> &RatioTable {
        &self.ratios
    }

    pub fn boundaries(&self) -> Option<&BoundaryCollection> {
        self.boundaries.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_rebuild(&self) -> Option<&MarkerRebuild> {
        self.last_rebuild.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::projection::LatLng;
    use crate::map::widget::{MapWidget, Pane};

    const BOUNDARIES: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"name": "TOWN"},
         "geometry": {"type": "Polygon", "coordinates": [[[-54,47],[-53,47],[-53,48],[-54,48],[-54,47]]]}}
    ]}"#;

    fn container() -> MapContainer {
        MapContainer::new("map", 800.0, 600.0)
    }

    fn town(id: i64, french: bool) -> Facility {
        Facility {
            id,
            facility_name: format!("School {id}"),
            municipality_name: Some("TOWN".into()),
            geometry: "POINT (-53.9840877 47.7650123)".into(),
            french_immersion: french,
            ..Default::default()
        }
    }

    fn mounted_with_boundaries() -> VisualizationController {
        let mut c = VisualizationController::new(MapConfig::default());
        c.mount(&container());
        c.update_facilities(&[town(1, true), town(2, false)]);
        let token = c.begin_boundary_fetch();
        let outcome = c.apply_boundaries(token, Ok(BOUNDARIES.to_string()));
        assert_eq!(outcome, BoundaryOutcome::Applied { features: 1 });
        c
    }

    fn layer_counts(c: &VisualizationController) -> (usize, usize) {
        let map = c.map().unwrap();
        (map.layers_in(Pane::Marker).len(), map.layers_in(Pane::Overlay).len())
    }

    #[test]
    fn test_mount_uses_default_view() {
        let mut c = VisualizationController::new(MapConfig::default());
        let map = c.mount(&container());
        assert_eq!(map.view().center, LatLng::new(56.0, -96.0));
        assert_eq!(map.view().zoom, 4);
    }

    #[test]
    fn test_facilities_before_mount_are_drawn_on_mount() {
        let mut c = VisualizationController::new(MapConfig::default());
        c.update_facilities(&[town(1, true)]);
        assert!(c.last_rebuild().is_none());
        c.mount(&container());
        assert_eq!(c.last_rebuild().map(|r| r.markers), Some(1));
        assert_eq!(layer_counts(&c), (1, 0));
    }

    #[test]
    fn test_ratio_joins_onto_boundary() {
        let c = mounted_with_boundaries();
        assert_eq!(c.ratios().get("TOWN"), Some(&0.5));
        let built = c.overlay().built().unwrap();
        assert_eq!(built.features()[0].style.fill_color, "#c2bb5e");
    }

    #[test]
    fn test_hidden_overlay_survives_facility_update() {
        let mut c = mounted_with_boundaries();
        c.show_overlay();
        c.hide_overlay();
        let before = c.overlay().built().cloned();
        c.update_facilities(&[town(1, true), town(2, true)]);
        assert_eq!(c.overlay().visibility(), OverlayVisibility::Hidden);
        assert_eq!(layer_counts(&c), (1, 0));
        let after = c.overlay().built().cloned().unwrap();
        assert!(!std::rc::Rc::ptr_eq(&before.unwrap(), &after));
        assert_eq!(after.features()[0].style.fill_color, "#0c5603");
    }

    #[test]
    fn test_visible_overlay_rebuilt_and_reattached_on_update() {
        let mut c = mounted_with_boundaries();
        c.show_overlay();
        let first = c.overlay().attached();
        c.update_facilities(&[town(1, false)]);
        assert_eq!(c.overlay().visibility(), OverlayVisibility::Visible);
        assert_ne!(c.overlay().attached(), first);
        assert_eq!(layer_counts(&c), (1, 1));
    }

    #[test]
    fn test_layer_counts_stay_bounded() {
        let mut c = mounted_with_boundaries();
        for i in 0..5 {
            if i % 2 == 0 {
                c.toggle_overlay();
            }
            c.update_facilities(&[town(i, i % 3 == 0)]);
            let (markers, overlays) = layer_counts(&c);
            assert_eq!(markers, 1);
            assert!(overlays <= 1);
        }
    }

    #[test]
    fn test_empty_update_keeps_viewport() {
        let mut c = VisualizationController::new(MapConfig::default());
        c.mount(&container());
        let before = c.map().unwrap().view();
        c.update_facilities(&[]);
        assert_eq!(c.map().unwrap().view(), before);
        assert_eq!(layer_counts(&c), (1, 0));
    }

    #[test]
    fn test_newer_fetch_makes_older_stale() {
        let mut c = VisualizationController::new(MapConfig::default());
        c.mount(&container());
        let old = c.begin_boundary_fetch();
        let new = c.begin_boundary_fetch();
        assert_eq!(c.apply_boundaries(old, Ok(BOUNDARIES.into())), BoundaryOutcome::Stale);
        assert!(c.boundaries().is_none());
        assert_eq!(
            c.apply_boundaries(new, Ok(BOUNDARIES.into())),
            BoundaryOutcome::Applied { features: 1 }
        );
    }

    #[test]
    fn test_fetch_after_teardown_is_discarded() {
        let mut c = VisualizationController::new(MapConfig::default());
        c.mount(&container());
        let token = c.begin_boundary_fetch();
        c.teardown();
        assert!(!c.is_mounted());
        assert_eq!(c.apply_boundaries(token, Ok(BOUNDARIES.into())), BoundaryOutcome::Stale);
        assert!(c.overlay().built().is_none());
    }

    #[test]
    fn test_failed_fetch_keeps_visible_overlay() {
        let mut c = mounted_with_boundaries();
        c.show_overlay();
        let attached = c.overlay().attached();
        let token = c.begin_boundary_fetch();
        let outcome = c.apply_boundaries(token, Err("HTTP 503".into()));
        assert_eq!(outcome, BoundaryOutcome::Failed("HTTP 503".into()));
        assert_eq!(c.last_error(), Some("HTTP 503"));
        assert_eq!(c.overlay().attached(), attached);
        assert_eq!(layer_counts(&c), (1, 1));
    }

    #[test]
    fn test_invalid_geojson_reported_as_failure() {
        let mut c = VisualizationController::new(MapConfig::default());
        c.mount(&container());
        let token = c.begin_boundary_fetch();
        assert!(matches!(
            c.apply_boundaries(token, Ok("{".into())),
            BoundaryOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_remount_after_teardown_is_fresh() {
        let mut c = mounted_with_boundaries();
        c.show_overlay();
        c.teardown();
        c.mount(&container());
        assert_eq!(c.overlay().visibility(), OverlayVisibility::Hidden);
        // Facilities are kept and redrawn on the new map.
        assert_eq!(layer_counts(&c), (1, 0));
    }
}
