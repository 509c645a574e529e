//! Choropleth overlay of municipality boundaries coloured by French ratio.

use std::rc::Rc;

use efl_shared::colors::ColorBand;
use efl_shared::ratios::{normalize_key, RatioTable};
use geo::{BoundingRect, Contains, MultiPolygon, Point, Rect};
use geojson::GeoJson;

use super::projection::LatLng;
use super::widget::{Layer, LayerId, MapWidget, Pane};

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub name: Option<String>,
    /// Exterior and hole rings in (lng, lat).
    pub geometry: Rc<MultiPolygon<f64>>,
    /// Set by [`ChoroplethOverlay::render`]; `None` means no data.
    pub ratio: Option<f64>,
}

impl BoundaryFeature {
    /// Join key on the boundary side. Nameless features never join.
    pub fn key(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| normalize_key(Some(n)))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryCollection {
    features: Vec<BoundaryFeature>,
}

impl BoundaryCollection {
    pub fn new(features: Vec<BoundaryFeature>) -> Self {
        BoundaryCollection { features }
    }

    /// Parse a GeoJSON FeatureCollection, keeping polygonal features. The
    /// name comes from the first of `name_properties` holding a string.
    pub fn from_geojson_str(text: &str, name_properties: &[String]) -> Result<Self, String> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e| format!("Failed to parse boundary GeoJSON: {e}"))?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err("Boundary GeoJSON must be a FeatureCollection".to_string());
        };

        let mut features = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.into_iter().enumerate() {
            let name = feature.properties.as_ref().and_then(|props| {
                name_properties
                    .iter()
                    .find_map(|key| props.get(key).and_then(|v| v.as_str()))
                    .map(str::to_string)
            });
            let Some(geometry) = feature.geometry else {
                tracing::debug!(index, "boundary feature without geometry skipped");
                continue;
            };
            let geometry: geo::Geometry<f64> = match geometry.value.try_into() {
                Ok(g) => g,
                Err(e) => {
                    tracing::debug!(index, error = %e, "boundary geometry not convertible");
                    continue;
                }
            };
            let geometry = match geometry {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                _ => {
                    tracing::debug!(index, "non-polygon boundary feature skipped");
                    continue;
                }
            };
            features.push(BoundaryFeature {
                name,
                geometry: Rc::new(geometry),
                ratio: None,
            });
        }
        Ok(BoundaryCollection { features })
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Attach the ratio for each feature's key.
    pub fn annotate(&mut self, ratios: &RatioTable) {
        for feature in &mut self.features {
            feature.ratio = feature.key().and_then(|k| ratios.get(&k).copied());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStyle {
    pub fill_color: &'static str,
    pub weight: f64,
    pub opacity: f64,
    pub color: &'static str,
    pub dash_array: &'static str,
    pub fill_opacity: f64,
}

impl FeatureStyle {
    pub fn for_ratio(ratio: Option<f64>) -> Self {
        FeatureStyle {
            fill_color: ColorBand::for_ratio(ratio).color(),
            weight: 2.0,
            opacity: 1.0,
            color: "white",
            dash_array: "3",
            fill_opacity: 0.7,
        }
    }
}

pub fn tooltip_text(name: &str, ratio: Option<f64>) -> String {
    match ratio.filter(|r| !r.is_nan()) {
        Some(r) => format!("{name}: {:.0}% French programs", r * 100.0),
        None => format!("{name}: no data"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledFeature {
    pub name: Option<String>,
    pub geometry: Rc<MultiPolygon<f64>>,
    pub bbox: Option<Rect<f64>>,
    pub ratio: Option<f64>,
    pub style: FeatureStyle,
    pub tooltip: String,
}

/// A built overlay: one styled polygon per boundary feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoroplethLayer {
    features: Vec<StyledFeature>,
}

impl ChoroplethLayer {
    pub fn build(boundaries: &BoundaryCollection) -> Self {
        let features = boundaries
            .features()
            .iter()
            .map(|f| StyledFeature {
                name: f.name.clone(),
                bbox: f.geometry.bounding_rect(),
                geometry: Rc::clone(&f.geometry),
                ratio: f.ratio,
                style: FeatureStyle::for_ratio(f.ratio),
                tooltip: tooltip_text(f.name.as_deref().unwrap_or("Unnamed area"), f.ratio),
            })
            .collect();
        ChoroplethLayer { features }
    }

    pub fn features(&self) -> &[StyledFeature] {
        &self.features
    }

    /// Topmost feature containing `ll`.
    pub fn feature_at(&self, ll: LatLng) -> Option<&StyledFeature> {
        let point = Point::new(ll.lng, ll.lat);
        self.features.iter().rev().find(|f| {
            f.bbox.is_some_and(|b| b.contains(&point)) && f.geometry.contains(&point)
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlayVisibility {
    #[default]
    Hidden,
    Visible,
}

/// Holds the most recently built overlay and whether it is on the map.
#[derive(Debug, Default)]
pub struct ChoroplethOverlay {
    visibility: OverlayVisibility,
    built: Option<Rc<ChoroplethLayer>>,
    attached: Option<LayerId>,
}

impl ChoroplethOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visibility(&self) -> OverlayVisibility {
        self.visibility
    }

    pub fn legend_visible(&self) -> bool {
        self.visibility == OverlayVisibility::Visible
    }

    pub fn built(&self) -> Option<&Rc<ChoroplethLayer>> {
        self.built.as_ref()
    }

    pub fn attached(&self) -> Option<LayerId> {
        self.attached
    }

    /// Rebuild from `boundaries` and `ratios`, replacing any overlay on the
    /// map. The new layer is attached only while visible.
    pub fn render<M: MapWidget + ?Sized>(
        &mut self,
        map: &mut M,
        boundaries: &mut BoundaryCollection,
        ratios: &RatioTable,
    ) -> Rc<ChoroplethLayer> {
        boundaries.annotate(ratios);
        let layer = Rc::new(ChoroplethLayer::build(boundaries));
        self.detach_all(map);
        self.built = Some(Rc::clone(&layer));
        if self.visibility == OverlayVisibility::Visible {
            self.attached = Some(map.add_layer(Layer::Choropleth(Rc::clone(&layer))));
        }
        let matched = layer.features().iter().filter(|f| f.ratio.is_some()).count();
        tracing::debug!(
            features = layer.features().len(),
            matched,
            attached = self.attached.is_some(),
            "choropleth rebuilt"
        );
        layer
    }

    /// Attach the last built overlay. Without one, only the state changes and
    /// the next render attaches.
    pub fn show<M: MapWidget + ?Sized>(&mut self, map: &mut M) {
        self.visibility = OverlayVisibility::Visible;
        if self.attached.is_some_and(|id| map.has_layer(id)) {
            return;
        }
        self.detach_all(map);
        if let Some(layer) = &self.built {
            self.attached = Some(map.add_layer(Layer::Choropleth(Rc::clone(layer))));
        }
    }

    pub fn remove<M: MapWidget + ?Sized>(&mut self, map: &mut M) {
        self.visibility = OverlayVisibility::Hidden;
        self.detach_all(map);
    }

    /// Forget everything, for a new session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn detach_all<M: MapWidget + ?Sized>(&mut self, map: &mut M) {
        for id in map.layers_in(Pane::Overlay) {
            map.remove_layer(id);
        }
        self.attached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::widget::{ScreenSize, SlippyMap};

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "Town"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
            {"type": "Feature", "properties": {"CSDNAME": "Elsewhere"},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[20,20],[30,20],[30,30],[20,30],[20,20]]]]}},
            {"type": "Feature", "properties": {"name": "Point"},
             "geometry": {"type": "Point", "coordinates": [1, 1]}},
            {"type": "Feature", "properties": {}, "geometry": null},
            {"type": "Feature", "properties": {"other": 1},
             "geometry": {"type": "Polygon", "coordinates": [[[40,40],[50,40],[50,50],[40,40]]]}}
        ]
    }"#;

    fn names() -> Vec<String> {
        ["name", "NAME", "CSDNAME", "CDNAME"].into_iter().map(String::from).collect()
    }

    fn map() -> SlippyMap {
        SlippyMap::new("map", ScreenSize { width: 800.0, height: 600.0 }, 1, 18)
    }

    fn town_ratios() -> RatioTable {
        RatioTable::from([("TOWN".to_string(), 0.5)])
    }

    #[test]
    fn test_parse_keeps_polygons_only() {
        let b = BoundaryCollection::from_geojson_str(SAMPLE, &names()).unwrap();
        assert_eq!(b.len(), 3);
        assert_eq!(b.features()[0].name.as_deref(), Some("Town"));
        assert_eq!(b.features()[1].name.as_deref(), Some("Elsewhere"));
        assert_eq!(b.features()[2].name, None);
    }

    #[test]
    fn test_parse_uses_configured_name_property() {
        let only_cd = vec!["CDNAME".to_string()];
        let b = BoundaryCollection::from_geojson_str(SAMPLE, &only_cd).unwrap();
        assert!(b.features().iter().all(|f| f.name.is_none()));
    }

    #[test]
    fn test_parse_rejects_non_collection() {
        let err = BoundaryCollection::from_geojson_str(
            r#"{"type": "Point", "coordinates": [1, 2]}"#,
            &names(),
        )
        .unwrap_err();
        assert!(err.contains("FeatureCollection"));
        assert!(BoundaryCollection::from_geojson_str("not json", &names()).is_err());
    }

    #[test]
    fn test_render_styles_features_by_ratio() {
        let mut b = BoundaryCollection::from_geojson_str(SAMPLE, &names()).unwrap();
        let mut m = map();
        let mut overlay = ChoroplethOverlay::new();
        let layer = overlay.render(&mut m, &mut b, &town_ratios());

        assert_eq!(b.features()[0].ratio, Some(0.5));
        assert_eq!(b.features()[1].ratio, None);
        let town = &layer.features()[0];
        assert_eq!(town.style.fill_color, "#c2bb5e");
        assert_eq!(town.style.weight, 2.0);
        assert_eq!(town.style.opacity, 1.0);
        assert_eq!(town.style.color, "white");
        assert_eq!(town.style.dash_array, "3");
        assert_eq!(town.style.fill_opacity, 0.7);
        assert_eq!(town.tooltip, "Town: 50% French programs");
        assert_eq!(layer.features()[1].style.fill_color, "#888888");
        assert_eq!(layer.features()[1].tooltip, "Elsewhere: no data");
    }

    #[test]
    fn test_nameless_feature_does_not_join_unknown() {
        let mut b = BoundaryCollection::from_geojson_str(SAMPLE, &names()).unwrap();
        let ratios = RatioTable::from([("UNKNOWN".to_string(), 1.0)]);
        b.annotate(&ratios);
        assert_eq!(b.features()[2].ratio, None);
    }

    #[test]
    fn test_blank_name_does_not_join_unknown() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "   "},
             "geometry": {"type": "Polygon", "coordinates": [[[-54,47],[-53,47],[-53,48],[-54,48],[-54,47]]]}}
        ]}"#;
        let mut b = BoundaryCollection::from_geojson_str(text, &names()).unwrap();
        assert_eq!(b.features()[0].key(), None);
        b.annotate(&RatioTable::from([("UNKNOWN".to_string(), 1.0)]));
        assert_eq!(b.features()[0].ratio, None);
    }

    #[test]
    fn test_hidden_render_builds_without_attaching() {
        let mut b = BoundaryCollection::from_geojson_str(SAMPLE, &names()).unwrap();
        let mut m = map();
        let mut overlay = ChoroplethOverlay::new();
        assert_eq!(overlay.visibility(), OverlayVisibility::Hidden);
        overlay.render(&mut m, &mut b, &town_ratios());
        assert!(overlay.built().is_some());
        assert!(overlay.attached().is_none());
        assert!(m.layers_in(Pane::Overlay).is_empty());
    }

    #[test]
    fn test_show_then_remove_cycle() {
        let mut b = BoundaryCollection::from_geojson_str(SAMPLE, &names()).unwrap();
        let mut m = map();
        let mut overlay = ChoroplethOverlay::new();
        overlay.render(&mut m, &mut b, &town_ratios());

        overlay.show(&mut m);
        assert!(overlay.legend_visible());
        assert_eq!(m.layers_in(Pane::Overlay).len(), 1);
        overlay.show(&mut m);
        assert_eq!(m.layers_in(Pane::Overlay).len(), 1);

        overlay.remove(&mut m);
        assert!(!overlay.legend_visible());
        assert!(m.layers_in(Pane::Overlay).is_empty());
        assert!(overlay.built().is_some());
    }

    #[test]
    fn test_visible_render_replaces_previous_layer() {
        let mut b = BoundaryCollection::from_geojson_str(SAMPLE, &names()).unwrap();
        let mut m = map();
        let mut overlay = ChoroplethOverlay::new();
        overlay.show(&mut m);
        assert!(m.layers_in(Pane::Overlay).is_empty());
        overlay.render(&mut m, &mut b, &town_ratios());
        let first = overlay.attached();
        overlay.render(&mut m, &mut b, &RatioTable::new());
        assert_eq!(m.layers_in(Pane::Overlay).len(), 1);
        assert_ne!(overlay.attached(), first);
        assert_eq!(overlay.visibility(), OverlayVisibility::Visible);
    }

    #[test]
    fn test_feature_at_hit_test() {
        let mut b = BoundaryCollection::from_geojson_str(SAMPLE, &names()).unwrap();
        let mut m = map();
        let layer = ChoroplethOverlay::new().render(&mut m, &mut b, &town_ratios());
        let hit = layer.feature_at(LatLng::new(5.0, 5.0)).map(|f| f.name.as_deref());
        assert_eq!(hit, Some(Some("Town")));
        assert!(layer.feature_at(LatLng::new(15.0, 15.0)).is_none());
    }

    #[test]
    fn test_tooltip_rounds_percentage() {
        assert_eq!(tooltip_text("A", Some(1.0 / 3.0)), "A: 33% French programs");
        assert_eq!(tooltip_text("A", Some(f64::NAN)), "A: no data");
    }
}
