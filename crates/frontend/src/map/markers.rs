use std::rc::Rc;

use efl_shared::models::Facility;
use efl_shared::wkt::parse_point;

use super::cluster::{CircleStyle, ClusterFactory, Marker, MarkerLabel};
use super::projection::LatLngBounds;
use super::widget::{Layer, LayerId, MapWidget, Pane};

/// What one rebuild did.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRebuild {
    pub layer: LayerId,
    pub markers: usize,
    /// Facilities whose geometry did not parse.
    pub skipped: usize,
    /// Marker-pane layers detached before the new one went in.
    pub removed: usize,
    pub bounds: LatLngBounds,
}

/// Keeps exactly one cluster-group layer on the map, rebuilt from scratch on
/// every facility change.
#[derive(Debug)]
pub struct MarkerClusterManager {
    factory: &'static ClusterFactory,
    padding: f64,
    current: Option<LayerId>,
}

impl MarkerClusterManager {
    pub fn new(factory: &'static ClusterFactory, padding: f64) -> Self {
        MarkerClusterManager {
            factory,
            padding,
            current: None,
        }
    }

    pub fn current_layer(&self) -> Option<LayerId> {
        self.current
    }

    pub fn rebuild<M: MapWidget + ?Sized>(&mut self, map: &mut M, facilities: &[Facility]) -> MarkerRebuild {
        let stale = map.layers_in(Pane::Marker);
        let removed = stale.len();
        for id in stale {
            map.remove_layer(id);
        }

        let mut bounds = LatLngBounds::new();
        let mut markers = Vec::with_capacity(facilities.len());
        for facility in facilities {
            let Some(position) = parse_point(&facility.geometry) else {
                continue;
            };
            bounds.extend(position.into());
            markers.push(Marker {
                facility_id: facility.id,
                position,
                label: MarkerLabel {
                    title: facility.facility_name.clone(),
                    subtitle: facility.municipality().to_string(),
                },
                style: CircleStyle::default(),
            });
        }
        let count = markers.len();
        let skipped = facilities.len() - count;

        let layer = map.add_layer(Layer::Markers(Rc::new(self.factory.group(markers))));
        self.current = Some(layer);

        if bounds.is_valid() {
            map.fit_bounds(&bounds, self.padding);
        }

        tracing::debug!(markers = count, skipped, removed, "marker layer rebuilt");
        MarkerRebuild {
            layer,
            markers: count,
            skipped,
            removed,
            bounds,
        }
    }
}
