//! Ownership of the one map widget per visualization session.

use super::config::MapConfig;
use super::widget::{Layer, MapWidget, ScreenSize, SlippyMap, TileLayer};

/// The DOM element the map renders into.
#[derive(Debug, Clone, PartialEq)]
pub struct MapContainer {
    pub id: String,
    pub size: ScreenSize,
}

impl MapContainer {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        MapContainer {
            id: id.into(),
            size: ScreenSize { width, height },
        }
    }
}

#[derive(Debug, Default)]
pub struct MapLifecycle {
    map: Option<SlippyMap>,
    created: u32,
}

impl MapLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the widget on first call; later calls return the live one
    /// untouched, whatever container they pass.
    pub fn ensure_mounted(&mut self, container: &MapContainer, config: &MapConfig) -> &mut SlippyMap {
        let created = &mut self.created;
        self.map.get_or_insert_with(|| {
            *created += 1;
            let mut map = SlippyMap::new(
                container.id.clone(),
                container.size,
                config.min_zoom,
                config.max_zoom,
            );
            map.set_view(config.default_center, config.default_zoom);
            map.add_layer(Layer::Tiles(TileLayer::new(
                config.tile_url.clone(),
                config.tile_attribution.clone(),
            )));
            tracing::info!(container = %container.id, "map mounted");
            map
        })
    }

    pub fn is_mounted(&self) -> bool {
        self.map.is_some()
    }

    pub fn map(&self) -> Option<&SlippyMap> {
        self.map.as_ref()
    }

    pub fn map_mut(&mut self) -> Option<&mut SlippyMap> {
        self.map.as_mut()
    }

    pub fn unmount(&mut self) -> Option<SlippyMap> {
        let map = self.map.take();
        if map.is_some() {
            tracing::info!("map unmounted");
        }
        map
    }

    /// Number of widgets created over this lifecycle's life.
    pub fn instances_created(&self) -> u32 {
        self.created
    }
}
