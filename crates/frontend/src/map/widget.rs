use std::collections::BTreeMap;
use std::rc::Rc;

use super::cluster::ClusterGroup;
use super::overlay::ChoroplethLayer;
use super::projection::{project, unproject, world_size, LatLng, LatLngBounds, PixelPoint, TILE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

/// Stacking group a layer belongs to. Managers find their own layers by pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    Tile,
    Overlay,
    Marker,
}

impl Pane {
    pub fn z_index(self) -> u16 {
        match self {
            Pane::Tile => 200,
            Pane::Overlay => 400,
            Pane::Marker => 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
}

impl TileLayer {
    pub fn new(url_template: impl Into<String>, attribution: impl Into<String>) -> Self {
        TileLayer {
            url_template: url_template.into(),
            attribution: attribution.into(),
        }
    }

    pub fn url(&self, z: u8, x: u32, y: u32) -> String {
        self.url_template
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

#[derive(Debug, Clone)]
pub enum Layer {
    Tiles(TileLayer),
    Choropleth(Rc<ChoroplethLayer>),
    Markers(Rc<ClusterGroup>),
}

impl Layer {
    pub fn pane(&self) -> Pane {
        match self {
            Layer::Tiles(_) => Pane::Tile,
            Layer::Choropleth(_) => Pane::Overlay,
            Layer::Markers(_) => Pane::Marker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

/// The operations the layer managers need from a map.
pub trait MapWidget {
    fn view(&self) -> Viewport;

    fn set_view(&mut self, center: LatLng, zoom: u8);

    fn add_layer(&mut self, layer: Layer) -> LayerId;

    fn remove_layer(&mut self, id: LayerId) -> Option<Layer>;

    /// Attached layers in the order they were added.
    fn layers(&self) -> Box<dyn Iterator<Item = (LayerId, &Layer)> + '_>;

    fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: f64);

    fn has_layer(&self, id: LayerId) -> bool {
        self.layers().any(|(candidate, _)| candidate == id)
    }

    fn layers_in(&self, pane: Pane) -> Vec<LayerId> {
        self.layers()
            .filter(|(_, layer)| layer.pane() == pane)
            .map(|(id, _)| id)
            .collect()
    }
}

/// One tile image positioned in container pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRef {
    pub url: String,
    pub left: f64,
    pub top: f64,
}

/// Retained map state rendered by the map component: a viewport over a Web
/// Mercator world plus an ordered layer set.
#[derive(Debug, Clone)]
pub struct SlippyMap {
    container_id: String,
    size: ScreenSize,
    view: Viewport,
    min_zoom: u8,
    max_zoom: u8,
    layers: BTreeMap<LayerId, Layer>,
    next_layer: u64,
}

impl SlippyMap {
    pub fn new(container_id: impl Into<String>, size: ScreenSize, min_zoom: u8, max_zoom: u8) -> Self {
        SlippyMap {
            container_id: container_id.into(),
            size,
            view: Viewport {
                center: LatLng::new(0.0, 0.0),
                zoom: min_zoom,
            },
            min_zoom,
            max_zoom: max_zoom.max(min_zoom),
            layers: BTreeMap::new(),
            next_layer: 0,
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn size(&self) -> ScreenSize {
        self.size
    }

    pub fn resize(&mut self, size: ScreenSize) {
        self.size = size;
    }

    fn clamp_zoom(&self, zoom: i32) -> u8 {
        zoom.clamp(self.min_zoom as i32, self.max_zoom as i32) as u8
    }

    /// World pixel of the container's top-left corner.
    pub fn pixel_origin(&self) -> PixelPoint {
        let c = project(self.view.center, self.view.zoom as f64);
        PixelPoint::new(c.x - self.size.width / 2.0, c.y - self.size.height / 2.0)
    }

    pub fn to_container(&self, ll: LatLng) -> PixelPoint {
        let p = project(ll, self.view.zoom as f64);
        let origin = self.pixel_origin();
        PixelPoint::new(p.x - origin.x, p.y - origin.y)
    }

    pub fn to_lat_lng(&self, point: PixelPoint) -> LatLng {
        let origin = self.pixel_origin();
        unproject(
            PixelPoint::new(origin.x + point.x, origin.y + point.y),
            self.view.zoom as f64,
        )
    }

    /// Move the content by a drag of `(dx, dy)` container pixels.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let zoom = self.view.zoom as f64;
        let c = project(self.view.center, zoom);
        let y = (c.y - dy).clamp(0.0, world_size(zoom));
        self.view.center = unproject(PixelPoint::new(c.x - dx, y), zoom);
    }

    /// Change zoom by `delta` steps keeping the point under `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: PixelPoint, delta: i32) {
        let new_zoom = self.clamp_zoom(self.view.zoom as i32 + delta);
        if new_zoom == self.view.zoom {
            return;
        }
        let anchored = self.to_lat_lng(anchor);
        let p = project(anchored, new_zoom as f64);
        let center = PixelPoint::new(
            p.x - anchor.x + self.size.width / 2.0,
            p.y - anchor.y + self.size.height / 2.0,
        );
        self.view = Viewport {
            center: unproject(center, new_zoom as f64),
            zoom: new_zoom,
        };
    }

    /// Largest zoom at which `bounds` fit inside the container less `padding`
    /// on every side. Falls back to the minimum zoom.
    pub fn bounds_zoom(&self, bounds: &LatLngBounds, padding: f64) -> u8 {
        let (Some(nw), Some(se)) = (bounds.north_west(), bounds.south_east()) else {
            return self.view.zoom;
        };
        let avail_w = (self.size.width - 2.0 * padding).max(1.0);
        let avail_h = (self.size.height - 2.0 * padding).max(1.0);
        (self.min_zoom..=self.max_zoom)
            .rev()
            .find(|&z| {
                let a = project(nw, z as f64);
                let b = project(se, z as f64);
                (b.x - a.x) <= avail_w && (b.y - a.y) <= avail_h
            })
            .unwrap_or(self.min_zoom)
    }

    /// Tiles covering the container at the current zoom. Columns wrap around
    /// the antimeridian; rows outside the world are dropped.
    pub fn visible_tiles(&self, layer: &TileLayer) -> Vec<TileRef> {
        let z = self.view.zoom;
        let n = 1i64 << z;
        let origin = self.pixel_origin();
        let x0 = (origin.x / TILE_SIZE).floor() as i64;
        let x1 = ((origin.x + self.size.width) / TILE_SIZE).floor() as i64;
        let y0 = ((origin.y / TILE_SIZE).floor() as i64).max(0);
        let y1 = (((origin.y + self.size.height) / TILE_SIZE).floor() as i64).min(n - 1);

        let mut tiles = Vec::new();
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                let wrapped = tx.rem_euclid(n) as u32;
                tiles.push(TileRef {
                    url: layer.url(z, wrapped, ty as u32),
                    left: tx as f64 * TILE_SIZE - origin.x,
                    top: ty as f64 * TILE_SIZE - origin.y,
                });
            }
        }
        tiles
    }

    /// Attached layers sorted by pane, then insertion order.
    pub fn layers_by_pane(&self) -> Vec<(LayerId, &Layer)> {
        let mut layers: Vec<_> = self.layers.iter().map(|(id, l)| (*id, l)).collect();
        layers.sort_by_key(|(id, l)| (l.pane().z_index(), *id));
        layers
    }
}

impl MapWidget for SlippyMap {
    fn view(&self) -> Viewport {
        self.view
    }

    fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.view = Viewport {
            center,
            zoom: self.clamp_zoom(zoom as i32),
        };
    }

    fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.layers.insert(id, layer);
        id
    }

    fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        self.layers.remove(&id)
    }

    fn layers(&self) -> Box<dyn Iterator<Item = (LayerId, &Layer)> + '_> {
        Box::new(self.layers.iter().map(|(id, layer)| (*id, layer)))
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: f64) {
        let (Some(nw), Some(se)) = (bounds.north_west(), bounds.south_east()) else {
            return;
        };
        let zoom = self.bounds_zoom(bounds, padding);
        let a = project(nw, zoom as f64);
        let b = project(se, zoom as f64);
        let mid = PixelPoint::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        self.view = Viewport {
            center: unproject(mid, zoom as f64),
            zoom,
        };
    }
}
