use std::f64::consts::PI;

use efl_shared::wkt::Coordinate;
use serde::{Deserialize, Serialize};

/// Tile edge in pixels; the world is `TILE_SIZE * 2^zoom` pixels wide.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude where Web Mercator makes the world square.
const MAX_LATITUDE: f64 = 85.051_128_779_8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

impl From<Coordinate> for LatLng {
    fn from(c: Coordinate) -> Self {
        LatLng::new(c.lat(), c.lng())
    }
}

/// A point in pixels, either world space at some zoom or container space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        PixelPoint { x, y }
    }

    pub fn distance_to(&self, other: PixelPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Spherical Web Mercator: lat/lng to world pixels at `zoom`.
pub fn project(ll: LatLng, zoom: f64) -> PixelPoint {
    let size = world_size(zoom);
    let lat = ll.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (ll.lng + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    PixelPoint::new(x, y)
}

pub fn unproject(p: PixelPoint, zoom: f64) -> LatLng {
    let size = world_size(zoom);
    let lng = p.x / size * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * p.y / size);
    LatLng::new(n.sinh().atan().to_degrees(), lng)
}

/// Rectangle in lat/lng. Starts empty (invalid) and grows with [`extend`].
///
/// [`extend`]: LatLngBounds::extend
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatLngBounds {
    corners: Option<(LatLng, LatLng)>,
}

impl LatLngBounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, ll: LatLng) {
        self.corners = Some(match self.corners {
            None => (ll, ll),
            Some((sw, ne)) => (
                LatLng::new(sw.lat.min(ll.lat), sw.lng.min(ll.lng)),
                LatLng::new(ne.lat.max(ll.lat), ne.lng.max(ll.lng)),
            ),
        });
    }

    /// True once at least one point has been added.
    pub fn is_valid(&self) -> bool {
        self.corners.is_some()
    }

    pub fn south_west(&self) -> Option<LatLng> {
        self.corners.map(|(sw, _)| sw)
    }

    pub fn north_east(&self) -> Option<LatLng> {
        self.corners.map(|(_, ne)| ne)
    }

    pub fn north_west(&self) -> Option<LatLng> {
        self.corners.map(|(sw, ne)| LatLng::new(ne.lat, sw.lng))
    }

    pub fn south_east(&self) -> Option<LatLng> {
        self.corners.map(|(sw, ne)| LatLng::new(sw.lat, ne.lng))
    }

    pub fn contains(&self, ll: LatLng) -> bool {
        match self.corners {
            None => false,
            Some((sw, ne)) => {
                ll.lat >= sw.lat && ll.lat <= ne.lat && ll.lng >= sw.lng && ll.lng <= ne.lng
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_origin_is_world_center() {
        let p = project(LatLng::new(0.0, 0.0), 0.0);
        assert!((p.x - 128.0).abs() < 1e-9);
        assert!((p.y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let ll = LatLng::new(47.7650123, -53.9840877);
        let back = unproject(project(ll, 7.0), 7.0);
        assert!((back.lat - ll.lat).abs() < 1e-9);
        assert!((back.lng - ll.lng).abs() < 1e-9);
    }

    #[test]
    fn test_project_clamps_poles() {
        let north = project(LatLng::new(90.0, 0.0), 0.0);
        assert!(north.y.abs() < 1e-3);
    }

    #[test]
    fn test_bounds_start_invalid() {
        let b = LatLngBounds::new();
        assert!(!b.is_valid());
        assert!(b.south_west().is_none());
        assert!(!b.contains(LatLng::new(0.0, 0.0)));
    }

    #[test]
    fn test_bounds_extend() {
        let mut b = LatLngBounds::new();
        b.extend(LatLng::new(45.0, -75.0));
        b.extend(LatLng::new(49.0, -123.0));
        assert_eq!(b.south_west(), Some(LatLng::new(45.0, -123.0)));
        assert_eq!(b.north_east(), Some(LatLng::new(49.0, -75.0)));
        assert_eq!(b.north_west(), Some(LatLng::new(49.0, -123.0)));
        assert!(b.contains(LatLng::new(47.0, -100.0)));
        assert!(!b.contains(LatLng::new(50.0, -100.0)));
    }
}
