//! Well-known-text point parsing.
//!
//! Facility geometries arrive as `POINT (lon lat)`. Map layers work in
//! `(lat, lng)` order, so [`parse_point`] swaps the pair on the way out.

use std::sync::OnceLock;

use regex::Regex;

/// A geographic position in `(latitude, longitude)` order.
///
/// Only [`parse_point`] produces one, so every `Coordinate` is finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn as_lat_lng(&self) -> [f64; 2] {
        [self.lat, self.lng]
    }
}

fn point_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // ASCII digits only: `\d` would also accept other Unicode digit classes.
        Regex::new(r"(?i)^\s*POINT\s*\(\s*([-+]?[0-9]+(?:\.[0-9]+)?)\s+([-+]?[0-9]+(?:\.[0-9]+)?)\s*\)\s*$")
            .expect("point pattern compiles")
    })
}

/// Parse `POINT (lon lat)` into a coordinate.
///
/// Returns `None` for anything else: empty text, other geometry types,
/// missing or non-numeric tokens, or values that overflow to infinity.
pub fn parse_point(wkt: &str) -> Option<Coordinate> {
    let caps = point_pattern().captures(wkt)?;
    let lng: f64 = caps.get(1)?.as_str().parse().ok()?;
    let lat: f64 = caps.get(2)?.as_str().parse().ok()?;
    if !lat.is_finite() || !lng.is_finite() {
        return None;
    }
    Some(Coordinate { lat, lng })
}
