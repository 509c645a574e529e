use efl_shared::ratios::FacilityKeyField;
use serde::Deserialize;

use super::projection::LatLng;

pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Map session settings. Every field has a default so partial JSON works.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    pub default_center: LatLng,
    pub default_zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Pixels kept free on each side when fitting to the markers.
    pub fit_padding: f64,
    pub tile_url: String,
    pub tile_attribution: String,
    pub facility_key: FacilityKeyField,
    /// Boundary properties tried in order for the feature name.
    pub boundary_name_properties: Vec<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            default_center: LatLng::new(56.0, -96.0),
            default_zoom: 4,
            min_zoom: 1,
            max_zoom: 18,
            fit_padding: 50.0,
            tile_url: OSM_TILE_URL.to_string(),
            tile_attribution: OSM_ATTRIBUTION.to_string(),
            facility_key: FacilityKeyField::MunicipalityName,
            boundary_name_properties: ["name", "NAME", "CSDNAME", "CDNAME"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
