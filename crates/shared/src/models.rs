use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Province and territory codes a facility record may carry.
pub const PROVINCE_CODES: [&str; 13] = [
    "AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU", "ON", "PE", "QC", "SK", "YT",
];

/// Whether `code` is one of [`PROVINCE_CODES`] (exact, upper-case match).
pub fn is_province_code(code: &str) -> bool {
    PROVINCE_CODES.contains(&code)
}

/// A geolocated educational facility as served by `/api/facilities`.
///
/// Only `geometry`, the municipality fields and the five language-program
/// flags feed the map; the rest is carried for the table view and validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    #[serde(default)]
    pub id: i64,
    pub unique_id: Option<String>,
    #[serde(default)]
    pub facility_name: String,
    pub facility_type: Option<String>,
    pub authority_name: Option<String>,
    pub address: Option<String>,
    pub unit: Option<String>,
    pub postal_code: Option<String>,
    pub municipality_name: Option<String>,
    pub province: Option<String>,
    pub source_id: Option<String>,
    pub min_grade: Option<String>,
    pub max_grade: Option<String>,
    pub census_division_name: Option<String>,
    pub census_division_id: Option<String>,
    /// WKT text, normally `POINT (lon lat)`.
    #[serde(default)]
    pub geometry: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date_updated: Option<NaiveDate>,

    #[serde(default, deserialize_with = "null_as_false")]
    pub language_minority_status: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub french_immersion: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub early_immersion: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub middle_immersion: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub late_immersion: bool,
}

impl Facility {
    /// A facility counts as French when any language-program flag is set.
    pub fn is_french(&self) -> bool {
        self.language_minority_status
            || self.french_immersion
            || self.early_immersion
            || self.middle_immersion
            || self.late_immersion
    }

    pub fn municipality(&self) -> &str {
        self.municipality_name.as_deref().unwrap_or_default()
    }
}

/// The source database stores the flags as nullable booleans.
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
