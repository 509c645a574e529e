//! Per-municipality French-program ratios.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Facility;

/// Key for facilities whose municipality name is missing or blank.
pub const UNKNOWN_MUNICIPALITY: &str = "UNKNOWN";

/// Trim and upper-case a municipality name. This is the join key between
/// facility records and boundary polygon names.
pub fn normalize_key(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) => n.to_uppercase(),
        None => UNKNOWN_MUNICIPALITY.to_string(),
    }
}

/// Which facility field supplies the municipality name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacilityKeyField {
    #[default]
    MunicipalityName,
    CensusDivisionName,
}

impl FacilityKeyField {
    pub fn key_for(self, facility: &Facility) -> String {
        let name = match self {
            FacilityKeyField::MunicipalityName => facility.municipality_name.as_deref(),
            FacilityKeyField::CensusDivisionName => facility.census_division_name.as_deref(),
        };
        normalize_key(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityStat {
    pub french_count: u32,
    pub english_count: u32,
    pub total: u32,
    /// `french_count / total`, or 0 when `total` is 0.
    pub ratio: f64,
}

impl MunicipalityStat {
    fn record(&mut self, french: bool) {
        if french {
            self.french_count += 1;
        } else {
            self.english_count += 1;
        }
        self.total += 1;
        self.ratio = self.french_count as f64 / self.total as f64;
    }
}

pub type StatTable = BTreeMap<String, MunicipalityStat>;
pub type RatioTable = BTreeMap<String, f64>;

/// Group facilities by normalized municipality and count French vs English.
pub fn municipality_stats(facilities: &[Facility], field: FacilityKeyField) -> StatTable {
    let mut stats = StatTable::new();
    for facility in facilities {
        stats
            .entry(field.key_for(facility))
            .or_default()
            .record(facility.is_french());
    }
    stats
}

pub fn ratios_from_stats(stats: &StatTable) -> RatioTable {
    stats.iter().map(|(k, s)| (k.clone(), s.ratio)).collect()
}

/// Normalized municipality key -> French ratio.
pub fn municipality_ratios(facilities: &[Facility], field: FacilityKeyField) -> RatioTable {
    ratios_from_stats(&municipality_stats(facilities, field))
}
