//! Data-quality checks over the facility table.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{is_province_code, Facility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    MissingField,
    DuplicateUniqueId,
    InvalidProvince,
    InvalidCoordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub id: i64,
    pub unique_id: Option<String>,
    pub facility_name: String,
    pub issue_type: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    fn new(facility: &Facility, issue_type: IssueKind, message: impl Into<String>) -> Self {
        ValidationIssue {
            id: facility.id,
            unique_id: facility.unique_id.clone(),
            facility_name: facility.facility_name.clone(),
            issue_type,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total_records: usize,
    pub missing_field_count: usize,
    pub duplicate_unique_id_count: usize,
    pub invalid_province_count: usize,
    pub invalid_coordinate_count: usize,
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Latitude and longitude must be both present or both absent, and in range.
fn has_invalid_coordinates(facility: &Facility) -> bool {
    match (facility.latitude, facility.longitude) {
        (None, None) => false,
        (Some(lat), Some(lng)) => !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng),
        _ => true,
    }
}

/// Run every check over `facilities`. A facility with several missing fields
/// gets one issue per field but counts once towards `missing_field_count`.
pub fn validate_facilities(facilities: &[Facility]) -> ValidationReport {
    let mut unique_id_counts: HashMap<&str, usize> = HashMap::new();
    for f in facilities {
        if let Some(uid) = f.unique_id.as_deref().map(str::trim) {
            *unique_id_counts.entry(uid).or_default() += 1;
        }
    }

    let mut report = ValidationReport {
        total_records: facilities.len(),
        ..Default::default()
    };

    for f in facilities {
        let mut missing = false;
        for (field, value) in [
            ("uniqueId", f.unique_id.as_deref()),
            ("facilityName", Some(f.facility_name.as_str())),
            ("province", f.province.as_deref()),
        ] {
            if blank(value) {
                report.issues.push(ValidationIssue::new(
                    f,
                    IssueKind::MissingField,
                    format!("Missing {field}"),
                ));
                missing = true;
            }
        }
        if missing {
            report.missing_field_count += 1;
        }

        if let Some(uid) = f.unique_id.as_deref().map(str::trim) {
            if unique_id_counts.get(uid).copied().unwrap_or(0) > 1 {
                report.issues.push(ValidationIssue::new(
                    f,
                    IssueKind::DuplicateUniqueId,
                    format!("Duplicate uniqueId: {uid}"),
                ));
                report.duplicate_unique_id_count += 1;
            }
        }

        if let Some(province) = f.province.as_deref().map(str::trim) {
            if !is_province_code(province) {
                report.issues.push(ValidationIssue::new(
                    f,
                    IssueKind::InvalidProvince,
                    format!("Invalid province code: {province}"),
                ));
                report.invalid_province_count += 1;
            }
        }

        if has_invalid_coordinates(f) {
            report.issues.push(ValidationIssue::new(
                f,
                IssueKind::InvalidCoordinates,
                "Invalid or incomplete latitude/longitude",
            ));
            report.invalid_coordinate_count += 1;
        }
    }

    report.valid = report.issues.is_empty();
    report
}
