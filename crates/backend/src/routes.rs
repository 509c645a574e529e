use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use efl_shared::models::Facility;
use efl_shared::ratios::normalize_key;
use efl_shared::validation::{validate_facilities, ValidationReport};
use serde::Serialize;

use crate::boundaries;
use crate::error::ApiError;
use crate::storage::FacilityStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FacilityStore>,
    pub boundaries_path: Arc<PathBuf>,
}

type FacilityList = Result<Json<Vec<Facility>>, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationResponse {
    #[serde(flatten)]
    report: ValidationReport,
    generated_at: DateTime<Utc>,
}

/// Everything under `/api`.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/facilities", get(all_facilities))
        .route("/facilities/{id}", get(facility_by_id))
        .route("/facilities/unique/{unique_id}", get(facility_by_unique_id))
        .route("/facilities/province/{province}", get(by_province))
        .route("/facilities/municipality/{name}", get(by_municipality))
        .route("/facilities/type/{facility_type}", get(by_type))
        .route("/facilities/french-immersion", get(french_immersion))
        .route("/facilities/validation", get(validation))
        .route("/municipalities", get(municipalities))
        .with_state(state)
}

fn filtered(state: &AppState, keep: impl Fn(&Facility) -> bool) -> FacilityList {
    let mut facilities = state.store.all()?;
    facilities.retain(|f| keep(f));
    Ok(Json(facilities))
}

fn field_matches(field: Option<&str>, wanted: &str) -> bool {
    field.is_some_and(|v| v.trim().eq_ignore_ascii_case(wanted.trim()))
}

async fn all_facilities(State(state): State<AppState>) -> FacilityList {
    Ok(Json(state.store.all()?))
}

async fn facility_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Facility>, ApiError> {
    state
        .store
        .get(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("facility {id}")))
}

async fn facility_by_unique_id(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<Facility>, ApiError> {
    state
        .store
        .all()?
        .into_iter()
        .find(|f| f.unique_id.as_deref() == Some(unique_id.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("facility {unique_id}")))
}

async fn by_province(State(state): State<AppState>, Path(province): Path<String>) -> FacilityList {
    filtered(&state, |f| field_matches(f.province.as_deref(), &province))
}

async fn by_municipality(State(state): State<AppState>, Path(name): Path<String>) -> FacilityList {
    let key = normalize_key(Some(&name));
    filtered(&state, |f| normalize_key(f.municipality_name.as_deref()) == key)
}

async fn by_type(State(state): State<AppState>, Path(facility_type): Path<String>) -> FacilityList {
    filtered(&state, |f| field_matches(f.facility_type.as_deref(), &facility_type))
}

async fn french_immersion(State(state): State<AppState>) -> FacilityList {
    filtered(&state, |f| f.french_immersion)
}

async fn validation(State(state): State<AppState>) -> Result<Json<ValidationResponse>, ApiError> {
    let facilities = state.store.all()?;
    let report = validate_facilities(&facilities);
    tracing::info!(
        total = report.total_records,
        issues = report.issues.len(),
        "validation report generated"
    );
    Ok(Json(ValidationResponse {
        report,
        generated_at: Utc::now(),
    }))
}

async fn municipalities(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let geojson = boundaries::read_geojson(&state.boundaries_path).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], geojson))
}
