use efl_shared::models::Facility;
use reqwest::Url;

/// Server-side facility subsets exposed under `/api/facilities`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FacilityFilter {
    #[default]
    All,
    Province(String),
    Municipality(String),
    FacilityType(String),
    FrenchImmersion,
}

impl FacilityFilter {
    fn segments(&self) -> Vec<&str> {
        match self {
            FacilityFilter::All => vec![],
            FacilityFilter::Province(p) => vec!["province", p],
            FacilityFilter::Municipality(m) => vec!["municipality", m],
            FacilityFilter::FacilityType(t) => vec!["type", t],
            FacilityFilter::FrenchImmersion => vec!["french-immersion"],
        }
    }
}

/// Build an API URL from the page origin, percent-encoding each segment.
pub fn build_api_url(origin: &str, segments: &[&str]) -> Result<String, String> {
    let mut url = Url::parse(origin).map_err(|e| format!("Bad origin {origin}: {e}"))?;
    url.path_segments_mut()
        .map_err(|_| format!("Origin {origin} cannot carry a path"))?
        .clear()
        .push("api")
        .extend(segments);
    Ok(url.to_string())
}

pub fn facilities_url(origin: &str, filter: &FacilityFilter) -> Result<String, String> {
    let mut segments = vec!["facilities"];
    segments.extend(filter.segments());
    build_api_url(origin, &segments)
}

pub fn municipalities_url(origin: &str) -> Result<String, String> {
    build_api_url(origin, &["municipalities"])
}

fn origin() -> Result<String, String> {
    let window = web_sys::window().ok_or("No browser window")?;
    window
        .location()
        .origin()
        .map_err(|_| "Page origin unavailable".to_string())
}

async fn get(url: &str) -> Result<reqwest::Response, String> {
    let resp = reqwest::get(url).await.map_err(|e| e.to_string())?;
    let status = resp.status();
    if !status.is_success() {
        return Err(format!("{url} returned HTTP {}", status.as_u16()));
    }
    Ok(resp)
}

pub async fn fetch_facilities(filter: &FacilityFilter) -> Result<Vec<Facility>, String> {
    let url = facilities_url(&origin()?, filter)?;
    get(&url).await?.json().await.map_err(|e| e.to_string())
}

/// Boundary polygons as raw GeoJSON text; parsing happens in the map engine.
pub async fn fetch_municipalities() -> Result<String, String> {
    let url = municipalities_url(&origin()?)?;
    get(&url).await?.text().await.map_err(|e| e.to_string())
}
