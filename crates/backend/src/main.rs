mod boundaries;
mod config;
mod error;
mod routes;
mod storage;

use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{response::Html, routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use routes::AppState;
use storage::FacilityStore;

/// Build a cache-controlled static file router.
///
/// Separated so tests can exercise the caching layer with arbitrary directories.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Build the full application router.
fn build_app(state: AppState) -> Router {
    let static_files = Router::new()
        .nest(
            "/static",
            cached_static_router(Path::new("assets"), CACHE_1DAY),
        )
        .nest(
            "/dist",
            cached_static_router(Path::new("dist"), CACHE_IMMUTABLE),
        )
        .nest(
            "/assets",
            cached_static_router(Path::new("dist/assets"), CACHE_IMMUTABLE),
        );

    Router::new()
        .nest("/api", routes::api_router(state))
        .route("/", get(serve_index))
        .merge(static_files)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().unwrap_or_else(|e| panic!("Bad configuration: {e}"));

    let store = FacilityStore::open(&config.db_path)
        .unwrap_or_else(|e| panic!("Failed to open database at {}: {e}", config.db_path.display()));
    if let Some(seed) = &config.facilities_seed {
        let imported = store
            .import_json_file(seed)
            .unwrap_or_else(|e| panic!("Failed to import {}: {e}", seed.display()));
        tracing::info!(imported, seed = %seed.display(), "facilities seeded");
    }
    match store.count() {
        Ok(count) => tracing::info!(count, db = %config.db_path.display(), "facility store ready"),
        Err(e) => tracing::warn!(error = %e, "could not count facilities"),
    }

    let app = build_app(AppState {
        store,
        boundaries_path: Arc::new(config.boundaries_path.clone()),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {addr}: {e}"));
    tracing::info!("Server running at http://localhost:{}", config.port);
    axum::serve(listener, app).await.expect("server error");
}

async fn serve_index() -> Html<String> {
    // Try to serve the built frontend, fall back to a simple message
    match tokio::fs::read_to_string("dist/index.html").await {
        Ok(html) => Html(html),
        Err(_) => Html(
            r#"<!DOCTYPE html>
<html>
<head><title>French Language Facilities</title></head>
<body>
<h1>French Language Facilities</h1>
<p>Frontend not built yet. The data API lives under <a href="/api/facilities">/api/facilities</a>.</p>
</body>
</html>"#
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, Response, StatusCode};
    use tower::ServiceExt;

    /// Static routers over temp directories, laid out like `build_app`.
    fn static_app(assets_dir: &Path, dist_dir: &Path, dist_assets_dir: &Path) -> Router {
        Router::new()
            .nest("/static", cached_static_router(assets_dir, CACHE_1DAY))
            .nest("/dist", cached_static_router(dist_dir, CACHE_IMMUTABLE))
            .nest("/assets", cached_static_router(dist_assets_dir, CACHE_IMMUTABLE))
    }

    fn temp_dir_with_file(file_name: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(file_name), content).unwrap();
        dir
    }

    async fn fetch(app: &Router, uri: &str) -> Response<Body> {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn cache_control(resp: &Response<Body>) -> &str {
        resp.headers().get("cache-control").unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn test_cache_policy_per_mount() {
        let assets = temp_dir_with_file("canadaDistricts.geojson", "{}");
        let dist = temp_dir_with_file("efl-frontend-abc123.js", "bundle()");
        let dist_assets = temp_dir_with_file("main-xyz.css", "body{}");
        let app = static_app(assets.path(), dist.path(), dist_assets.path());

        let static_resp = fetch(&app, "/static/canadaDistricts.geojson").await;
        assert_eq!(static_resp.status(), StatusCode::OK);
        assert_eq!(cache_control(&static_resp), CACHE_1DAY);

        let bundle = fetch(&app, "/dist/efl-frontend-abc123.js").await;
        assert_eq!(bundle.status(), StatusCode::OK);
        assert_eq!(cache_control(&bundle), CACHE_IMMUTABLE);

        let css = fetch(&app, "/assets/main-xyz.css").await;
        assert_eq!(css.status(), StatusCode::OK);
        assert_eq!(cache_control(&css), CACHE_IMMUTABLE);
    }

    #[tokio::test]
    async fn test_missing_static_file_returns_404() {
        let assets = temp_dir_with_file("a.json", "[]");
        let dist = temp_dir_with_file("index.html", "<html></html>");
        let dist_assets = temp_dir_with_file("app.js", "");
        let app = static_app(assets.path(), dist.path(), dist_assets.path());

        let resp = fetch(&app, "/static/nonexistent.txt").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_app_serves_api_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FacilityStore::open(&dir.path().join("f.redb")).unwrap();
        store
            .replace_all(&[efl_shared::models::Facility {
                id: 1,
                facility_name: "Holy Trinity".into(),
                ..Default::default()
            }])
            .unwrap();
        let app = build_app(AppState {
            store,
            boundaries_path: Arc::new(dir.path().join("absent.geojson")),
        });

        let resp = fetch(&app, "/api/facilities").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body[0]["facilityName"], "Holy Trinity");

        assert_eq!(fetch(&app, "/api/municipalities").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(fetch(&app, "/facilities").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_falls_back_without_build() {
        let dir = tempfile::tempdir().unwrap();
        let store = FacilityStore::open(&dir.path().join("f.redb")).unwrap();
        let app = build_app(AppState {
            store,
            boundaries_path: Arc::new(dir.path().join("b.geojson")),
        });
        let resp = fetch(&app, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("French Language Facilities"));
    }
}
