use std::io::ErrorKind;
use std::path::Path;

use crate::error::{ApiError, StoreError};

/// Read the municipality boundary GeoJSON as-is. The file is re-read per
/// request so it can be swapped without a restart.
pub async fn read_geojson(path: &Path) -> Result<String, ApiError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "boundary file missing");
            Err(ApiError::NotFound("municipality boundaries".into()))
        }
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_file_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.geojson");
        let body = r#"{"type":"FeatureCollection","features":[]}"#;
        std::fs::write(&path, body).unwrap();
        assert_eq!(read_geojson(&path).await.unwrap(), body);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_geojson(&dir.path().join("none.geojson")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_geojson(dir.path()).await.unwrap_err();
        assert!(matches!(err, ApiError::Store(StoreError::Io { .. })));
    }
}
