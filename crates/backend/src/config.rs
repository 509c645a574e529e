use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_PATH: &str = "data/facilities.redb";
const DEFAULT_BOUNDARIES_PATH: &str = "data/canadaDistricts.geojson";

#[derive(Debug, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub boundaries_path: PathBuf,
    /// JSON array of facilities imported into the store at startup.
    pub facilities_seed: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError {
                var: "PORT",
                reason: e.to_string(),
                value,
            })?,
            None => DEFAULT_PORT,
        };
        let path = |var: &str, default: &str| PathBuf::from(lookup(var).unwrap_or_else(|| default.to_string()));

        Ok(ServerConfig {
            port,
            db_path: path("DB_PATH", DEFAULT_DB_PATH),
            boundaries_path: path("BOUNDARIES_PATH", DEFAULT_BOUNDARIES_PATH),
            facilities_seed: lookup("FACILITIES_SEED")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}
