//! Configuration management for the bronze ingestion pipeline.
//!
//! Values come from environment variables, optionally seeded from `.env` files.
//! Lookup order:
//! 1. Environment variables (highest priority)
//! 2. `.env` in the current working directory
//! 3. `.env` in the local data directory (`<data_local_dir>/sporlbronze/.env`)
//! 4. Application defaults (endpoints and base directory only)
//!
//! Credentials have no default; a missing value is an [`IngestError::Config`].

use std::{env, path::PathBuf};

use tracing::debug;

use crate::{IngestError, Res, types::Credentials};

pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_SEARCH_URL: &str = "https://api.spotify.com/v1/search";
pub const DEFAULT_BASE_DIR: &str = "./data/bronze";

/// Loads `.env` files without overriding variables that are already set.
///
/// Missing files are not an error. The data directory is created so users
/// find the place to drop their `.env`.
///
/// # Errors
///
/// Returns [`IngestError::Config`] when a `.env` file exists but cannot be parsed.
pub fn load_env() -> Res<()> {
    let local = PathBuf::from(".env");
    let user = env_file_path();
    if let Some(parent) = user.parent() {
        // best effort; a read-only home should not stop the run
        let _ = std::fs::create_dir_all(parent);
    }

    for path in [local, user] {
        if !path.is_file() {
            continue;
        }
        dotenv::from_path(&path)
            .map_err(|e| IngestError::Config(format!("cannot load {}: {}", path.display(), e)))?;
        debug!("loaded environment from {}", path.display());
    }
    Ok(())
}

pub fn env_file_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sporlbronze/.env");
    path
}

fn required(key: &str) -> Res<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(IngestError::Config(format!(
            "missing required env var: {key}"
        ))),
    }
}

fn with_default(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// `SPOTIFY_CLIENT_ID`, from the Spotify developer dashboard.
pub fn spotify_client_id() -> Res<String> {
    required("SPOTIFY_CLIENT_ID")
}

/// `SPOTIFY_CLIENT_SECRET`. Never logged.
pub fn spotify_client_secret() -> Res<String> {
    required("SPOTIFY_CLIENT_SECRET")
}

pub fn spotify_token_url() -> String {
    with_default("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL)
}

pub fn spotify_search_url() -> String {
    with_default("SPOTIFY_API_SEARCH_URL", DEFAULT_SEARCH_URL)
}

/// `BRONZE_BASE_DIR`: a local path or a `dbfs:/` URI.
pub fn bronze_base_dir() -> String {
    with_default("BRONZE_BASE_DIR", DEFAULT_BASE_DIR)
}

/// Everything the pipeline needs from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub token_url: String,
    pub search_url: String,
    pub base_dir: String,
}

impl Settings {
    pub fn from_env() -> Res<Self> {
        Ok(Self {
            credentials: Credentials::new(spotify_client_id()?, spotify_client_secret()?)?,
            token_url: spotify_token_url(),
            search_url: spotify_search_url(),
            base_dir: bronze_base_dir(),
        })
    }
}
