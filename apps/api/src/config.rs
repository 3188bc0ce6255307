use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8000";

/// Application configuration loaded from environment variables.
/// Only `PORT` can fail startup; missing service credentials degrade the
/// matching feature instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub analysis_engine_url: String,
    pub database_url: Option<String>,
    pub supabase: Option<SupabaseConfig>,
    pub upload_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let supabase = match (optional_env("SUPABASE_URL"), optional_env("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            _ => None,
        };

        Ok(Config {
            analysis_engine_url: optional_env("ANALYSIS_ENGINE_URL")
                .unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            database_url: optional_env("DATABASE_URL"),
            supabase,
            upload_dir: optional_env("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Called once logging is up, since `from_env` runs before the subscriber exists.
    pub fn warn_on_degraded_features(&self) {
        if self.database_url.is_none() {
            warn!("DATABASE_URL not set, analysis history will be unavailable");
        }
        if self.supabase.is_none() {
            warn!("Supabase credentials not found, authentication will reject all tokens");
        }
    }
}

/// Reads a variable, treating unset and blank the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
