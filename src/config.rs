use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-2.0-flash:generateContent";

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub photo_dir: PathBuf,
    pub gemini: GeminiConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://mealsnap.db".into());
        let photo_dir = std::env::var("PHOTO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("photos"));
        let gemini = GeminiConfig {
            api_key: std::env::var("GEMINI_API_KEY")
                .context("GEMINI_API_KEY must be set; the key is read from the environment, never embedded")?,
            endpoint: std::env::var("GEMINI_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.into()),
        };
        Ok(Self {
            database_url,
            photo_dir,
            gemini,
        })
    }
}
