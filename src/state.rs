use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::db;
use crate::recognizer::gemini::GeminiRecognizer;
use crate::recognizer::FoodRecognizer;

/// Composition root. Owns the pool, the config and the recognizer handle;
/// consumers receive references instead of reaching for globals.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub recognizer: Arc<dyn FoodRecognizer>,
}

impl AppState {
    pub async fn init(database_url_override: Option<String>) -> anyhow::Result<Self> {
        let mut config = AppConfig::from_env()?;
        if let Some(url) = database_url_override {
            config.database_url = url;
        }
        let config = Arc::new(config);

        let db = db::connect(&config.database_url).await?;
        let recognizer = Arc::new(GeminiRecognizer::new(&config.gemini)) as Arc<dyn FoodRecognizer>;

        Ok(Self {
            db,
            config,
            recognizer,
        })
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        recognizer: Arc<dyn FoodRecognizer>,
    ) -> Self {
        Self {
            db,
            config,
            recognizer,
        }
    }

    #[cfg(test)]
    pub async fn fake(answer: &str) -> Self {
        use async_trait::async_trait;

        use crate::error::AppError;

        struct CannedRecognizer(String);

        #[async_trait]
        impl FoodRecognizer for CannedRecognizer {
            async fn recognize(&self, _image: &[u8]) -> Result<String, AppError> {
                Ok(self.0.clone())
            }
        }

        let db = db::memory_pool().await;
        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            photo_dir: std::env::temp_dir().join("mealsnap-test-photos"),
            gemini: crate::config::GeminiConfig {
                api_key: "test".into(),
                endpoint: "https://example.invalid/generate".into(),
            },
        });
        let recognizer = Arc::new(CannedRecognizer(answer.to_string())) as Arc<dyn FoodRecognizer>;
        Self::from_parts(db, config, recognizer)
    }
}
