pub mod gemini;
pub mod parser;

use async_trait::async_trait;

use crate::error::AppError;

/// Remote service that infers food names and calories-per-100g from an image.
///
/// Implementations make exactly one round trip per call and return the raw
/// answer text; shaping it into items is the parser's job.
#[async_trait]
pub trait FoodRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, AppError>;
}
