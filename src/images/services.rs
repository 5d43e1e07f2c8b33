use std::io::Cursor;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::AppError;

/// Stable name for an imported photo, keyed by capture time.
pub fn photo_filename(timestamp_ms: i64) -> String {
    format!("photo_{timestamp_ms}.jpg")
}

/// Imports an arbitrary user-picked image into the app-owned photo directory.
///
/// The source is fully decoded and re-encoded as JPEG so that everything past
/// this point can assume `image/jpeg`. Decode and I/O work runs on the
/// blocking pool; a failure imports nothing.
pub async fn import_photo(
    photo_dir: &Path,
    source: &Path,
    timestamp_ms: i64,
) -> Result<PathBuf, AppError> {
    let photo_dir = photo_dir.to_path_buf();
    let source = source.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let src_display = source.display().to_string();
        let bytes = std::fs::read(&source).map_err(|e| AppError::ImageRead {
            path: src_display.clone(),
            source: e,
        })?;
        if bytes.is_empty() {
            return Err(AppError::EmptyImage(src_display));
        }

        let decoded = image::load_from_memory(&bytes).map_err(|e| AppError::ImageDecode {
            path: src_display.clone(),
            source: e,
        })?;

        // JPEG has no alpha channel; flatten before encoding.
        let mut jpeg = Vec::new();
        decoded
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .map_err(|e| AppError::ImageDecode {
                path: src_display.clone(),
                source: e,
            })?;

        std::fs::create_dir_all(&photo_dir).map_err(|e| AppError::ImageRead {
            path: photo_dir.display().to_string(),
            source: e,
        })?;
        let dest = photo_dir.join(photo_filename(timestamp_ms));
        std::fs::write(&dest, &jpeg).map_err(|e| AppError::ImageRead {
            path: dest.display().to_string(),
            source: e,
        })?;

        info!(source = %src_display, dest = %dest.display(), "photo imported");
        Ok(dest)
    })
    .await
    .unwrap_or_else(|e| {
        Err(AppError::ImageRead {
            path: "<blocking task>".into(),
            source: std::io::Error::other(e),
        })
    })
}

/// Raw bytes for the recognizer. An empty file is an error, not an empty call.
pub async fn read_photo_bytes(path: &Path) -> Result<Vec<u8>, AppError> {
    let display = path.display().to_string();
    let bytes = tokio::fs::read(path).await.map_err(|e| AppError::ImageRead {
        path: display.clone(),
        source: e,
    })?;
    if bytes.is_empty() {
        return Err(AppError::EmptyImage(display));
    }
    Ok(bytes)
}
