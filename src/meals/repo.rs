use anyhow::Context;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::meals::repo_types::MealRecord;

pub async fn insert(
    db: &SqlitePool,
    timestamp: i64,
    image_path: Option<&str>,
    total_calories: i64,
    items_json: &str,
) -> anyhow::Result<MealRecord> {
    let record = sqlx::query_as::<_, MealRecord>(
        r#"
        INSERT INTO meals (timestamp, image_path, total_calories, items_json)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, timestamp, image_path, total_calories, items_json
        "#,
    )
    .bind(timestamp)
    .bind(image_path)
    .bind(total_calories)
    .bind(items_json)
    .fetch_one(db)
    .await
    .context("insert meal")?;
    Ok(record)
}

/// All saved meals, most recent first.
pub async fn history(db: &SqlitePool) -> anyhow::Result<Vec<MealRecord>> {
    let rows = sqlx::query_as::<_, MealRecord>(
        r#"
        SELECT id, timestamp, image_path, total_calories, items_json
        FROM meals
        ORDER BY timestamp DESC, id DESC
        "#,
    )
    .fetch_all(db)
    .await
    .context("load meal history")?;
    Ok(rows)
}

pub async fn get(db: &SqlitePool, meal_id: i64) -> Result<MealRecord, AppError> {
    let record = sqlx::query_as::<_, MealRecord>(
        r#"
        SELECT id, timestamp, image_path, total_calories, items_json
        FROM meals
        WHERE id = ?1
        "#,
    )
    .bind(meal_id)
    .fetch_optional(db)
    .await?;
    record.ok_or(AppError::MealNotFound(meal_id))
}
