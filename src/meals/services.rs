use anyhow::Context;
use sqlx::SqlitePool;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::info;

use super::repo;
use crate::error::AppError;
use crate::meals::repo_types::{FoodItem, MealRecord, NewMeal};

/// Calories contributed by one item: rate × grams / 100. An empty or
/// non-numeric grams entry contributes zero; that is user input still in
/// progress, not an error. Grams entries are digit strings, so anything a
/// `u64` cannot parse counts as non-numeric.
pub fn item_calories(calories_per_100g: i64, grams: &str) -> f64 {
    grams
        .trim()
        .parse::<u64>()
        .map(|g| calories_per_100g as f64 * g as f64 / 100.0)
        .unwrap_or(0.0)
}

pub fn total_calories(items: &[FoodItem]) -> f64 {
    items
        .iter()
        .map(|item| item_calories(item.calories, &item.grams))
        .sum()
}

/// Validates and appends a meal. The total is computed here, truncated to an
/// integer, and frozen into the record.
pub async fn save_meal(db: &SqlitePool, meal: NewMeal) -> anyhow::Result<MealRecord> {
    if meal.image_path.is_none() {
        return Err(AppError::InvalidMeal("no image attached").into());
    }
    if meal.items.is_empty() {
        return Err(AppError::InvalidMeal("no recognized foods").into());
    }

    let total = total_calories(&meal.items) as i64;
    let items_json = serde_json::to_string(&meal.items).context("serialize items")?;
    let record = repo::insert(
        db,
        meal.timestamp,
        meal.image_path.as_deref(),
        total,
        &items_json,
    )
    .await?;
    info!(meal_id = record.id, total_calories = total, "meal saved");
    Ok(record)
}

/// Local calendar date of an epoch-millisecond timestamp.
pub fn local_date(timestamp_ms: i64, offset: UtcOffset) -> anyhow::Result<Date> {
    let instant = OffsetDateTime::from_unix_timestamp_nanos(timestamp_ms as i128 * 1_000_000)
        .context("timestamp out of range")?;
    Ok(instant.to_offset(offset).date())
}

/// Derived day grouping of the history view. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub date: Date,
    pub total_calories: i64,
    pub meals: Vec<MealRecord>,
}

/// Partitions records into day buckets keyed by local calendar date.
/// Bucket order follows first appearance in the input (newest-first when fed
/// from `repo::history`); each record lands in exactly one bucket.
pub fn day_buckets(records: &[MealRecord], offset: UtcOffset) -> anyhow::Result<Vec<DayBucket>> {
    let mut buckets: Vec<DayBucket> = Vec::new();
    for record in records {
        let date = local_date(record.timestamp, offset)?;
        match buckets.iter_mut().find(|b| b.date == date) {
            Some(bucket) => {
                bucket.total_calories += record.total_calories;
                bucket.meals.push(record.clone());
            }
            None => buckets.push(DayBucket {
                date,
                total_calories: record.total_calories,
                meals: vec![record.clone()],
            }),
        }
    }
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use time::macros::{date, offset};

    fn item(name: &str, calories: i64, grams: &str) -> FoodItem {
        FoodItem {
            name: name.into(),
            calories,
            grams: grams.into(),
        }
    }

    #[test]
    fn grams_entry_drives_item_calories() {
        assert_eq!(item_calories(52, "100"), 52.0);
        assert_eq!(item_calories(52, "150"), 78.0);
        assert_eq!(item_calories(52, ""), 0.0);
        assert_eq!(item_calories(52, "abc"), 0.0);
        assert_eq!(item_calories(0, "500"), 0.0);
    }

    #[test]
    fn float_like_grams_text_counts_as_non_numeric() {
        // Only plain digit strings are portions; exotic numeric spellings
        // must contribute zero, not infinity or negative totals.
        assert_eq!(item_calories(52, "inf"), 0.0);
        assert_eq!(item_calories(52, "NaN"), 0.0);
        assert_eq!(item_calories(52, "1e3"), 0.0);
        assert_eq!(item_calories(52, "-100"), 0.0);
        assert_eq!(item_calories(52, "1.5"), 0.0);
    }

    #[test]
    fn total_is_the_sum_of_item_calories() {
        let items = vec![item("Apple", 52, "150"), item("Banana", 89, ""), item("Rice", 130, "200")];
        assert_eq!(total_calories(&items), 78.0 + 0.0 + 260.0);
    }

    #[test]
    fn items_json_round_trip_preserves_tuples() {
        let items = vec![item("Apple", 52, "150"), item("Banana", 89, "")];
        let json = serde_json::to_string(&items).unwrap();
        let back: Vec<FoodItem> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, items);
    }

    #[tokio::test]
    async fn save_truncates_the_total_to_an_integer() {
        let pool = db::memory_pool().await;
        // 52 * 55 / 100 = 28.6 -> 28
        let record = save_meal(
            &pool,
            NewMeal {
                timestamp: 1_700_000_000_000,
                image_path: Some("photos/photo_1700000000000.jpg".into()),
                items: vec![item("Apple", 52, "55")],
            },
        )
        .await
        .unwrap();
        assert_eq!(record.total_calories, 28);
    }

    #[tokio::test]
    async fn save_without_image_or_items_is_rejected() {
        let pool = db::memory_pool().await;

        let no_image = save_meal(
            &pool,
            NewMeal {
                timestamp: 0,
                image_path: None,
                items: vec![item("Apple", 52, "100")],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            no_image.downcast_ref::<AppError>(),
            Some(AppError::InvalidMeal(_))
        ));

        let no_items = save_meal(
            &pool,
            NewMeal {
                timestamp: 0,
                image_path: Some("photos/photo_0.jpg".into()),
                items: vec![],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            no_items.downcast_ref::<AppError>(),
            Some(AppError::InvalidMeal(_))
        ));

        assert!(repo::history(&pool).await.unwrap().is_empty());
    }

    fn record(id: i64, timestamp: i64, total: i64) -> MealRecord {
        MealRecord {
            id,
            timestamp,
            image_path: None,
            total_calories: total,
            items_json: "[]".into(),
        }
    }

    #[test]
    fn day_buckets_partition_by_local_date() {
        // 2023-11-14 22:13:20 UTC
        let evening = 1_700_000_000_000;
        let records = vec![
            record(3, evening + 7_200_000, 300), // 2023-11-15 UTC
            record(2, evening, 200),
            record(1, evening - 3_600_000, 100),
        ];

        let buckets = day_buckets(&records, offset!(UTC)).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].date, date!(2023 - 11 - 15));
        assert_eq!(buckets[0].total_calories, 300);
        assert_eq!(buckets[1].date, date!(2023 - 11 - 14));
        assert_eq!(buckets[1].total_calories, 300);
        assert_eq!(buckets[1].meals.len(), 2);

        let spread: usize = buckets.iter().map(|b| b.meals.len()).sum();
        assert_eq!(spread, records.len());
    }

    #[test]
    fn day_grouping_follows_the_local_offset() {
        // 2023-11-14 23:30 UTC is already the 15th at UTC+2.
        let late = 1_700_004_600_000;
        let records = vec![record(1, late, 100)];

        assert_eq!(
            day_buckets(&records, offset!(UTC)).unwrap()[0].date,
            date!(2023 - 11 - 14)
        );
        assert_eq!(
            day_buckets(&records, offset!(+2)).unwrap()[0].date,
            date!(2023 - 11 - 15)
        );
    }
}
