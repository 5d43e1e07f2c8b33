use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{error, warn};

use crate::error::AppError;
use crate::images;
use crate::meals::services::{self, DayBucket};
use crate::meals::{repo, FoodItem};
use crate::recognizer::parser::parse_food_response;
use crate::session::MealSession;
use crate::state::AppState;

#[derive(Parser)]
#[command(
    name = "mealsnap",
    about = "Photograph a meal, estimate its calories, keep a daily log",
    long_about = "Sends a food photo to a generative vision endpoint, lets you assign gram \
portions to the recognized foods, and appends the finished meal to a local ledger \
browsable by day."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import an image into the photo directory as photo_<millis>.jpg
    Snap {
        /// Any decodable image file
        source: PathBuf,
    },

    /// Recognize foods on a photo, assign portions, optionally save the meal
    Analyze {
        /// Photo to analyze (typically produced by `snap`)
        image: PathBuf,

        /// Portion for one recognized food, e.g. --grams "Apple=150" (repeatable)
        #[arg(long = "grams", value_name = "NAME=GRAMS", value_parser = parse_grams_arg)]
        grams: Vec<(String, String)>,

        /// Append the meal to the ledger after analysis
        #[arg(long)]
        save: bool,
    },

    /// Per-day calorie totals, newest day first
    History,

    /// Meals saved on one local calendar date
    Day {
        /// Date as YYYY-MM-DD
        date: String,
    },

    /// Full detail of one saved meal
    Show { id: i64 },
}

fn parse_grams_arg(raw: &str) -> Result<(String, String), String> {
    let (name, grams) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=GRAMS, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("food name must not be empty".into());
    }
    Ok((name.to_string(), grams.trim().to_string()))
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Result of one analyze invocation, separated from printing for testability.
#[derive(Debug)]
pub struct AnalyzeOutcome {
    pub items: Vec<FoodItem>,
    pub total: f64,
    pub saved_meal_id: Option<i64>,
}

/// Runs capture-attach → recognize → parse → grams → (optional) save as one
/// session. Recognition and save failures propagate; the caller renders them
/// as messages.
pub async fn analyze_meal(
    state: &AppState,
    image: &Path,
    grams: &[(String, String)],
    save: bool,
) -> anyhow::Result<AnalyzeOutcome> {
    let mut session = MealSession::new();
    session.attach_photo(image.to_path_buf())?;

    let bytes = images::read_photo_bytes(image).await?;
    let answer = state.recognizer.recognize(&bytes).await?;
    let items = parse_food_response(&answer);
    session.set_analysis(items)?;

    for (name, value) in grams {
        if !session.set_grams_by_name(name, value)? {
            warn!(food = %name, "grams given for a food the recognizer did not list");
        }
    }

    let mut outcome = AnalyzeOutcome {
        items: session.items().to_vec(),
        total: session.total(),
        saved_meal_id: None,
    };
    if save && !outcome.items.is_empty() {
        let meal = services::save_meal(&state.db, session.finish(now_ms())?).await?;
        session.mark_saved(meal.id);
        outcome.saved_meal_id = Some(meal.id);
    }
    Ok(outcome)
}

fn print_items(items: &[FoodItem], total: f64) {
    for item in items {
        let portion = services::item_calories(item.calories, &item.grams);
        let grams = if item.grams.is_empty() { "-" } else { item.grams.as_str() };
        println!(
            "{:<24} {:>5} kcal/100g  {:>6} g  {:>8.1} kcal",
            item.name, item.calories, grams, portion
        );
    }
    println!("Total: {total:.1} kcal");
}

const DAY_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[day]/[month]/[year]");
const TIME_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[hour]:[minute]");
const DATE_ARG_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

fn print_bucket(bucket: &DayBucket) -> anyhow::Result<()> {
    let plural = if bucket.meals.len() == 1 { "meal" } else { "meals" };
    println!(
        "{}  {:>6} kcal  ({} {})",
        bucket.date.format(DAY_FORMAT)?,
        bucket.total_calories,
        bucket.meals.len(),
        plural
    );
    Ok(())
}

pub async fn run(
    command: Command,
    state: &AppState,
    local_offset: UtcOffset,
) -> anyhow::Result<()> {
    match command {
        Command::Snap { source } => {
            match images::import_photo(&state.config.photo_dir, &source, now_ms()).await {
                Ok(dest) => println!("Imported {}", dest.display()),
                Err(e) => {
                    error!(error = %e, "photo import failed");
                    println!("Could not import photo: {e}");
                }
            }
        }

        Command::Analyze { image, grams, save } => {
            match analyze_meal(state, &image, &grams, save).await {
                Ok(outcome) if outcome.items.is_empty() => {
                    println!("No food detected in image");
                }
                Ok(outcome) => {
                    print_items(&outcome.items, outcome.total);
                    match outcome.saved_meal_id {
                        Some(id) => println!("Saved meal #{id}"),
                        None if save => println!("Nothing to save"),
                        None => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "analysis failed");
                    println!("Analysis failed: {e}");
                }
            }
        }

        Command::History => {
            let records = match repo::history(&state.db).await {
                Ok(records) => records,
                Err(e) => {
                    error!(error = %e, "history query failed");
                    println!("Could not load history: {e:#}");
                    return Ok(());
                }
            };
            let buckets = services::day_buckets(&records, local_offset)?;
            if buckets.is_empty() {
                println!("No meals saved yet");
            }
            for bucket in &buckets {
                print_bucket(bucket)?;
            }
        }

        Command::Day { date } => {
            let Ok(day) = Date::parse(&date, DATE_ARG_FORMAT) else {
                println!("`{date}` is not a date (expected YYYY-MM-DD)");
                return Ok(());
            };
            let records = match repo::history(&state.db).await {
                Ok(records) => records,
                Err(e) => {
                    error!(error = %e, "history query failed");
                    println!("Could not load history: {e:#}");
                    return Ok(());
                }
            };
            let mut shown = 0usize;
            for record in &records {
                if services::local_date(record.timestamp, local_offset)? != day {
                    continue;
                }
                let at = OffsetDateTime::from_unix_timestamp_nanos(
                    record.timestamp as i128 * 1_000_000,
                )?
                .to_offset(local_offset);
                println!(
                    "#{:<5} {}  {:>6} kcal",
                    record.id,
                    at.format(TIME_FORMAT)?,
                    record.total_calories
                );
                shown += 1;
            }
            if shown == 0 {
                println!("No meals on {}", day.format(DAY_FORMAT)?);
            }
        }

        Command::Show { id } => match repo::get(&state.db, id).await {
            Ok(record) => {
                let at = OffsetDateTime::from_unix_timestamp_nanos(
                    record.timestamp as i128 * 1_000_000,
                )?
                .to_offset(local_offset);
                println!("Meal #{}", record.id);
                println!("Saved:  {} {}", at.date().format(DAY_FORMAT)?, at.format(TIME_FORMAT)?);
                if let Some(path) = &record.image_path {
                    println!("Photo:  {path}");
                }
                println!("Total:  {} kcal", record.total_calories);
                let items = record.items()?;
                print_items(&items, services::total_calories(&items));
            }
            Err(AppError::MealNotFound(id)) => println!("Meal {id} not found"),
            Err(e) => {
                error!(error = %e, "meal lookup failed");
                println!("Could not load meal: {e}");
            }
        },
    }
    Ok(())
}
