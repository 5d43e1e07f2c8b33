use clap::Parser;
use time::UtcOffset;
use tracing::warn;

mod cli;
mod config;
mod db;
mod error;
mod images;
mod meals;
mod recognizer;
mod session;
mod state;

use crate::cli::Cli;
use crate::state::AppState;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "mealsnap=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let args = Cli::parse();

    // The local offset must be read before the runtime spawns worker threads;
    // `time` refuses the lookup in a multi-threaded process.
    let local_offset = UtcOffset::current_local_offset().unwrap_or_else(|_| {
        warn!("local UTC offset is indeterminate, day grouping falls back to UTC");
        UtcOffset::UTC
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let state = AppState::init(args.database_url.clone()).await?;
        cli::run(args.command, &state, local_offset).await
    })
}
