use std::io::Cursor;

use anyhow::Result;
use tracing::info;

use msj_core::{MalformedPolicy, DEFAULT_DELIMITER};
use msj_runtime::init_tracing;
use msj_runtime::metrics::{MetricsRegistry, StageTimer};
use msj_runtime::pipeline::Uninitialized;
use msj_views::TopKConfig;

const USERS: u64 = 100;
const RATINGS: u64 = 1_000;

/// `UserID::Gender::Age::Occupation::Zip-code`
fn synthetic_users() -> String {
    (1..=USERS)
        .map(|id| {
            let gender = if (id * 7) % 3 == 0 { "F" } else { "M" };
            let age = 18 + (id * 13) % 50;
            let occupation = 1 + (id * 5) % 20;
            let zip = 10_000 + (id * 7_919) % 90_000;
            format!("{id}::{gender}::{age}::{occupation}::{zip}\n")
        })
        .collect()
}

/// `UserID::MovieID::Rating::Timestamp`, skewed toward low ids. Ids above
/// `USERS` have no reference entry.
fn synthetic_ratings() -> String {
    (0..RATINGS)
        .map(|i| {
            let user = if i % 97 == 0 {
                USERS + 1 + i % 3
            } else {
                1 + (i * i + 3 * i) % (1 + i % USERS)
            };
            let movie = 1 + (i * 31) % 500;
            let stars = 1 + i % 5;
            let ts = 978_300_760 + i * 60;
            format!("{user}::{movie}::{stars}::{ts}\n")
        })
        .collect()
}

fn main() -> Result<()> {
    init_tracing();
    info!("ratings_demo starting");

    let metrics = MetricsRegistry::default();
    let timer = StageTimer::start();

    let loaded = Uninitialized::new(DEFAULT_DELIMITER, MalformedPolicy::Fail, metrics.clone())
        .load(Cursor::new(synthetic_users()), "synthetic-users")?;
    let stats = loaded.load_stats();
    info!(
        loaded = stats.loaded,
        skipped = stats.skipped,
        overwritten = stats.overwritten,
        "synthetic users loaded"
    );
    let mut aggregating = loaded.start_aggregating();
    aggregating.aggregate(Cursor::new(synthetic_ratings()), "synthetic-ratings")?;
    let finalized = aggregating.finalize(TopKConfig::default().k);

    for record in finalized.output() {
        println!("{}", record.to_text_line());
    }

    let summary = finalized.summary();
    info!(
        results = summary.results,
        highest = summary.highest,
        average = summary.average,
        total = summary.total,
        "ranking summary"
    );
    println!(
        "{}",
        metrics
            .snapshot()
            .to_json_line("ratings_demo", Some(timer.elapsed()))
    );
    Ok(())
}
