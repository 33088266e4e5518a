//! Command-line entry point.
//!
//! Usage: `iati-pipeline <config.json> <activities.json> [lookups.json] [--today YYYY-MM-DD]`

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use iati_core::{ActivityRecord, Config, LookupTables, Month};
use iati_pipeline::{write_outputs, Pipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

struct Args {
    config: PathBuf,
    activities: PathBuf,
    lookups: Option<PathBuf>,
    today: NaiveDate,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut today = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--today" {
            let value = args.next().context("--today needs a date")?;
            let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                .with_context(|| format!("invalid --today date '{}'", value))?;
            today = Some(date);
        } else {
            positional.push(PathBuf::from(arg));
        }
    }

    if positional.len() < 2 || positional.len() > 3 {
        bail!("usage: iati-pipeline <config.json> <activities.json> [lookups.json] [--today YYYY-MM-DD]");
    }
    let mut positional = positional.into_iter();
    Ok(Args {
        config: positional.next().context("missing config path")?,
        activities: positional.next().context("missing activities path")?,
        lookups: positional.next(),
        today: today.unwrap_or_else(|| Utc::now().date_naive()),
    })
}

fn init_tracing() {
    let log_format = std::env::var("IATI_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json().with_current_span(false)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = parse_args()?;

    let config = Config::from_json_file(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;

    let text = std::fs::read_to_string(&args.activities)
        .with_context(|| format!("reading activities {}", args.activities.display()))?;
    let activities: Vec<ActivityRecord> =
        serde_json::from_str(&text).context("parsing activities")?;
    info!("Loaded {} activities", activities.len());

    let mut lookups = match &args.lookups {
        Some(path) => LookupTables::from_json_file(path)
            .with_context(|| format!("loading lookups {}", path.display()))?,
        None => LookupTables::default(),
    }
    .with_default_org(config.lookups.default_org.clone());
    lookups.learn_org_names(&activities);

    let this_month = Month::from_date(args.today);
    let pipeline = Pipeline::new(&config, &lookups);
    let output = pipeline.run(&activities, this_month)?;
    output.stats.log();

    let today = args.today.format("%Y-%m-%d").to_string();
    write_outputs(&today, &config.outputs, &output).context("writing outputs")?;
    Ok(())
}
