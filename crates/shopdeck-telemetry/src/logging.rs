use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "shopdeck.client";

/// Local structured logging for the client process: compact console output
/// plus a daily-rolling JSONL file. Expired files are removed at startup.
pub fn init_client_logging(logs_dir: &Path, retention_days: u64) -> anyhow::Result<WorkerGuard> {
    fs::create_dir_all(logs_dir)?;
    remove_expired_logs(logs_dir, retention_days)?;

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("jsonl")
        .build(logs_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_current_span(false)
        .with_span_list(false);

    let console_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_ansi(true);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    Ok(guard)
}

fn remove_expired_logs(logs_dir: &Path, retention_days: u64) -> anyhow::Result<()> {
    let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
    for entry in fs::read_dir(logs_dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date) = rolled_file_date(name) {
            let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
                continue;
            };
            if DateTime::<Utc>::from_naive_utc_and_offset(midnight, Utc) < cutoff {
                let _ = fs::remove_file(path);
            }
        }
    }
    Ok(())
}

// expected: shopdeck.client.YYYY-MM-DD.jsonl
fn rolled_file_date(name: &str) -> Option<NaiveDate> {
    let prefix = format!("{LOG_FILE_PREFIX}.");
    if !name.starts_with(&prefix) || !name.ends_with(".jsonl") {
        return None;
    }
    let date_part = name.trim_start_matches(&prefix).trim_end_matches(".jsonl");
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
