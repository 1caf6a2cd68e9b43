use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn app_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("app", "everskies", "everskies")
        .ok_or_else(|| anyhow!("cannot resolve project dirs"))
}

pub fn ensure_data_dir() -> Result<PathBuf> {
    let dirs = app_dirs()?;
    let data_dir = dirs.data_dir().to_path_buf();
    fs::create_dir_all(&data_dir).context("create data dir")?;
    Ok(data_dir)
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(app_dirs()?.config_dir().to_path_buf())
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Stderr plus a daily rolling file. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init_tracing(data_dir: &Path) -> Result<WorkerGuard> {
    let logs = log_dir(data_dir);
    fs::create_dir_all(&logs).context("create log dir")?;

    let appender = tracing_appender::rolling::daily(&logs, "everskies.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("everskies_lib=info,everskies=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()
        .map_err(|e| anyhow!("init tracing: {e}"))?;

    Ok(guard)
}

pub fn now_unix_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

pub fn download_file_name(unix_millis: i128) -> String {
    format!("everskies-character-{unix_millis}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_name_embeds_timestamp() {
        assert_eq!(
            download_file_name(1_700_000_000_123),
            "everskies-character-1700000000123.png"
        );
    }

    #[test]
    fn clock_is_in_milliseconds() {
        // Anything after 2020-01-01 in ms has 13 digits.
        let now = now_unix_millis();
        assert!(now > 1_577_836_800_000);
        assert_eq!(now.to_string().len(), 13);
    }
}
