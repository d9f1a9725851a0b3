pub mod config;
pub mod core;
pub mod discovery;
pub mod engine;
pub mod storage;
pub mod telemetry;

pub mod discover_cmd;
pub mod measure_cmd;
pub mod monitor_cmd;
pub mod probe_cmd;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

pub(crate) fn now_string() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".to_string())
}
