//! JSON Lines log of individual invocations.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::HarnessError;
use crate::core::schema::{RepetitionRecord, SCHEMA_VERSION};
use crate::core::EnvironmentInfo;

/// Append-only log with one `RepetitionRecord` per monitored invocation.
///
/// The aggregated table only keeps means; this log keeps every repetition so
/// a `failed` row can be traced back to the invocation that caused it.
#[derive(Debug, Clone)]
pub struct RepetitionLog {
    path: PathBuf,
    env: Option<EnvironmentInfo>,
}

impl RepetitionLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        RepetitionLog {
            path: path.as_ref().to_path_buf(),
            env: None,
        }
    }

    /// Stamp every appended record with `env`.
    pub fn with_environment(mut self, env: EnvironmentInfo) -> Self {
        self.env = Some(env);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a single record.
    ///
    /// # Errors
    /// Returns an error on schema version mismatch, I/O failure or
    /// serialization failure.
    pub fn append(&self, record: &RepetitionRecord) -> Result<(), HarnessError> {
        if record.schema_version != SCHEMA_VERSION {
            return Err(HarnessError::Message(format!(
                "schema version mismatch: record has v{}, expected v{}",
                record.schema_version, SCHEMA_VERSION
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| HarnessError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HarnessError::Message(format!("failed to open file: {e}")))?;

        let json = match (&self.env, &record.env) {
            (Some(env), None) => {
                let mut stamped = record.clone();
                stamped.env = Some(env.clone());
                serde_json::to_string(&stamped)
            }
            _ => serde_json::to_string(record),
        }
        .map_err(|e| HarnessError::Message(format!("failed to serialize record: {e}")))?;

        writeln!(file, "{}", json)
            .map_err(|e| HarnessError::Message(format!("failed to write record: {e}")))?;

        Ok(())
    }

    /// Read every record back, skipping blank lines.
    pub fn read_all(&self) -> Result<Vec<RepetitionRecord>, HarnessError> {
        if !self.path.exists() {
            return Err(HarnessError::Message(format!(
                "file not found: {}",
                self.path.display()
            )));
        }

        let file = File::open(&self.path)
            .map_err(|e| HarnessError::Message(format!("failed to open file: {e}")))?;

        let mut records = Vec::new();
        for (line_num, line_result) in BufReader::new(file).lines().enumerate() {
            let line = line_result.map_err(|e| {
                HarnessError::Message(format!("failed to read line {}: {e}", line_num + 1))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record: RepetitionRecord = serde_json::from_str(&line).map_err(|e| {
                HarnessError::Message(format!("failed to parse line {}: {e}", line_num + 1))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}
