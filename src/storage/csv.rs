//! CSV result table.

use std::io::Write;
use std::path::Path;

use crate::HarnessError;
use crate::core::{Results, RunResult};

/// Column headers in output order.
pub const CSV_HEADERS: &[&str] = &["lang", "algorithm", "energy", "type", "duration"];

/// Writes result rows as a flat CSV table.
///
/// Failed rows carry the literal `failed` in the energy column; consumers are
/// expected to filter them out.
#[derive(Debug, Clone, Default)]
pub struct ResultSink;

impl ResultSink {
    pub fn new() -> Self {
        ResultSink
    }

    /// Write `results` to `output`, creating parent directories as needed.
    pub fn write(&self, results: &Results, output: &Path) -> Result<(), HarnessError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| HarnessError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let file = std::fs::File::create(output)
            .map_err(|e| HarnessError::Message(format!("failed to create file: {e}")))?;

        self.write_to_writer(results.rows(), file)
    }

    /// Write rows to any writer, header first, in the given order.
    pub fn write_to_writer<W: Write>(
        &self,
        rows: &[RunResult],
        writer: W,
    ) -> Result<(), HarnessError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(CSV_HEADERS)
            .map_err(|e| HarnessError::Message(format!("failed to write CSV headers: {e}")))?;

        for row in rows {
            csv_writer
                .write_record(row_to_record(row))
                .map_err(|e| HarnessError::Message(format!("failed to write CSV row: {e}")))?;
        }

        csv_writer
            .flush()
            .map_err(|e| HarnessError::Message(format!("failed to flush CSV writer: {e}")))?;

        Ok(())
    }
}

fn row_to_record(row: &RunResult) -> [String; 5] {
    [
        row.language.clone(),
        row.algorithm.clone(),
        row.energy.to_string(),
        row.phase.to_string(),
        format!("{:.4}", row.duration_seconds),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EnergyValue, Phase};

    fn row(lang: &str, alg: &str, phase: Phase, energy: EnergyValue, dur: f64) -> RunResult {
        RunResult {
            language: lang.to_string(),
            algorithm: alg.to_string(),
            phase,
            energy,
            duration_seconds: dur,
        }
    }

    #[test]
    fn test_write_rows_in_order() {
        let rows = vec![
            row("c", "nbody", Phase::Build, EnergyValue::Measured(0.5), 0.25),
            row("c", "nbody", Phase::Run, EnergyValue::Measured(12.0), 3.5),
            row("java", "nbody", Phase::Build, EnergyValue::Failed, 0.1),
        ];
        let mut buffer = Vec::new();
        ResultSink::new().write_to_writer(&rows, &mut buffer).unwrap();

        let out = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "lang,algorithm,energy,type,duration",
                "c,nbody,0.5000,build,0.2500",
                "c,nbody,12.0000,run,3.5000",
                "java,nbody,failed,build,0.1000",
            ]
        );
    }

    #[test]
    fn test_empty_results_header_only() {
        let mut buffer = Vec::new();
        ResultSink::new().write_to_writer(&[], &mut buffer).unwrap();
        let out = String::from_utf8(buffer).unwrap();
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_write_to_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out").join("energy_results.csv");
        let mut results = Results::new();
        results.push(row("ruby", "pidigits", Phase::Run, EnergyValue::Failed, 0.0));

        ResultSink::new().write(&results, &output).unwrap();

        let contents = std::fs::read_to_string(&output).unwrap();
        assert!(contents.starts_with("lang,algorithm,energy,type,duration"));
        assert!(contents.contains("ruby,pidigits,failed,run,0.0000"));
    }
}
