//! Orchestration and aggregation policy with a scripted monitor.

use std::path::PathBuf;

use energy_bench::config::{HarnessConfig, LanguageCommands};
use energy_bench::core::{BenchmarkUnit, EnergyValue, Phase, Results};
use energy_bench::discovery::Catalog;
use energy_bench::engine::{Orchestrator, ScriptedMonitor, ScriptedOutcome};
use energy_bench::storage::RepetitionLog;

fn config(runs: usize) -> HarnessConfig {
    HarnessConfig {
        runs,
        ..Default::default()
    }
}

fn nbody() -> BenchmarkUnit {
    BenchmarkUnit::new("c", "nbody", "/bench/c/nbody")
}

#[test]
fn one_failed_repetition_fails_the_aggregate() {
    let monitor = ScriptedMonitor::new([
        ScriptedOutcome::success(0.5), // build
        ScriptedOutcome::success(10.0),
        ScriptedOutcome::failure(),
        ScriptedOutcome::success(14.0),
    ]);
    let cfg = config(3);
    let orchestrator = Orchestrator::new(&monitor, &cfg);

    let mut results = Results::new();
    orchestrator.run_unit(&nbody(), &mut results);

    let rows = results.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].phase, Phase::Build);
    assert_eq!(rows[0].energy, EnergyValue::Measured(0.5));
    assert_eq!(rows[1].phase, Phase::Run);
    assert_eq!(rows[1].energy, EnergyValue::Failed);
    assert_eq!(monitor.calls().len(), 4);
}

#[test]
fn all_successful_repetitions_are_averaged() {
    let monitor = ScriptedMonitor::new([
        ScriptedOutcome::Success { joules: 10.0, duration_seconds: 1.0 },
        ScriptedOutcome::Success { joules: 12.0, duration_seconds: 2.0 },
        ScriptedOutcome::Success { joules: 14.0, duration_seconds: 3.0 },
    ]);
    let cfg = config(3);
    let orchestrator = Orchestrator::new(&monitor, &cfg);

    let row = orchestrator.run_phase(&nbody());
    assert_eq!(monitor.calls().len(), 3);
    assert_eq!(row.phase, Phase::Run);
    assert_eq!(row.energy, EnergyValue::Measured(12.0));
    assert_eq!(row.duration_seconds, 2.0);
}

#[test]
fn timed_out_repetition_fails_the_aggregate() {
    let monitor = ScriptedMonitor::new([
        ScriptedOutcome::success(5.0),
        ScriptedOutcome::TimedOut { duration_seconds: 30.0 },
    ]);
    let cfg = config(2);
    let orchestrator = Orchestrator::new(&monitor, &cfg);

    let row = orchestrator.run_phase(&nbody());
    assert!(row.energy.is_failed());
    assert_eq!(row.duration_seconds, 1.0);
}

#[test]
fn launch_failure_counts_as_failed_repetition() {
    let monitor = ScriptedMonitor::new([
        ScriptedOutcome::success(1.0),
        ScriptedOutcome::success(10.0),
        ScriptedOutcome::LaunchFailure,
    ]);
    let cfg = config(2);
    let orchestrator = Orchestrator::new(&monitor, &cfg);

    let mut results = Results::new();
    orchestrator.run_unit(&nbody(), &mut results);
    assert!(results.rows()[1].energy.is_failed());
    assert_eq!(results.rows()[1].duration_seconds, 1.0);
}

#[test]
fn failed_build_does_not_block_other_units() {
    let mut catalog = Catalog::new();
    catalog.insert(BenchmarkUnit::new("c", "nbody", "/bench/c/nbody"));
    catalog.insert(BenchmarkUnit::new("java", "nbody", "/bench/java/nbody"));

    // c build fails at launch, everything else succeeds
    let monitor = ScriptedMonitor::new([ScriptedOutcome::LaunchFailure])
        .with_fallback(ScriptedOutcome::success(2.0));
    let cfg = config(2);
    let orchestrator = Orchestrator::new(&monitor, &cfg);

    let mut results = Results::new();
    orchestrator.run_all(&catalog, &mut results);

    let summary: Vec<(String, Phase, bool)> = results
        .rows()
        .iter()
        .map(|r| (r.language.clone(), r.phase, r.energy.is_failed()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("c".to_string(), Phase::Build, true),
            ("c".to_string(), Phase::Run, true),
            ("java".to_string(), Phase::Build, false),
            ("java".to_string(), Phase::Run, false),
        ]
    );
    // c: build only; java: 1 build + 2 runs
    assert_eq!(monitor.calls().len(), 4);
}

#[test]
fn commands_resolved_per_language_in_unit_directory() {
    let mut cfg = config(1);
    cfg.commands.insert(
        "java".to_string(),
        LanguageCommands::new("javac NBody.java", "java NBody 1000"),
    );
    let monitor = ScriptedMonitor::always(ScriptedOutcome::success(1.0));
    let orchestrator = Orchestrator::new(&monitor, &cfg);

    let mut results = Results::new();
    orchestrator.run_unit(&BenchmarkUnit::new("java", "nbody", "/bench/java/nbody"), &mut results);
    orchestrator.run_unit(&nbody(), &mut results);

    let calls = monitor.calls();
    assert_eq!(calls[0].command, vec!["javac", "NBody.java"]);
    assert_eq!(calls[1].command, vec!["java", "NBody", "1000"]);
    assert_eq!(calls[0].working_dir, PathBuf::from("/bench/java/nbody"));
    assert_eq!(calls[2].command, vec!["make", "build"]);
    assert_eq!(calls[3].command, vec!["make", "run"]);
}

#[test]
fn repetition_log_records_every_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let log = RepetitionLog::new(dir.path().join("reps.jsonl"));
    let monitor = ScriptedMonitor::new([
        ScriptedOutcome::success(1.0),
        ScriptedOutcome::success(3.0),
        ScriptedOutcome::LaunchFailure,
    ]);
    let cfg = config(2);
    let orchestrator = Orchestrator::new(&monitor, &cfg).with_repetition_log(&log);

    let mut results = Results::new();
    orchestrator.run_unit(&nbody(), &mut results);

    let records = log.read_all().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].phase, Phase::Build);
    assert_eq!(records[1].repetition, 0);
    assert_eq!(records[1].measurement.as_ref().map(|m| m.joules), Some(3.0));
    assert_eq!(records[2].repetition, 1);
    assert!(records[2].launch_error.is_some());
    assert!(records[2].measurement.is_none());
}
