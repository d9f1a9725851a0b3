//! Harness configuration: defaults, TOML loading and validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Phase;
use crate::engine::MonitorSettings;
use crate::telemetry::PrometheusConfig;
use crate::telemetry::prometheus::{DEFAULT_QUERY, DEFAULT_URL};
use crate::{HarnessError, HarnessResult};

pub const DEFAULT_CONFIG: &str = "energy-bench.toml";
pub const DEFAULT_OUTPUT: &str = "energy_results.csv";

/// Build and run command lines for one language.
///
/// Both are shell-like strings split with POSIX quoting rules and executed
/// directly (no shell) with the unit directory as working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCommands {
    pub build: String,
    pub run: String,
}

impl Default for LanguageCommands {
    fn default() -> Self {
        LanguageCommands {
            build: "make build".to_string(),
            run: "make run".to_string(),
        }
    }
}

impl LanguageCommands {
    pub fn new(build: impl Into<String>, run: impl Into<String>) -> Self {
        LanguageCommands {
            build: build.into(),
            run: run.into(),
        }
    }

    /// Split the command line for `phase` into program and arguments.
    pub fn argv(&self, phase: Phase) -> HarnessResult<Vec<String>> {
        let line = match phase {
            Phase::Build => &self.build,
            Phase::Run => &self.run,
        };
        let argv = shlex::split(line)
            .ok_or_else(|| HarnessError::Message(format!("unbalanced quoting in command '{line}'")))?;
        if argv.is_empty() {
            return Err(HarnessError::Message(format!("empty {phase} command")));
        }
        Ok(argv)
    }
}

/// Everything the harness needs to know before measuring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Base URL of the Prometheus server
    pub prometheus_url: String,
    /// PromQL expression returning aggregate power in watts
    pub query: String,
    /// Upper bound on one telemetry round trip
    pub telemetry_timeout_secs: f64,
    /// Directory containing one subdirectory per language
    pub root: PathBuf,
    /// Nominal time between power readings
    pub sample_interval_secs: f64,
    /// Host power draw at rest, subtracted from every reading
    pub idle_power_watts: f64,
    /// Number of repetitions of the run phase
    pub runs: usize,
    /// Language directories to scan under `root`
    pub languages: Vec<String>,
    /// Result table path
    pub output: PathBuf,
    /// Optional JSON Lines file with one record per invocation
    pub repetition_log: Option<PathBuf>,
    /// Kill a build or run invocation after this many seconds
    pub run_timeout_secs: Option<f64>,
    /// Only measure this algorithm
    pub only: Option<String>,
    /// Record a failed run row without running when the build failed
    pub skip_run_on_failed_build: bool,
    /// Commands used for languages without an entry in `commands`
    pub default_commands: LanguageCommands,
    /// Per-language command overrides
    pub commands: BTreeMap<String, LanguageCommands>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            prometheus_url: DEFAULT_URL.to_string(),
            query: DEFAULT_QUERY.to_string(),
            telemetry_timeout_secs: 2.0,
            root: PathBuf::from("."),
            sample_interval_secs: 0.1,
            idle_power_watts: 1.8,
            runs: 10,
            languages: ["c", "java", "javascript", "python", "ruby", "rust", "typescript", "zig"]
                .into_iter()
                .map(String::from)
                .collect(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            repetition_log: None,
            run_timeout_secs: None,
            only: None,
            skip_run_on_failed_build: true,
            default_commands: LanguageCommands::default(),
            commands: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Parse a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Message(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> HarnessResult<Self> {
        toml::from_str(s).map_err(|e| HarnessError::Message(format!("invalid config: {e}")))
    }

    /// Load `path` if given, else `energy-bench.toml` if it exists, else defaults.
    pub fn resolve(path: Option<&Path>) -> HarnessResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None if Path::new(DEFAULT_CONFIG).exists() => Self::load(Path::new(DEFAULT_CONFIG)),
            None => Ok(Self::default()),
        }
    }

    /// Reject settings the harness cannot measure with.
    pub fn validate(&self) -> HarnessResult<()> {
        positive_secs("sample_interval_secs", self.sample_interval_secs)?;
        positive_secs("telemetry_timeout_secs", self.telemetry_timeout_secs)?;
        if let Some(t) = self.run_timeout_secs {
            positive_secs("run_timeout_secs", t)?;
        }
        if self.runs == 0 {
            return Err(HarnessError::Message("runs must be at least 1".into()));
        }
        if !self.idle_power_watts.is_finite() || self.idle_power_watts < 0.0 {
            return Err(HarnessError::Message(format!(
                "idle_power_watts must be a non-negative number, got {}",
                self.idle_power_watts
            )));
        }
        if self.languages.is_empty() {
            return Err(HarnessError::Message("no languages configured".into()));
        }
        for lang in &self.languages {
            let cmds = self.commands_for(lang);
            cmds.argv(Phase::Build)?;
            cmds.argv(Phase::Run)?;
        }
        Ok(())
    }

    pub fn commands_for(&self, language: &str) -> &LanguageCommands {
        self.commands.get(language).unwrap_or(&self.default_commands)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sample_interval_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs_f64)
    }

    pub fn prometheus_config(&self) -> PrometheusConfig {
        PrometheusConfig::new(self.prometheus_url.clone())
            .with_query(self.query.clone())
            .with_timeout(Duration::from_secs_f64(self.telemetry_timeout_secs))
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings::new(self.sample_interval(), self.idle_power_watts)
            .with_timeout(self.run_timeout())
    }
}

fn positive_secs(name: &str, value: f64) -> HarnessResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(HarnessError::Message(format!(
            "{name} must be a positive number of seconds, got {value}"
        )))
    }
}
