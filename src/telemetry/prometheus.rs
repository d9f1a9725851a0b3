//! Prometheus instant-query power source.

use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{HarnessError, HarnessResult};

use super::traits::{PowerReading, PowerSource};

/// Default query: sum of per-sensor voltage x current, ignoring the sensor id label.
pub const DEFAULT_QUERY: &str = "sum(pi5_volt * ignoring(id) pi5_current)";

pub const DEFAULT_URL: &str = "http://localhost:9090";

/// Configuration for the Prometheus power source.
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Base URL of the Prometheus server (without `/api/v1/query`)
    pub base_url: String,
    /// PromQL expression evaluating to a single scalar power value
    pub query: String,
    /// Upper bound on a single round trip
    pub timeout: Duration,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        PrometheusConfig {
            base_url: DEFAULT_URL.to_string(),
            query: DEFAULT_QUERY.to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

impl PrometheusConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        PrometheusConfig {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full instant-query endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/api/v1/query", self.base_url.trim_end_matches('/'))
    }
}

/// Power source backed by a Prometheus `/api/v1/query` endpoint.
pub struct PrometheusClient {
    config: PrometheusConfig,
    http: reqwest::blocking::Client,
}

impl PrometheusClient {
    pub fn new(config: PrometheusConfig) -> HarnessResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HarnessError::Message(format!("failed to build HTTP client: {e}")))?;
        Ok(PrometheusClient { config, http })
    }

    pub fn config(&self) -> &PrometheusConfig {
        &self.config
    }

    fn query_watts(&self) -> anyhow::Result<f64> {
        let response = self
            .http
            .get(self.config.endpoint())
            .query(&[("query", self.config.query.as_str())])
            .send()
            .context("request failed")?
            .error_for_status()
            .context("non-success status")?;
        let body: QueryResponse = response.json().context("malformed query response")?;
        watts_from_response(body)
    }
}

impl PowerSource for PrometheusClient {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn sample(&self) -> PowerReading {
        match self.query_watts() {
            Ok(watts) => {
                debug!(watts, "power reading");
                PowerReading::ok(watts)
            }
            Err(e) => {
                warn!(endpoint = %self.config.endpoint(), "power reading degraded: {e:#}");
                PowerReading::degraded()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<QuerySample>,
}

#[derive(Debug, Deserialize)]
struct QuerySample {
    /// `[<unix timestamp>, "<value>"]`
    value: (f64, String),
}

/// Extract the first result's value from an instant-query response body.
///
/// Errors on malformed JSON, an empty result list, or a value that is not a
/// finite non-negative number.
pub fn parse_power_response(body: &str) -> anyhow::Result<f64> {
    let response: QueryResponse =
        serde_json::from_str(body).context("malformed query response")?;
    watts_from_response(response)
}

fn watts_from_response(response: QueryResponse) -> anyhow::Result<f64> {
    let first = response
        .data
        .result
        .first()
        .ok_or_else(|| anyhow!("empty result set"))?;
    let watts: f64 = first
        .value
        .1
        .trim()
        .parse()
        .with_context(|| format!("non-numeric value '{}'", first.value.1))?;
    if !watts.is_finite() || watts < 0.0 {
        bail!("implausible power value {watts}");
    }
    Ok(watts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{},"value":[1718000000.123,"4.25"]}]}}"#;
        assert_eq!(parse_power_response(body).unwrap(), 4.25);
    }

    #[test]
    fn test_parse_uses_first_result() {
        let body = r#"{"data":{"result":[{"value":[1.0,"3.5"]},{"value":[1.0,"9.0"]}]}}"#;
        assert_eq!(parse_power_response(body).unwrap(), 3.5);
    }

    #[test]
    fn test_parse_empty_result_fails() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
        let err = parse_power_response(body).unwrap_err();
        assert!(err.to_string().contains("empty result set"));
    }

    #[test]
    fn test_parse_error_status_fails() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#;
        assert!(parse_power_response(body).is_err());
    }

    #[test]
    fn test_parse_non_numeric_fails() {
        let body = r#"{"data":{"result":[{"value":[1.0,"NaN"]}]}}"#;
        assert!(parse_power_response(body).is_err());
        let body = r#"{"data":{"result":[{"value":[1.0,"abc"]}]}}"#;
        assert!(parse_power_response(body).is_err());
    }

    #[test]
    fn test_parse_negative_fails() {
        let body = r#"{"data":{"result":[{"value":[1.0,"-1.5"]}]}}"#;
        assert!(parse_power_response(body).is_err());
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let config = PrometheusConfig::new("http://pi.local:9090/");
        assert_eq!(config.endpoint(), "http://pi.local:9090/api/v1/query");
    }

    #[test]
    fn test_config_builder() {
        let config = PrometheusConfig::new("http://host:9090")
            .with_query("sum(rapl_watts)")
            .with_timeout(Duration::from_millis(500));
        assert_eq!(config.query, "sum(rapl_watts)");
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_unreachable_endpoint_degrades() {
        // Port 1 is reserved and refuses connections on loopback.
        let config =
            PrometheusConfig::new("http://127.0.0.1:1").with_timeout(Duration::from_millis(500));
        let client = PrometheusClient::new(config).unwrap();
        let reading = client.sample();
        assert_eq!(reading.watts, 0.0);
        assert!(reading.is_degraded());
    }
}
