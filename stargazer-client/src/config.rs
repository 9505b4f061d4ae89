//! Runtime configuration of the scanner client.
//!
//! Every field has a default matching the stock gimbal firmware, so an empty
//! TOML document is a valid configuration.

use crate::constants::{
    DISCONNECTED_RETRY_MS, GATEWAY_PATH, MAX_SWEEP_POSITIONS, PAN_MAX, PAN_MIN, PAN_STEP,
    RECONNECT_BACKOFF_MS, SCAN_STEP_TIME_MS, SETTLE_TIME_MS, TILT_MAX, TILT_MIN, TILT_STEP,
};
use crate::error::ScannerError;
use serde::Deserialize;
use stargazer_data::AngleRange;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Host serving the gimbal's WebSocket endpoint.
    pub host: String,
    /// Full endpoint URL. Takes precedence over `host` when set.
    pub url: Option<String>,
    pub pan_min: f64,
    pub pan_max: f64,
    pub tilt_min: f64,
    pub tilt_max: f64,
    pub pan_step: f64,
    pub tilt_step: f64,
    /// Period between two sweep steps.
    pub step_time_ms: u64,
    /// Wait between a motor command and the sample read.
    pub settle_ms: u64,
    /// Retry period of a sweep step while the link is down.
    pub disconnected_retry_ms: u64,
    /// Delay before reopening a closed link.
    pub reconnect_backoff_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            host: "192.168.4.1".to_string(),
            url: None,
            pan_min: PAN_MIN,
            pan_max: PAN_MAX,
            tilt_min: TILT_MIN,
            tilt_max: TILT_MAX,
            pan_step: PAN_STEP,
            tilt_step: TILT_STEP,
            step_time_ms: SCAN_STEP_TIME_MS,
            settle_ms: SETTLE_TIME_MS,
            disconnected_retry_ms: DISCONNECTED_RETRY_MS,
            reconnect_backoff_ms: RECONNECT_BACKOFF_MS,
        }
    }
}

impl ScannerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ScannerError> {
        let config: ScannerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScannerError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The WebSocket endpoint, `ws://<host>/ws` unless `url` is set.
    pub fn gateway(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("ws://{}{}", self.host, GATEWAY_PATH),
        }
    }

    pub fn pan_range(&self) -> AngleRange {
        AngleRange::new(self.pan_min, self.pan_max)
    }

    pub fn tilt_range(&self) -> AngleRange {
        AngleRange::new(self.tilt_min, self.tilt_max)
    }

    pub fn step_time(&self) -> Duration {
        Duration::from_millis(self.step_time_ms)
    }

    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn disconnected_retry(&self) -> Duration {
        Duration::from_millis(self.disconnected_retry_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), ScannerError> {
        validate_axis("pan", self.pan_min, self.pan_max, self.pan_step)?;
        validate_axis("tilt", self.tilt_min, self.tilt_max, self.tilt_step)?;
        let positions = self
            .pan_range()
            .n_steps(self.pan_step)
            .saturating_mul(self.tilt_range().n_steps(self.tilt_step));
        if positions > MAX_SWEEP_POSITIONS {
            return Err(ScannerError::config(format!(
                "sweep grid too large: {positions} positions, at most {MAX_SWEEP_POSITIONS}"
            )));
        }
        if self.step_time_ms == 0 {
            return Err(ScannerError::config("step_time_ms must be positive"));
        }
        if self.settle_ms > self.step_time_ms {
            return Err(ScannerError::config(format!(
                "settle_ms ({}) must not exceed step_time_ms ({})",
                self.settle_ms, self.step_time_ms
            )));
        }
        if self.url.is_none() && self.host.is_empty() {
            return Err(ScannerError::config("either host or url must be set"));
        }
        Ok(())
    }
}

fn validate_axis(name: &str, min: f64, max: f64, step: f64) -> Result<(), ScannerError> {
    if !(min.is_finite() && max.is_finite()) {
        return Err(ScannerError::config(format!("{name} limits must be finite")));
    }
    if min > max {
        return Err(ScannerError::config(format!(
            "{name} limits are inverted: min {min} > max {max}"
        )));
    }
    if !(step.is_finite() && step > 0.) {
        return Err(ScannerError::config(format!(
            "{name} step must be positive, got {step}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = ScannerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScannerConfig::default());
        assert_eq!(config.step_time(), Duration::from_millis(450));
        assert_eq!(config.settle_time(), Duration::from_millis(10));
        assert_eq!(config.pan_range(), AngleRange::new(60., 140.));
        assert_eq!(config.tilt_range(), AngleRange::new(0., 65.));
    }

    #[test]
    fn test_gateway() {
        let mut config = ScannerConfig::from_toml_str("host = \"walle.local\"").unwrap();
        assert_eq!(config.gateway(), "ws://walle.local/ws");
        config.url = Some("ws://127.0.0.1:8080/ws".to_string());
        assert_eq!(config.gateway(), "ws://127.0.0.1:8080/ws");
    }

    #[test]
    fn test_partial_override() {
        let config = ScannerConfig::from_toml_str(
            "pan_min = 80.0\npan_max = 100.0\ntilt_step = 5.0\nstep_time_ms = 200",
        )
        .unwrap();
        assert_eq!(config.pan_range(), AngleRange::new(80., 100.));
        assert_eq!(config.tilt_step, 5.);
        assert_eq!(config.step_time_ms, 200);
        assert_eq!(config.tilt_max, TILT_MAX);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            ScannerConfig::from_toml_str("pan_min = 150.0"),
            Err(ScannerError::Config(_))
        ));
        assert!(matches!(
            ScannerConfig::from_toml_str("tilt_step = 0.0"),
            Err(ScannerError::Config(_))
        ));
        assert!(matches!(
            ScannerConfig::from_toml_str("settle_ms = 500"),
            Err(ScannerError::Config(_))
        ));
        assert!(matches!(
            ScannerConfig::from_toml_str("pan_step = 1e-300"),
            Err(ScannerError::Config(_))
        ));
        assert!(matches!(
            ScannerConfig::from_toml_str("pan_min = \"sixty\""),
            Err(ScannerError::ConfigParse(_))
        ));
    }
}
