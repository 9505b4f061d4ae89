use crate::error::ScannerError;
use serde::Serialize;

/// Outbound message understood by the gimbal firmware.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Command {
    Pan {
        val: f64,
    },
    Tilt {
        val: f64,
    },
    /// Toggles the expressive unit on the remote side.
    Toggle {
        value: u8,
    },
}

impl Command {
    pub fn pan(angle: f64) -> Self {
        Command::Pan { val: angle }
    }

    pub fn tilt(angle: f64) -> Self {
        Command::Tilt { val: angle }
    }

    pub fn toggle() -> Self {
        Command::Toggle { value: 0 }
    }

    pub fn encode(&self) -> Result<String, ScannerError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The latest inbound payload, kept verbatim.
///
/// The protocol has no envelope: whatever arrives is the current reading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Telemetry(String);

impl Telemetry {
    pub fn new(payload: impl Into<String>) -> Self {
        Telemetry(payload.into())
    }

    pub fn from_bytes(payload: &[u8]) -> Self {
        Telemetry(String::from_utf8_lossy(payload).into_owned())
    }

    pub fn payload(&self) -> &str {
        &self.0
    }

    /// The payload as a finite number, if it is one.
    pub fn value(&self) -> Option<f64> {
        self.0
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}
