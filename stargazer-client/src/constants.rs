// Servo software limits of the gimbal, in degrees
pub(crate) const PAN_MIN: f64 = 60.;
pub(crate) const PAN_MAX: f64 = 140.;
pub(crate) const TILT_MIN: f64 = 0.;
pub(crate) const TILT_MAX: f64 = 65.;
pub(crate) const PAN_STEP: f64 = 1.;
pub(crate) const TILT_STEP: f64 = 1.;
pub(crate) const MAX_SWEEP_POSITIONS: usize = 1_000_000;

pub(crate) const SCAN_STEP_TIME_MS: u64 = 450;
pub(crate) const SETTLE_TIME_MS: u64 = 10;
pub(crate) const DISCONNECTED_RETRY_MS: u64 = 100;
pub(crate) const RECONNECT_BACKOFF_MS: u64 = 100;

pub(crate) const GATEWAY_PATH: &str = "/ws";
// Upper bound for a blocking read on the link before the terminator is polled
pub(crate) const LINK_READ_TIMEOUT_MS: u64 = 20;
// Upper bound for an idle wait of the event loop
pub(crate) const EVENT_LOOP_IDLE_MS: u64 = 50;
pub(crate) const REQUEST_QUEUE_SIZE: usize = 64;
pub(crate) const EVENT_QUEUE_SIZE: usize = 256;
pub(crate) const CONNECT_TIMEOUT_MS: u64 = 2000;
pub(crate) const DEFAULT_WS_PORT: u16 = 80;
