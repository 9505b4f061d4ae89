//! Scan controller and point-cloud reconstruction client for a pan/tilt
//! distance-sensor gimbal driven over a WebSocket.

use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::sync::Arc;

mod channel;
mod client_threads;
mod command;
mod config;
mod constants;
mod controller;
mod error;
mod scanner;
mod scheduler;
mod store;
mod sweep;
mod task;
mod teleop;
mod websocket;

pub use crate::channel::{ChannelEvent, ChannelManager, Delivery, Transport};
pub use crate::client_threads::{join, ClientThreads, Request, ScannerHandle};
pub use crate::command::{Command, Telemetry};
pub use crate::config::ScannerConfig;
use crate::constants::{EVENT_QUEUE_SIZE, REQUEST_QUEUE_SIZE};
pub use crate::controller::{SampleOutcome, ScanController, ScanState, TickOutcome, Transition};
pub use crate::error::ScannerError;
pub use crate::scanner::{Scanner, ScannerStatus};
pub use crate::scheduler::{Scheduler, TaskHandle};
pub use crate::store::{PointCloudReader, PointCloudStore};
pub use crate::sweep::{Advance, SweepCursor};
pub use crate::task::Task;
pub use crate::teleop::map_pointer;
pub use crate::websocket::WebSocketTransport;
pub use stargazer_data::{calibrate, to_cartesian, AngleRange, Cartesian3, ScanPoint};

/// Function to launch the scanner client.
///
/// Spawns the event loop that owns the scanner core and connects to
/// `config.gateway()`, reconnecting for as long as the client runs.
/// Dropping the returned [`ClientThreads`] stops the sweep and joins every
/// thread.
pub fn run_client(config: ScannerConfig) -> Result<(ClientThreads, ScannerHandle), ScannerError> {
    config.validate()?;

    let (events_tx, events_rx) = bounded(EVENT_QUEUE_SIZE);
    let (requests_tx, requests_rx) = bounded(REQUEST_QUEUE_SIZE);
    let (terminator_tx, terminator_rx) = bounded(10);

    let transport = WebSocketTransport::new(config.gateway(), events_tx);
    let scanner = Scanner::new(config, transport);
    let status = Arc::new(Mutex::new(scanner.status()));
    let handle = ScannerHandle {
        requests_tx,
        status: Arc::clone(&status),
        cloud: scanner.cloud(),
    };

    let event_loop = std::thread::Builder::new()
        .name("stargazer-event-loop".to_string())
        .spawn(move || {
            client_threads::run_event_loop(scanner, events_rx, requests_rx, terminator_rx, status)
        })
        .map_err(|_| ScannerError::Thread("event loop"))?;

    let client_threads = ClientThreads {
        terminator_tx,
        event_loop: Some(event_loop),
    };
    Ok((client_threads, handle))
}
