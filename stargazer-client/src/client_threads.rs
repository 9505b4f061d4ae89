use crate::channel::{ChannelEvent, Transport};
use crate::constants::EVENT_LOOP_IDLE_MS;
use crate::error::ScannerError;
use crate::scanner::{Scanner, ScannerStatus};
use crate::store::PointCloudReader;
use crossbeam_channel::{never, select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// UI action forwarded to the scanner event loop.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Scan button, starts or stops the sweep.
    ToggleScan,
    StopScan,
    Reset,
    Pointer {
        x: f64,
        y: f64,
        view_width: f64,
        view_height: f64,
    },
    ToggleDevice,
    ToggleDebug,
}

/// Struct that contains the client threads.
pub struct ClientThreads {
    pub(crate) terminator_tx: Sender<bool>,
    pub(crate) event_loop: Option<JoinHandle<()>>,
}

/// Cloneable front end of a running scanner, for UI and renderer code.
#[derive(Clone)]
pub struct ScannerHandle {
    pub(crate) requests_tx: Sender<Request>,
    pub(crate) status: Arc<Mutex<ScannerStatus>>,
    pub(crate) cloud: PointCloudReader,
}

impl ScannerHandle {
    pub fn request(&self, request: Request) -> Result<(), ScannerError> {
        self.requests_tx
            .send(request)
            .map_err(|_| ScannerError::ClientStopped)
    }

    pub fn toggle_scan(&self) -> Result<(), ScannerError> {
        self.request(Request::ToggleScan)
    }

    pub fn stop_scan(&self) -> Result<(), ScannerError> {
        self.request(Request::StopScan)
    }

    pub fn reset(&self) -> Result<(), ScannerError> {
        self.request(Request::Reset)
    }

    pub fn pointer(
        &self,
        x: f64,
        y: f64,
        view_width: f64,
        view_height: f64,
    ) -> Result<(), ScannerError> {
        self.request(Request::Pointer {
            x,
            y,
            view_width,
            view_height,
        })
    }

    pub fn toggle_device(&self) -> Result<(), ScannerError> {
        self.request(Request::ToggleDevice)
    }

    pub fn toggle_debug(&self) -> Result<(), ScannerError> {
        self.request(Request::ToggleDebug)
    }

    /// Status as of the last event loop iteration.
    pub fn status(&self) -> ScannerStatus {
        self.status.lock().clone()
    }

    pub fn cloud(&self) -> &PointCloudReader {
        &self.cloud
    }
}

pub(crate) fn run_event_loop<T: Transport>(
    mut scanner: Scanner<T>,
    events_rx: Receiver<ChannelEvent>,
    requests_rx: Receiver<Request>,
    terminator_rx: Receiver<bool>,
    status: Arc<Mutex<ScannerStatus>>,
) {
    let start = Instant::now();
    let idle = Duration::from_millis(EVENT_LOOP_IDLE_MS);
    let no_requests = never();
    let mut ui_open = true;
    scanner.connect();

    loop {
        scanner.run_due(start.elapsed());
        *status.lock() = scanner.status();

        let now = start.elapsed();
        let wait = scanner
            .next_deadline()
            .map_or(idle, |deadline| deadline.saturating_sub(now).min(idle));
        let requests = if ui_open { &requests_rx } else { &no_requests };

        select! {
            recv(terminator_rx) -> _ => break,
            recv(events_rx) -> event => match event {
                Ok(event) => {
                    scanner.run_due(start.elapsed());
                    scanner.handle_channel_event(event);
                }
                Err(_) => {
                    warn!("Channel event queue disconnected");
                    break;
                }
            },
            recv(requests) -> request => match request {
                Ok(request) => {
                    scanner.run_due(start.elapsed());
                    handle_request(&mut scanner, request);
                }
                // no more UI, keep scanning until terminated
                Err(_) => ui_open = false,
            },
            default(wait) => {}
        }
    }

    scanner.stop_scan();
    *status.lock() = scanner.status();
    // a link thread blocked on a full queue must see the receiver go away
    drop(events_rx);
    drop(scanner);
    debug!("Scanner event loop finished");
}

fn handle_request<T: Transport>(scanner: &mut Scanner<T>, request: Request) {
    match request {
        Request::ToggleScan => {
            scanner.start_scan();
        }
        Request::StopScan => {
            scanner.stop_scan();
        }
        Request::Reset => {
            scanner.reset();
        }
        Request::Pointer {
            x,
            y,
            view_width,
            view_height,
        } => {
            scanner.pointer(x, y, view_width, view_height);
        }
        Request::ToggleDevice => {
            scanner.toggle_device();
        }
        Request::ToggleDebug => {
            scanner.toggle_debug();
        }
    }
}

pub(crate) fn do_terminate(terminator_rx: &Receiver<bool>) -> bool {
    terminator_rx.try_recv().unwrap_or(false)
}

/// Function to join client threads.
/// This function is automatically called when `client_threads` is dropped.
pub fn join(client_threads: &mut ClientThreads) {
    let _ = client_threads.terminator_tx.send(true);
    if let Some(thread) = client_threads.event_loop.take() {
        if thread.join().is_err() {
            warn!("Scanner event loop panicked");
        }
    }
}

impl Drop for ClientThreads {
    fn drop(&mut self) {
        join(self);
    }
}
