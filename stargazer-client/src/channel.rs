use crate::command::{Command, Telemetry};
use crate::error::ScannerError;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::task::Task;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Byte-level link to the gimbal controller.
///
/// `open` only starts a connection attempt. Its outcome, and everything that
/// arrives afterwards, is reported back as [`ChannelEvent`]s tagged with the
/// same `epoch`.
pub trait Transport {
    fn open(&mut self, epoch: u64);
    fn send(&mut self, frame: String) -> Result<(), ScannerError>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    Opened { epoch: u64 },
    Closed { epoch: u64 },
    Message { epoch: u64, telemetry: Telemetry },
}

impl ChannelEvent {
    pub fn epoch(&self) -> u64 {
        match self {
            ChannelEvent::Opened { epoch }
            | ChannelEvent::Closed { epoch }
            | ChannelEvent::Message { epoch, .. } => *epoch,
        }
    }
}

/// Outcome of a best-effort send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Dropped,
}

pub struct ChannelManager<T: Transport> {
    transport: T,
    epoch: u64,
    connected: bool,
    last_telemetry: Option<Telemetry>,
    reconnect_backoff: Duration,
    pending_reconnect: Option<TaskHandle>,
}

impl<T: Transport> ChannelManager<T> {
    pub fn new(transport: T, reconnect_backoff: Duration) -> Self {
        ChannelManager {
            transport,
            epoch: 0,
            connected: false,
            last_telemetry: None,
            reconnect_backoff,
            pending_reconnect: None,
        }
    }

    /// Starts a new connection attempt, superseding any previous link.
    pub fn connect(&mut self) {
        self.epoch += 1;
        self.connected = false;
        info!(epoch = self.epoch, "Trying to open a connection");
        self.transport.open(self.epoch);
    }

    pub fn handle_event(&mut self, event: ChannelEvent, scheduler: &mut Scheduler<Task>) {
        if event.epoch() != self.epoch {
            trace!(epoch = event.epoch(), current = self.epoch, "Ignoring event of a stale link");
            return;
        }
        match event {
            ChannelEvent::Opened { .. } => {
                self.connected = true;
                info!(epoch = self.epoch, "Connection opened");
            }
            ChannelEvent::Closed { .. } => {
                self.connected = false;
                info!(epoch = self.epoch, "Connection closed");
                self.schedule_reconnect(scheduler);
            }
            ChannelEvent::Message { telemetry, .. } => {
                trace!(payload = telemetry.payload(), "Telemetry");
                self.last_telemetry = Some(telemetry);
            }
        }
    }

    /// Runs a due `Reconnect` task.
    pub fn reconnect(&mut self) {
        self.pending_reconnect = None;
        if self.connected {
            return;
        }
        self.connect();
    }

    fn schedule_reconnect(&mut self, scheduler: &mut Scheduler<Task>) {
        if let Some(handle) = self.pending_reconnect {
            if scheduler.is_pending(handle) {
                return;
            }
        }
        debug!(backoff = ?self.reconnect_backoff, "Scheduling reconnect");
        self.pending_reconnect = Some(scheduler.schedule(self.reconnect_backoff, Task::Reconnect));
    }

    /// Sends `command` if the link is up. Commands are never queued.
    pub fn send(&mut self, command: &Command) -> Delivery {
        if !self.connected {
            trace!(?command, "Dropping command, not connected");
            return Delivery::Dropped;
        }
        let frame = match command.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{e}");
                return Delivery::Dropped;
            }
        };
        match self.transport.send(frame) {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                warn!(?command, "Dropping command: {e}");
                Delivery::Dropped
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn latest_reading(&self) -> Option<&Telemetry> {
        self.last_telemetry.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
