use crate::channel::{ChannelEvent, ChannelManager, Delivery, Transport};
use crate::command::{Command, Telemetry};
use crate::config::ScannerConfig;
use crate::controller::{ScanController, ScanState, Transition};
use crate::scheduler::Scheduler;
use crate::store::PointCloudReader;
use crate::task::Task;
use crate::teleop::map_pointer;
use std::time::Duration;
use tracing::trace;

/// Snapshot of the scanner for debug displays.
#[derive(Clone, Debug, PartialEq)]
pub struct ScannerStatus {
    pub connected: bool,
    pub state: ScanState,
    pub pan: f64,
    pub tilt: f64,
    pub points: usize,
    pub latest_reading: Option<String>,
    pub debug: bool,
}

/// Single-threaded scanner core.
///
/// Owns every piece of mutable state. Callers feed it channel events and UI
/// actions, and call [`Scanner::run_due`] with the elapsed time so that
/// deferred work runs. Nothing here blocks or fails.
pub struct Scanner<T: Transport> {
    config: ScannerConfig,
    scheduler: Scheduler<Task>,
    channel: ChannelManager<T>,
    controller: ScanController,
    debug: bool,
}

impl<T: Transport> Scanner<T> {
    pub fn new(config: ScannerConfig, transport: T) -> Self {
        Scanner {
            channel: ChannelManager::new(transport, config.reconnect_backoff()),
            controller: ScanController::new(&config),
            scheduler: Scheduler::new(),
            config,
            debug: true,
        }
    }

    pub fn connect(&mut self) {
        self.channel.connect();
    }

    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        self.channel.handle_event(event, &mut self.scheduler);
    }

    /// Runs every task due at or before `now`, in due order.
    pub fn run_due(&mut self, now: Duration) {
        while let Some(task) = self.scheduler.pop_due(now) {
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::Tick => {
                let outcome = self.controller.tick(&mut self.channel, &mut self.scheduler);
                trace!(?outcome, "Sweep step");
            }
            Task::Settle => {
                let outcome = self.controller.settle(&self.channel, &mut self.scheduler);
                trace!(?outcome, "Sample");
            }
            Task::Reconnect => self.channel.reconnect(),
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    /// Scan button: starts or stops the sweep.
    pub fn start_scan(&mut self) -> Transition {
        self.controller.start_scan(&mut self.scheduler)
    }

    pub fn stop_scan(&mut self) -> Option<Transition> {
        self.controller.stop_scan(&mut self.scheduler)
    }

    pub fn reset(&mut self) -> Transition {
        self.controller.reset(&mut self.scheduler)
    }

    /// Puppeteers the gimbal from a pointer drag. Ignored while sweeping or
    /// disconnected. Returns the commanded pose.
    pub fn pointer(
        &mut self,
        x: f64,
        y: f64,
        view_width: f64,
        view_height: f64,
    ) -> Option<(f64, f64)> {
        if self.controller.is_sweeping() || !self.channel.is_connected() {
            return None;
        }
        let (pan, tilt) = map_pointer(
            x,
            y,
            view_width,
            view_height,
            self.config.pan_range(),
            self.config.tilt_range(),
        )?;
        self.channel.send(&Command::pan(pan));
        self.channel.send(&Command::tilt(tilt));
        Some((pan, tilt))
    }

    pub fn toggle_device(&mut self) -> Delivery {
        self.channel.send(&Command::toggle())
    }

    /// Debug display flag. Has no effect on scanning.
    pub fn toggle_debug(&mut self) -> bool {
        self.debug = !self.debug;
        self.debug
    }

    pub fn status(&self) -> ScannerStatus {
        ScannerStatus {
            connected: self.channel.is_connected(),
            state: self.controller.state(),
            pan: self.controller.pan_angle(),
            tilt: self.controller.tilt_angle(),
            points: self.controller.store().len(),
            latest_reading: self
                .channel
                .latest_reading()
                .map(|t| t.payload().to_string()),
            debug: self.debug,
        }
    }

    pub fn cloud(&self) -> PointCloudReader {
        self.controller.store().reader()
    }

    pub fn latest_reading(&self) -> Option<&Telemetry> {
        self.channel.latest_reading()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn state(&self) -> ScanState {
        self.controller.state()
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        self.channel.transport()
    }
}
