//! Raster sweep state machine.
//!
//! A sweep step is split in two scheduled tasks: `Tick` commands the gimbal to
//! the current grid position, and `Settle`, once the gimbal had time to get
//! there, samples the sensor, appends the point and advances the cursor. Only
//! `Settle` schedules the next `Tick`, so a point is always stored and the
//! cursor moved before the following step can run.

use crate::channel::{ChannelManager, Transport};
use crate::command::{Command, Telemetry};
use crate::config::ScannerConfig;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::store::PointCloudStore;
use crate::sweep::{Advance, SweepCursor};
use crate::task::Task;
use stargazer_data::ScanPoint;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Sweeping,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// `Idle -> Sweeping`
    Started,
    /// `Sweeping -> Idle` on request
    Stopped,
    /// `Sweeping -> Idle` after the last grid position
    Completed,
    /// Any state `-> Idle`, cursor rewound and cloud cleared
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    NotSweeping,
    /// Link down, retried shortly.
    Deferred,
    /// No fresh reading since the previous step.
    Stale,
    /// Motors commanded, sample pending.
    Commanded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleOutcome {
    NotSweeping,
    Appended,
    /// Link went down after the motors were commanded. The step is retried.
    Deferred,
    /// Appended the last point of the sweep.
    Completed,
    /// The reading could not be turned into a distance.
    Discarded,
}

pub struct ScanController {
    state: ScanState,
    cursor: SweepCursor,
    store: PointCloudStore,
    previous_telemetry: Option<Telemetry>,
    pending_tick: Option<TaskHandle>,
    pending_settle: Option<TaskHandle>,
    step_time: Duration,
    settle_time: Duration,
    disconnected_retry: Duration,
}

impl ScanController {
    pub fn new(config: &ScannerConfig) -> Self {
        ScanController {
            state: ScanState::Idle,
            cursor: SweepCursor::new(
                config.pan_range(),
                config.tilt_range(),
                config.pan_step,
                config.tilt_step,
            ),
            store: PointCloudStore::new(),
            previous_telemetry: None,
            pending_tick: None,
            pending_settle: None,
            step_time: config.step_time(),
            settle_time: config.settle_time(),
            disconnected_retry: config.disconnected_retry(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn is_sweeping(&self) -> bool {
        self.state == ScanState::Sweeping
    }

    pub fn pan_angle(&self) -> f64 {
        self.cursor.pan_angle()
    }

    pub fn tilt_angle(&self) -> f64 {
        self.cursor.tilt_angle()
    }

    pub fn cursor(&self) -> &SweepCursor {
        &self.cursor
    }

    pub fn store(&self) -> &PointCloudStore {
        &self.store
    }

    /// Scan button: starts a sweep when idle, stops it when sweeping.
    pub fn start_scan(&mut self, scheduler: &mut Scheduler<Task>) -> Transition {
        match self.state {
            ScanState::Idle => {
                self.state = ScanState::Sweeping;
                self.pending_tick = Some(scheduler.schedule(self.step_time, Task::Tick));
                info!(
                    pan = self.pan_angle(),
                    tilt = self.tilt_angle(),
                    "Sweep started"
                );
                Transition::Started
            }
            ScanState::Sweeping => self.stop(scheduler),
        }
    }

    /// Returns `None` when there was no sweep to stop.
    pub fn stop_scan(&mut self, scheduler: &mut Scheduler<Task>) -> Option<Transition> {
        match self.state {
            ScanState::Idle => None,
            ScanState::Sweeping => Some(self.stop(scheduler)),
        }
    }

    fn stop(&mut self, scheduler: &mut Scheduler<Task>) -> Transition {
        self.cancel_pending(scheduler);
        self.state = ScanState::Idle;
        info!(
            pan = self.pan_angle(),
            tilt = self.tilt_angle(),
            points = self.store.len(),
            "Sweep stopped"
        );
        Transition::Stopped
    }

    pub fn reset(&mut self, scheduler: &mut Scheduler<Task>) -> Transition {
        self.cancel_pending(scheduler);
        self.state = ScanState::Idle;
        self.cursor.rewind();
        self.store.clear();
        info!("Sweep reset");
        Transition::Reset
    }

    fn cancel_pending(&mut self, scheduler: &mut Scheduler<Task>) {
        for handle in [self.pending_tick.take(), self.pending_settle.take()]
            .into_iter()
            .flatten()
        {
            scheduler.cancel(handle);
        }
    }

    pub fn tick<T: Transport>(
        &mut self,
        channel: &mut ChannelManager<T>,
        scheduler: &mut Scheduler<Task>,
    ) -> TickOutcome {
        self.pending_tick = None;
        if self.state != ScanState::Sweeping {
            return TickOutcome::NotSweeping;
        }

        if !channel.is_connected() {
            trace!("Link down, deferring sweep step");
            self.pending_tick = Some(scheduler.schedule(self.disconnected_retry, Task::Tick));
            return TickOutcome::Deferred;
        }

        let latest = channel.latest_reading();
        if latest == self.previous_telemetry.as_ref() {
            trace!("No fresh reading, skipping sweep step");
            self.pending_tick = Some(scheduler.schedule(self.step_time, Task::Tick));
            return TickOutcome::Stale;
        }
        self.previous_telemetry = latest.cloned();

        let (pan, tilt) = (self.pan_angle(), self.tilt_angle());
        channel.send(&Command::pan(pan));
        channel.send(&Command::tilt(tilt));
        self.pending_settle = Some(scheduler.schedule(self.settle_time, Task::Settle));
        TickOutcome::Commanded
    }

    pub fn settle<T: Transport>(
        &mut self,
        channel: &ChannelManager<T>,
        scheduler: &mut Scheduler<Task>,
    ) -> SampleOutcome {
        self.pending_settle = None;
        if self.state != ScanState::Sweeping {
            return SampleOutcome::NotSweeping;
        }

        if !channel.is_connected() {
            trace!("Link down before the sample, retrying the sweep step");
            self.pending_tick = Some(scheduler.schedule(self.disconnected_retry, Task::Tick));
            return SampleOutcome::Deferred;
        }

        // the consumed reading must not be sampled again by the next step
        let latest = channel.latest_reading().cloned();
        let raw = latest.as_ref().and_then(Telemetry::value);
        self.previous_telemetry = latest;

        let (pan, tilt) = (self.pan_angle(), self.tilt_angle());
        let point = raw
            .map(|raw| ScanPoint::from_reading(pan, tilt, raw))
            .filter(|point| point.distance().is_finite());
        let Some(point) = point else {
            warn!(
                pan,
                tilt,
                payload = self.previous_telemetry.as_ref().map(Telemetry::payload),
                "Discarding sample without a usable reading"
            );
            self.schedule_next_tick(scheduler);
            return SampleOutcome::Discarded;
        };

        debug!(pan, tilt, raw = point.raw(), distance = point.distance(), "Point");
        self.store.push(point);

        match self.cursor.advance() {
            Advance::Moved => {
                self.schedule_next_tick(scheduler);
                SampleOutcome::Appended
            }
            Advance::Complete => {
                self.state = ScanState::Idle;
                self.cursor.rewind();
                info!(points = self.store.len(), "Sweep complete");
                SampleOutcome::Completed
            }
        }
    }

    fn schedule_next_tick(&mut self, scheduler: &mut Scheduler<Task>) {
        let delay = self.step_time.saturating_sub(self.settle_time);
        self.pending_tick = Some(scheduler.schedule(delay, Task::Tick));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::tests::RecordingTransport;
    use crate::channel::ChannelEvent;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    struct Rig {
        controller: ScanController,
        channel: ChannelManager<RecordingTransport>,
        scheduler: Scheduler<Task>,
        reading: u32,
    }

    impl Rig {
        fn new(config: ScannerConfig) -> Self {
            let mut rig = Rig {
                controller: ScanController::new(&config),
                channel: ChannelManager::new(RecordingTransport::default(), config.reconnect_backoff()),
                scheduler: Scheduler::new(),
                reading: 1000,
            };
            rig.channel.connect();
            rig.event(ChannelEvent::Opened { epoch: 1 });
            rig
        }

        fn small() -> Self {
            Self::new(ScannerConfig {
                pan_min: 60.,
                pan_max: 62.,
                tilt_min: 0.,
                tilt_max: 2.,
                ..ScannerConfig::default()
            })
        }

        fn event(&mut self, event: ChannelEvent) {
            self.channel.handle_event(event, &mut self.scheduler);
        }

        fn fresh_reading(&mut self) {
            self.reading += 1;
            let epoch = self.channel.epoch();
            self.event(ChannelEvent::Message {
                epoch,
                telemetry: Telemetry::new(self.reading.to_string()),
            });
        }

        /// Runs the next task if it is a sweep task.
        fn step(&mut self) -> Option<Task> {
            let due = self.scheduler.next_deadline()?;
            let task = self.scheduler.pop_due(due)?;
            match task {
                Task::Tick => {
                    self.controller.tick(&mut self.channel, &mut self.scheduler);
                }
                Task::Settle => {
                    self.controller.settle(&self.channel, &mut self.scheduler);
                }
                Task::Reconnect => self.channel.reconnect(),
            }
            Some(task)
        }

        fn frames(&self) -> &[String] {
            &self.channel.transport().frames
        }
    }

    #[test]
    fn test_full_sweep_visits_grid_in_order() {
        let mut rig = Rig::small();
        assert_eq!(rig.controller.start_scan(&mut rig.scheduler), Transition::Started);

        for _ in 0..9 {
            rig.fresh_reading();
            assert_eq!(rig.step(), Some(Task::Tick));
            assert_eq!(rig.step(), Some(Task::Settle));
        }

        let visited: Vec<_> = rig
            .controller
            .store()
            .reader()
            .snapshot()
            .iter()
            .map(|p| (p.pan(), p.tilt()))
            .collect();
        let expected: Vec<_> = (60..=62)
            .flat_map(|p| (0..=2).map(move |t| (p as f64, t as f64)))
            .collect();
        assert_eq!(visited, expected);

        // sweep completion is terminal: nothing is left scheduled
        assert_eq!(rig.controller.state(), ScanState::Idle);
        assert!(rig.scheduler.is_empty());
        let n_frames = rig.frames().len();
        assert_eq!(n_frames, 18);
        rig.fresh_reading();
        assert_eq!(rig.step(), None);
        assert_eq!(rig.frames().len(), n_frames);
    }

    #[test]
    fn test_commands_follow_cursor() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        for _ in 0..4 {
            rig.fresh_reading();
            rig.step();
            rig.step();
        }
        let expected = [
            (60., 0.),
            (60., 1.),
            (60., 2.),
            (61., 0.),
        ]
        .iter()
        .flat_map(|(p, t)| [Command::pan(*p).encode().unwrap(), Command::tilt(*t).encode().unwrap()])
        .collect::<Vec<_>>();
        assert_eq!(rig.frames(), expected.as_slice());
    }

    #[test]
    fn test_step_timing() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        assert_eq!(rig.scheduler.next_deadline(), Some(ms(450)));
        rig.fresh_reading();
        rig.step();
        assert_eq!(rig.scheduler.next_deadline(), Some(ms(460)));
        rig.step();
        assert_eq!(rig.scheduler.next_deadline(), Some(ms(900)));
    }

    #[test]
    fn test_stale_reading_skips_step() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        rig.fresh_reading();
        rig.step();
        rig.step();
        assert_eq!(rig.controller.store().len(), 1);

        // no new reading since the sample
        assert_eq!(rig.scheduler.pop_due(ms(900)), Some(Task::Tick));
        assert_eq!(
            rig.controller.tick(&mut rig.channel, &mut rig.scheduler),
            TickOutcome::Stale
        );
        assert_eq!(rig.controller.store().len(), 1);
        assert_eq!((rig.controller.pan_angle(), rig.controller.tilt_angle()), (60., 1.));
        assert_eq!(rig.frames().len(), 2);

        assert_eq!(rig.scheduler.pop_due(ms(1350)), Some(Task::Tick));
        assert_eq!(
            rig.controller.tick(&mut rig.channel, &mut rig.scheduler),
            TickOutcome::Stale
        );

        rig.fresh_reading();
        assert_eq!(rig.scheduler.pop_due(ms(1800)), Some(Task::Tick));
        assert_eq!(
            rig.controller.tick(&mut rig.channel, &mut rig.scheduler),
            TickOutcome::Commanded
        );
    }

    #[test]
    fn test_no_reading_yet_is_stale() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        assert_eq!(rig.scheduler.pop_due(ms(450)), Some(Task::Tick));
        assert_eq!(
            rig.controller.tick(&mut rig.channel, &mut rig.scheduler),
            TickOutcome::Stale
        );
        assert!(rig.frames().is_empty());
    }

    #[test]
    fn test_disconnect_pauses_and_resumes_in_place() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        for _ in 0..2 {
            rig.fresh_reading();
            rig.step();
            rig.step();
        }
        let position = (rig.controller.pan_angle(), rig.controller.tilt_angle());
        assert_eq!(position, (60., 2.));
        let n_frames = rig.frames().len();

        rig.event(ChannelEvent::Closed { epoch: 1 });
        rig.fresh_reading();

        // the tick keeps deferring while the link is down
        for _ in 0..5 {
            match rig.step() {
                Some(Task::Tick) => {}
                Some(Task::Reconnect) => {
                    let epoch = rig.channel.epoch();
                    assert_eq!(rig.channel.transport().opened.last(), Some(&epoch));
                    rig.event(ChannelEvent::Closed { epoch });
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(rig.frames().len(), n_frames);
        assert_eq!(rig.controller.store().len(), 2);
        assert_eq!((rig.controller.pan_angle(), rig.controller.tilt_angle()), position);

        // reconnect on the newest link, then the sweep picks up where it paused
        while rig.step() != Some(Task::Reconnect) {}
        let epoch = rig.channel.epoch();
        rig.event(ChannelEvent::Opened { epoch });
        rig.fresh_reading();
        while rig.step() != Some(Task::Settle) {}
        let last = rig.controller.store().reader().snapshot().pop().unwrap();
        assert_eq!((last.pan(), last.tilt()), position);
        assert_eq!(rig.frames().len(), n_frames + 2);
    }

    #[test]
    fn test_disconnect_between_command_and_sample() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        rig.fresh_reading();
        assert_eq!(rig.step(), Some(Task::Tick));
        rig.event(ChannelEvent::Closed { epoch: 1 });

        assert_eq!(rig.scheduler.pop_due(ms(460)), Some(Task::Settle));
        assert_eq!(
            rig.controller.settle(&rig.channel, &mut rig.scheduler),
            SampleOutcome::Deferred
        );
        assert!(rig.controller.store().is_empty());
        assert_eq!((rig.controller.pan_angle(), rig.controller.tilt_angle()), (60., 0.));
        assert_eq!(rig.scheduler.next_deadline(), Some(ms(550)));

        // back online, the same pose is commanded and sampled
        assert_eq!(rig.step(), Some(Task::Reconnect));
        rig.event(ChannelEvent::Opened { epoch: 2 });
        rig.fresh_reading();
        assert_eq!(rig.step(), Some(Task::Tick));
        assert_eq!(rig.step(), Some(Task::Settle));
        let cloud = rig.controller.store().reader().snapshot();
        assert_eq!(cloud.len(), 1);
        assert_eq!((cloud[0].pan(), cloud[0].tilt()), (60., 0.));
        assert_eq!(rig.frames().len(), 4);
        assert_eq!(rig.frames()[0..2], rig.frames()[2..4]);
    }

    #[test]
    fn test_deferred_tick_uses_retry_delay() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        rig.event(ChannelEvent::Closed { epoch: 1 });
        assert_eq!(rig.scheduler.pop_due(ms(100)), Some(Task::Reconnect));
        rig.channel.reconnect();
        assert_eq!(rig.scheduler.pop_due(ms(450)), Some(Task::Tick));
        assert_eq!(
            rig.controller.tick(&mut rig.channel, &mut rig.scheduler),
            TickOutcome::Deferred
        );
        assert_eq!(rig.scheduler.next_deadline(), Some(ms(550)));
    }

    #[test]
    fn test_reset() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        for _ in 0..4 {
            rig.fresh_reading();
            rig.step();
            rig.step();
        }
        rig.fresh_reading();
        rig.step();
        // a sample is pending, reset must cancel it
        assert_eq!(rig.scheduler.len(), 1);
        assert_eq!(rig.controller.reset(&mut rig.scheduler), Transition::Reset);
        assert!(rig.scheduler.is_empty());
        assert_eq!(rig.controller.state(), ScanState::Idle);
        assert_eq!((rig.controller.pan_angle(), rig.controller.tilt_angle()), (60., 0.));
        assert!(rig.controller.store().is_empty());

        // reset while idle is the same
        assert_eq!(rig.controller.reset(&mut rig.scheduler), Transition::Reset);
        assert_eq!(rig.controller.state(), ScanState::Idle);
    }

    #[test]
    fn test_start_twice_toggles_and_keeps_points() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        for _ in 0..3 {
            rig.fresh_reading();
            rig.step();
            rig.step();
        }
        assert_eq!(rig.controller.start_scan(&mut rig.scheduler), Transition::Stopped);
        assert_eq!(rig.controller.state(), ScanState::Idle);
        assert!(rig.scheduler.is_empty());
        assert_eq!(rig.controller.store().len(), 3);

        // resumes from where it stopped
        assert_eq!(rig.controller.start_scan(&mut rig.scheduler), Transition::Started);
        rig.fresh_reading();
        rig.step();
        rig.step();
        let last = rig.controller.store().reader().snapshot().pop().unwrap();
        assert_eq!((last.pan(), last.tilt()), (61., 0.));
    }

    #[test]
    fn test_stop_cancels_pending_sample() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        rig.fresh_reading();
        assert_eq!(rig.step(), Some(Task::Tick));
        assert_eq!(rig.controller.stop_scan(&mut rig.scheduler), Some(Transition::Stopped));
        assert!(rig.scheduler.is_empty());
        assert!(rig.controller.store().is_empty());
        assert_eq!(rig.controller.stop_scan(&mut rig.scheduler), None);
    }

    #[test]
    fn test_unusable_reading_is_discarded() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        for payload in ["not a number", "-5"] {
            rig.event(ChannelEvent::Message {
                epoch: 1,
                telemetry: Telemetry::new(payload),
            });
            assert_eq!(rig.step(), Some(Task::Tick));
            assert_eq!(rig.scheduler.pop_due(rig.scheduler.next_deadline().unwrap()), Some(Task::Settle));
            assert_eq!(
                rig.controller.settle(&rig.channel, &mut rig.scheduler),
                SampleOutcome::Discarded
            );
        }
        assert!(rig.controller.store().is_empty());
        assert_eq!((rig.controller.pan_angle(), rig.controller.tilt_angle()), (60., 0.));
        assert_eq!(rig.controller.state(), ScanState::Sweeping);
    }

    #[test]
    fn test_zero_reading_lands_at_origin() {
        let mut rig = Rig::small();
        rig.controller.start_scan(&mut rig.scheduler);
        rig.event(ChannelEvent::Message {
            epoch: 1,
            telemetry: Telemetry::new("0"),
        });
        rig.step();
        rig.step();
        let point = rig.controller.store().reader().snapshot().pop().unwrap();
        assert_eq!(point.distance(), 0.);
        assert_eq!(point.position(), stargazer_data::Cartesian3::ORIGIN);
    }
}
