//! The session state machine. A [`SessionController`] is either idle or
//! running a test; while running it hands out scheduled goals on a timer,
//! logs tracking error every tick, and keeps the telemetry worker streaming
//! frames to the device.

use crate::config::ExperimentConfig;
use crate::error::TrackerError;
use crate::goal_scheduler::GoalScheduler;
use crate::telemetry::{DeviceMode, SharedLink, TelemetryFrame, TelemetryLink};
use crate::trial_logger::TrialLogger;
use crate::tween::TweenAnimator;

use log::{debug, info};
use rand::{rngs::ThreadRng, Rng};
use std::{path::PathBuf, time::Duration};

/// Bookkeeping for the test in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// When the test started.
    pub start_millis: u64,
    /// When the scheduled goal last changed.
    pub last_goal_change_millis: u64,
}

/// What the front end needs after each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// The animated goal position to draw.
    pub goal: f64,
    /// The scheduled goal position, which is what gets logged.
    pub target: f64,
    /// Whether a test is running.
    pub active: bool,
    /// The frame the telemetry worker will send for this user position.
    pub frame: TelemetryFrame,
}

/// Owns every piece of session state and drives them from the tick loop.
pub struct SessionController<R: Rng = ThreadRng> {
    config: ExperimentConfig,
    scheduler: GoalScheduler<R>,
    animator: TweenAnimator,
    logger: TrialLogger,
    telemetry: TelemetryLink,
    session: Option<Session>,
    sequence_index: u64,
    mode: DeviceMode,
}

impl SessionController<ThreadRng> {
    /// Instantiates an idle controller. With `link` set to `None`, telemetry
    /// is silently disabled.
    pub fn new(config: ExperimentConfig, link: Option<SharedLink>) -> Self {
        Self::with_scheduler(config, link, GoalScheduler::new())
    }
}

impl<R: Rng> SessionController<R> {
    /// Instantiates an idle controller around a specific scheduler, which is
    /// how tests get a seeded goal order.
    pub fn with_scheduler(
        config: ExperimentConfig,
        link: Option<SharedLink>,
        scheduler: GoalScheduler<R>,
    ) -> Self {
        let animator = TweenAnimator::new(config.tween_duration_ms, config.easing_exponent);
        let telemetry =
            TelemetryLink::new(link, Duration::from_millis(config.telemetry_interval_ms));

        Self {
            config,
            scheduler,
            animator,
            logger: TrialLogger::new(),
            telemetry,
            session: None,
            sequence_index: 1,
            mode: DeviceMode::default(),
        }
    }

    /// Start a test. Returns `false` without doing anything if a test is
    /// already running or if no goals could be scheduled.
    pub fn activate(&mut self, now_millis: u64) -> bool {
        if self.session.is_some() {
            debug!("Test {} already running", self.sequence_index);
            return false;
        }

        self.scheduler.repopulate(
            self.config.trials_per_test,
            self.config.goal_min,
            self.config.goal_max,
        );
        let Ok(first_goal) = self.scheduler.next() else {
            debug!("No goals scheduled, not starting a test");
            return false;
        };

        self.animator.set_immediate(first_goal);
        self.session = Some(Session {
            start_millis: now_millis,
            last_goal_change_millis: now_millis,
        });
        self.logger.begin();
        self.telemetry.start();

        info!(
            "Test {} started with {} goals, first at {:.3}",
            self.sequence_index, self.config.trials_per_test, first_goal
        );
        true
    }

    /// Advance one frame. While a test runs this logs a row, moves on to the
    /// next scheduled goal when its interval is up, and ends the test once
    /// the goals run out. An error here can only come from ending the test.
    pub fn tick(&mut self, now_millis: u64, user_value: f64) -> Result<TickReport, TrackerError> {
        self.telemetry.set_user_value(user_value);

        if let Some(session) = self.session {
            self.logger.record(
                now_millis.saturating_sub(session.start_millis),
                user_value,
                self.animator.target(),
            );

            let since_change = now_millis.saturating_sub(session.last_goal_change_millis);
            if since_change > self.config.goal_interval_ms {
                match self.scheduler.next() {
                    Ok(goal) => {
                        debug!("Goal changed to {:.3} at {} ms", goal, now_millis);
                        self.animator.begin_tween(goal, now_millis);
                        self.session = Some(Session {
                            last_goal_change_millis: now_millis,
                            ..session
                        });
                    }
                    Err(TrackerError::Exhausted) => {
                        self.deactivate(now_millis)?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(TickReport {
            goal: self.animator.tick(now_millis),
            target: self.animator.target(),
            active: self.session.is_some(),
            frame: TelemetryFrame::from_user_value(user_value),
        })
    }

    /// End the running test: stop telemetry (the device is left at rest),
    /// write the trial log, and bump the sequence number. Does nothing when
    /// idle. The test ends even if the log cannot be written; the write error
    /// is returned. On success, returns the path of the log.
    pub fn deactivate(&mut self, now_millis: u64) -> Result<Option<PathBuf>, TrackerError> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };

        let stopped = self.telemetry.stop();
        let index = self.sequence_index;
        self.sequence_index += 1;
        info!(
            "Test {} ended after {} ms",
            index,
            now_millis.saturating_sub(session.start_millis)
        );

        let path = self.logger.flush(&self.config.log_prefix, index)?;
        stopped?;
        Ok(Some(path))
    }

    /// Start a test if idle, stop it if running.
    pub fn toggle(&mut self, now_millis: u64) -> Result<Option<PathBuf>, TrackerError> {
        if self.is_active() {
            self.deactivate(now_millis)
        } else {
            self.activate(now_millis);
            Ok(None)
        }
    }

    /// Animate to a random position. Works in any state and leaves the
    /// scheduled sequence alone.
    pub fn request_random_goal(&mut self, now_millis: u64) {
        let goal = self.scheduler.pick_random();
        debug!("Jumping to random goal {:.3}", goal);
        self.animator.begin_tween(goal, now_millis);
    }

    /// Switch the device mode. The mode byte goes out immediately.
    pub fn set_mode(&mut self, mode: DeviceMode) {
        info!("Device mode set to {:?}", mode);
        self.mode = mode;
        self.telemetry.send_mode(mode);
    }

    /// Bring the device to rest right away.
    pub fn reset_device(&self) {
        self.telemetry.send_reset();
    }

    /// Whether a test is running.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Bookkeeping of the running test, if any.
    pub fn session(&self) -> Option<Session> {
        self.session
    }

    /// The number the next completed test's log will carry.
    pub fn sequence_index(&self) -> u64 {
        self.sequence_index
    }

    /// Scheduled goals not yet shown in this test.
    pub fn goals_remaining(&self) -> usize {
        self.scheduler.remaining()
    }

    /// The last mode sent to the device.
    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// The animated goal position.
    pub fn current_goal(&self) -> f64 {
        self.animator.current()
    }

    /// The goal position being animated towards.
    pub fn target_goal(&self) -> f64 {
        self.animator.target()
    }

    /// Whether the goal is still animating.
    pub fn is_tweening(&self) -> bool {
        self.animator.is_active()
    }

    /// Whether telemetry has somewhere to go.
    pub fn has_device(&self) -> bool {
        self.telemetry.has_device()
    }

    /// Whether the telemetry worker is running.
    pub fn is_streaming(&self) -> bool {
        self.telemetry.is_running()
    }

    /// The parameters this controller runs with.
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// The trial log of the running test.
    pub fn logger(&self) -> &TrialLogger {
        &self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_message_decoder::DeviceCommand;
    use crate::dummy_link::DummyLink;
    use crate::telemetry::share_link;
    use rand::{rngs::StdRng, SeedableRng};
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, trials: usize) -> ExperimentConfig {
        ExperimentConfig {
            trials_per_test: trials,
            goal_min: 0.2,
            goal_max: 0.8,
            goal_interval_ms: 1000,
            telemetry_interval_ms: 10,
            log_prefix: dir.path().join("run").to_string_lossy().into_owned(),
            ..ExperimentConfig::default()
        }
    }

    fn controller(
        config: ExperimentConfig,
        dummy: &DummyLink,
    ) -> SessionController<StdRng> {
        SessionController::with_scheduler(
            config,
            Some(share_link(dummy.clone())),
            GoalScheduler::with_rng(StdRng::seed_from_u64(11)),
        )
    }

    fn rest_frames(dummy: &DummyLink) -> usize {
        dummy
            .commands()
            .iter()
            .filter(|c| **c == DeviceCommand::Intensity(TelemetryFrame::REST))
            .count()
    }

    #[test]
    fn full_session_runs_to_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let dummy = DummyLink::new();
        let mut ctl = controller(config_in(&dir, 3), &dummy);

        assert!(ctl.activate(0));
        assert!(ctl.is_active());
        assert!(ctl.is_streaming());
        assert!(!ctl.is_tweening());
        assert_eq!(ctl.goals_remaining(), 2);

        let mut targets = vec![ctl.target_goal()];
        assert_eq!(ctl.current_goal(), targets[0]);

        let mut now = 0;
        while ctl.is_active() {
            now += 100;
            let report = ctl.tick(now, 0.5).unwrap();
            if report.active && report.target != *targets.last().unwrap() {
                targets.push(report.target);
            }
            assert!(now < 10_000, "session never ended");
        }

        // goals change at 1100 and 2200, the queue runs dry at 3300
        assert_eq!(now, 3300);
        assert!(!ctl.is_streaming());
        assert_eq!(ctl.sequence_index(), 2);

        targets.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(targets.len(), 3);
        for (got, want) in targets.iter().zip([0.2, 0.5, 0.8]) {
            assert!((got - want).abs() < 1e-9);
        }

        let text = fs::read_to_string(dir.path().join("run_1.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Time,Current,Target,Error");
        assert_eq!(lines.len(), 1 + 33);
        assert!(lines[1].starts_with("100,0.5,"));

        assert_eq!(rest_frames(&dummy), 1);
        assert_eq!(
            dummy.commands().last(),
            Some(&DeviceCommand::Intensity(TelemetryFrame::REST))
        );
    }

    #[test]
    fn goal_change_starts_a_tween() {
        let dir = tempfile::tempdir().unwrap();
        let dummy = DummyLink::new();
        let mut ctl = controller(config_in(&dir, 3), &dummy);
        ctl.activate(0);

        let first = ctl.target_goal();
        ctl.tick(1000, 0.5).unwrap();
        assert_eq!(ctl.target_goal(), first);

        let report = ctl.tick(1001, 0.5).unwrap();
        assert_ne!(report.target, first);
        assert!(ctl.is_tweening());
        assert_eq!(ctl.session().unwrap().last_goal_change_millis, 1001);

        let report = ctl.tick(1300, 0.5).unwrap();
        assert_eq!(report.goal, report.target);
        assert!(!ctl.is_tweening());

        ctl.deactivate(1300).unwrap();
    }

    #[test]
    fn activate_twice_keeps_one_worker() {
        let dir = tempfile::tempdir().unwrap();
        let dummy = DummyLink::new();
        let mut ctl = controller(config_in(&dir, 3), &dummy);

        assert!(ctl.activate(0));
        assert!(!ctl.activate(10));
        assert_eq!(ctl.session().unwrap().start_millis, 0);

        ctl.deactivate(20).unwrap();
        assert_eq!(rest_frames(&dummy), 1);
    }

    #[test]
    fn deactivate_when_idle_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let dummy = DummyLink::new();
        let mut ctl = controller(config_in(&dir, 3), &dummy);

        assert!(matches!(ctl.deactivate(0), Ok(None)));
        assert_eq!(ctl.sequence_index(), 1);
        assert!(dummy.sent().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        ctl.activate(0);
        let path = ctl.deactivate(5).unwrap().unwrap();
        assert!(path.exists());
        assert!(matches!(ctl.deactivate(6), Ok(None)));
        assert_eq!(ctl.sequence_index(), 2);
        assert_eq!(rest_frames(&dummy), 1);
    }

    #[test]
    fn logs_are_numbered_per_test() {
        let dir = tempfile::tempdir().unwrap();
        let dummy = DummyLink::new();
        let mut ctl = controller(config_in(&dir, 2), &dummy);

        for _ in 0..3 {
            ctl.toggle(0).unwrap();
            ctl.tick(16, 0.3).unwrap();
            ctl.toggle(32).unwrap();
        }

        for i in 1..=3 {
            assert!(dir.path().join(format!("run_{i}.csv")).exists());
        }
        assert_eq!(rest_frames(&dummy), 3);
    }

    #[test]
    fn zero_trials_never_starts() {
        let dir = tempfile::tempdir().unwrap();
        let dummy = DummyLink::new();
        let mut ctl = controller(config_in(&dir, 0), &dummy);

        assert!(!ctl.activate(0));
        assert!(!ctl.is_active());
        assert!(!ctl.is_streaming());
        assert!(!ctl.logger().is_recording());
        assert!(!ctl.tick(5000, 0.5).unwrap().active);
    }

    #[test]
    fn random_goal_leaves_schedule_alone() {
        let dir = tempfile::tempdir().unwrap();
        let dummy = DummyLink::new();
        let mut ctl = controller(config_in(&dir, 3), &dummy);

        // idle: only the animation moves
        ctl.request_random_goal(0);
        assert!(ctl.is_tweening());
        assert!((0.0..1.0).contains(&ctl.target_goal()));
        ctl.tick(50, 0.5).unwrap();
        assert!(!ctl.logger().is_recording());

        // running: the goal timer is not reset
        ctl.activate(1000);
        ctl.request_random_goal(1500);
        assert_eq!(ctl.goals_remaining(), 2);
        assert_eq!(ctl.session().unwrap().last_goal_change_millis, 1000);
        ctl.deactivate(1600).unwrap();
    }

    #[test]
    fn logs_the_target_not_the_animation() {
        let dir = tempfile::tempdir().unwrap();
        let dummy = DummyLink::new();
        let mut ctl = controller(config_in(&dir, 3), &dummy);
        ctl.activate(0);
        ctl.tick(1001, 0.5).unwrap();
        let target = ctl.target_goal();

        // mid-tween, the drawn goal lags the target
        let report = ctl.tick(1050, 0.5).unwrap();
        assert_ne!(report.goal, target);

        let row = ctl.logger().rows().last().unwrap().clone();
        assert_eq!(row[2], target.to_string());
        ctl.deactivate(1100).unwrap();
    }

    #[test]
    fn flush_failure_still_ends_test() {
        let dummy = DummyLink::new();
        let config = ExperimentConfig {
            trials_per_test: 2,
            log_prefix: "/definitely/not/a/dir/run".to_owned(),
            ..ExperimentConfig::default()
        };
        let mut ctl = controller(config, &dummy);

        ctl.activate(0);
        assert!(matches!(ctl.deactivate(10), Err(TrackerError::IoError(_))));
        assert!(!ctl.is_active());
        assert!(!ctl.is_streaming());
        assert_eq!(rest_frames(&dummy), 1);
    }

    #[test]
    fn mode_and_reset_go_out_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let dummy = DummyLink::new();
        let mut ctl = controller(config_in(&dir, 3), &dummy);

        ctl.set_mode(DeviceMode::Frequency);
        assert_eq!(ctl.mode(), DeviceMode::Frequency);
        ctl.reset_device();
        ctl.set_mode(DeviceMode::Intensity);

        assert_eq!(dummy.sent(), b"F{000;000}I".to_vec());
    }

    #[test]
    fn works_without_a_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = SessionController::new(config_in(&dir, 2), None);

        assert!(!ctl.has_device());
        assert!(ctl.activate(0));
        assert!(!ctl.is_streaming());
        ctl.set_mode(DeviceMode::Frequency);
        let report = ctl.tick(10, 1.0).unwrap();
        assert_eq!(report.frame.to_string(), "{255;000}");
        assert!(ctl.deactivate(20).unwrap().is_some());
    }
}
