use crate::{
    classify::{PoseClass, TargetPose},
    detection::{Cycle, DetectionLoop, LoopStats},
    error::Error,
    session::{SessionHandle, SessionSnapshot},
};
use crossbeam::channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    convert::TryFrom,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};
use tracing::info;

const ESCAPE_KEY: i32 = 27;

/// What a key press in the display window asks the view to do.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Select(TargetPose),
}

impl Command {
    /// `q` or escape quits; `1`..`7` pick a target pose in menu order.
    pub fn from_key(key: i32) -> Option<Self> {
        if key == ESCAPE_KEY || key == i32::from(b'q') {
            return Some(Command::Quit);
        }
        let index = usize::try_from(key.checked_sub(i32::from(b'1'))?).ok()?;
        PoseClass::TARGETS
            .get(index)
            .and_then(|&class| TargetPose::new(class).ok())
            .map(Command::Select)
    }
}

/// Somewhere to show the reference picture of the pose being practiced.
pub trait ReferenceDisplay {
    fn show(&mut self, target: TargetPose) -> Result<(), Error>;
}

pub fn status_line(snapshot: &SessionSnapshot) -> String {
    format!(
        "Pose Time: {:.1} s | Best: {:.1} s",
        snapshot.elapsed.as_secs_f64(),
        snapshot.best.as_secs_f64()
    )
}

/// The practice screen for one target pose: owns the detection loop and
/// reports hold times while it runs.
pub struct SessionView<P: Cycle> {
    session: SessionHandle,
    detection: DetectionLoop<P>,
    spinner: Option<ProgressBar>,
    keys: Option<Receiver<i32>>,
    reference: Option<Box<dyn ReferenceDisplay>>,
}

impl<P: Cycle> SessionView<P> {
    pub fn new(session: SessionHandle, detection: DetectionLoop<P>) -> Self {
        Self {
            session,
            detection,
            spinner: None,
            keys: None,
            reference: None,
        }
    }

    /// Show the hold times in a terminal spinner.
    pub fn with_spinner(mut self) -> Self {
        self.spinner = Some(
            ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{prefix:.bold.dim} {spinner} {wide_msg}"),
            ),
        );
        self
    }

    /// Handle key presses forwarded from a display window.
    pub fn with_keys(mut self, keys: Receiver<i32>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Show the reference picture of the target pose, switching it with the target.
    pub fn with_reference<R>(mut self, reference: R) -> Self
    where
        R: ReferenceDisplay + 'static,
    {
        self.reference = Some(Box::new(reference));
        self
    }

    fn show_reference(&mut self, target: TargetPose) -> Result<(), Error> {
        match self.reference.as_mut() {
            Some(reference) => reference.show(target),
            None => Ok(()),
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn stats(&self) -> LoopStats {
        self.detection.stats()
    }

    pub fn is_active(&self) -> bool {
        self.detection.is_active()
    }

    pub fn start(&mut self) -> Result<(), Error> {
        self.detection.start()?;
        let target = self.session.snapshot()?.target;
        self.show_reference(target)?;
        info!(message = "session started", pose = %target);
        if let Some(spinner) = self.spinner.as_ref() {
            spinner.set_prefix(target.to_string());
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), Error> {
        self.detection.stop()?;
        let snapshot = self.session.snapshot()?;
        info!(
            message = "session stopped",
            pose = %snapshot.target,
            best_secs = snapshot.best.as_secs_f64()
        );
        Ok(())
    }

    /// Switch to another target pose, resetting all hold times.
    pub fn select_pose(&mut self, target: TargetPose) -> Result<(), Error> {
        self.session.select_pose(target)?;
        self.show_reference(target)?;
        info!(message = "selected pose", pose = %target);
        if let Some(spinner) = self.spinner.as_ref() {
            spinner.set_prefix(target.to_string());
        }
        Ok(())
    }

    /// Apply a command, returning `false` when the view should close.
    pub fn apply(&mut self, command: Command) -> Result<bool, Error> {
        match command {
            Command::Quit => Ok(false),
            Command::Select(target) => {
                self.select_pose(target)?;
                Ok(true)
            }
        }
    }

    /// Drain pending key presses, returning `false` when one asked to quit.
    fn handle_keys(&mut self) -> Result<bool, Error> {
        let commands: Vec<_> = match self.keys.as_ref() {
            Some(keys) => keys.try_iter().filter_map(Command::from_key).collect(),
            None => return Ok(true),
        };
        for command in commands {
            if !self.apply(command)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn refresh(&self) -> Result<SessionSnapshot, Error> {
        let snapshot = self.session.snapshot()?;
        if let Some(spinner) = self.spinner.as_ref() {
            spinner.set_message(status_line(&snapshot));
            spinner.tick();
        }
        Ok(snapshot)
    }

    /// Run the session until `running` is cleared or a quit key arrives,
    /// refreshing the status every `refresh`.
    pub fn run(&mut self, running: &AtomicBool, refresh: Duration) -> Result<SessionSnapshot, Error> {
        self.start()?;
        while running.load(Ordering::SeqCst) {
            if !self.handle_keys()? {
                running.store(false, Ordering::SeqCst);
                break;
            }
            self.refresh()?;
            thread::sleep(refresh);
        }
        self.stop()?;

        if let Some(spinner) = self.spinner.as_ref() {
            spinner.finish_and_clear();
        }
        self.session.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::CycleOutcome;
    use std::{
        sync::{Arc, Mutex},
        time::Instant,
    };

    /// Confident on every cycle, straight into the shared session.
    struct HoldingCycle {
        session: SessionHandle,
    }

    impl Cycle for HoldingCycle {
        fn run_cycle(&mut self, now: Instant) -> CycleOutcome {
            let transition = self.session.lock().unwrap().observe(true, now);
            CycleOutcome::Classified {
                confidence: 1.0,
                transition,
            }
        }
    }

    #[derive(Default, Clone)]
    struct RecordingReference {
        shown: Arc<Mutex<Vec<TargetPose>>>,
    }

    impl ReferenceDisplay for RecordingReference {
        fn show(&mut self, target: TargetPose) -> Result<(), Error> {
            self.shown.lock().unwrap().push(target);
            Ok(())
        }
    }

    fn view() -> SessionView<HoldingCycle> {
        let session = SessionHandle::new(TargetPose::default());
        let cycle = HoldingCycle {
            session: session.clone(),
        };
        SessionView::new(session, DetectionLoop::new(cycle, Duration::from_millis(10)))
    }

    mod command_tests {
        use super::*;

        #[test]
        fn quit_keys() {
            assert_eq!(Command::from_key(i32::from(b'q')), Some(Command::Quit));
            assert_eq!(Command::from_key(27), Some(Command::Quit));
        }

        #[test]
        fn digits_select_targets_in_menu_order() {
            assert_eq!(
                Command::from_key(i32::from(b'1')),
                Some(Command::Select(TargetPose::new(PoseClass::Tree).unwrap()))
            );
            assert_eq!(
                Command::from_key(i32::from(b'7')),
                Some(Command::Select(TargetPose::new(PoseClass::Triangle).unwrap()))
            );
            assert_eq!(Command::from_key(i32::from(b'8')), None);
            assert_eq!(Command::from_key(i32::from(b'0')), None);
            assert_eq!(Command::from_key(-1), None);
        }
    }

    #[test]
    fn status_line_formats_seconds() {
        let snapshot = SessionSnapshot {
            target: TargetPose::default(),
            elapsed: Duration::from_millis(1300),
            best: Duration::from_millis(4000),
            holding: true,
        };
        assert_eq!(status_line(&snapshot), "Pose Time: 1.3 s | Best: 4.0 s");
    }

    #[test]
    fn start_and_stop_drive_the_loop() {
        let mut view = view();
        view.start().unwrap();
        assert!(view.is_active());
        thread::sleep(Duration::from_millis(60));
        view.stop().unwrap();
        assert!(!view.is_active());
        assert!(view.stats().cycles >= 1);
        assert!(view.session().snapshot().unwrap().holding);
    }

    #[test]
    fn selecting_a_pose_resets_the_session() {
        let mut view = view();
        view.start().unwrap();
        thread::sleep(Duration::from_millis(60));
        view.stop().unwrap();

        let chair = TargetPose::new(PoseClass::Chair).unwrap();
        view.select_pose(chair).unwrap();
        let snapshot = view.session().snapshot().unwrap();
        assert_eq!(snapshot.target, chair);
        assert_eq!(snapshot.best, Duration::default());
        assert!(!snapshot.holding);
    }

    #[test]
    fn reference_follows_the_target_pose() {
        let reference = RecordingReference::default();
        let mut view = view().with_reference(reference.clone());
        view.start().unwrap();

        let chair = TargetPose::new(PoseClass::Chair).unwrap();
        view.select_pose(chair).unwrap();
        view.apply(Command::Select(TargetPose::new(PoseClass::Dog).unwrap()))
            .unwrap();
        view.stop().unwrap();

        assert_eq!(
            *reference.shown.lock().unwrap(),
            vec![
                TargetPose::default(),
                chair,
                TargetPose::new(PoseClass::Dog).unwrap()
            ]
        );
    }

    #[test]
    fn quit_key_ends_run() {
        let (keys_tx, keys_rx) = crossbeam::channel::unbounded();
        let mut view = view().with_keys(keys_rx);
        keys_tx.send(i32::from(b'2')).unwrap();
        keys_tx.send(i32::from(b'q')).unwrap();

        let running = Arc::new(AtomicBool::new(true));
        let snapshot = view.run(&running, Duration::from_millis(5)).unwrap();
        assert!(!running.load(Ordering::SeqCst));
        assert!(!view.is_active());
        assert_eq!(snapshot.target.class(), PoseClass::Chair);
    }
}
