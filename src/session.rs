use crate::{classify::TargetPose, error::Error, geometry::Color};
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

/// What a confidence observation did to the hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HoldTransition {
    /// The first confident cycle since the hold flag was last cleared.
    Started,
    Continued,
    /// The hold flag was set and has been cleared.
    Ended,
    /// Not confident, and not holding before either.
    Idle,
}

/// Per-session hold timer state.
#[derive(Debug, Clone)]
pub struct SessionState {
    target: TargetPose,
    hold_start: Option<Instant>,
    elapsed: Duration,
    best: Duration,
    holding: bool,
    skeleton_color: Color,
}

/// A copy of the values the session view renders.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub target: TargetPose,
    pub elapsed: Duration,
    pub best: Duration,
    pub holding: bool,
}

impl SessionState {
    pub fn new(target: TargetPose) -> Self {
        Self {
            target,
            hold_start: None,
            elapsed: Duration::default(),
            best: Duration::default(),
            holding: false,
            skeleton_color: Color::WHITE,
        }
    }

    /// Switch the target pose, discarding all timing state.
    pub fn select(&mut self, target: TargetPose) {
        *self = Self::new(target);
    }

    /// Record whether this cycle's target confidence cleared the threshold.
    pub fn observe(&mut self, confident: bool, now: Instant) -> HoldTransition {
        let transition = if confident {
            let transition = if self.holding {
                HoldTransition::Continued
            } else {
                self.holding = true;
                self.hold_start = Some(now);
                HoldTransition::Started
            };
            let start = *self.hold_start.get_or_insert(now);
            self.elapsed = now.saturating_duration_since(start);
            self.skeleton_color = Color::GREEN;
            transition
        } else {
            self.skeleton_color = Color::WHITE;
            if std::mem::replace(&mut self.holding, false) {
                HoldTransition::Ended
            } else {
                HoldTransition::Idle
            }
        };

        if self.elapsed > self.best {
            self.best = self.elapsed;
        }

        transition
    }

    /// A cycle without a reliable pose: render neutral, leave the hold alone.
    pub fn set_neutral(&mut self) {
        self.skeleton_color = Color::WHITE;
    }

    pub fn target(&self) -> TargetPose {
        self.target
    }

    pub fn hold_start(&self) -> Option<Instant> {
        self.hold_start
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn best(&self) -> Duration {
        self.best
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    pub fn skeleton_color(&self) -> Color {
        self.skeleton_color
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            target: self.target,
            elapsed: self.elapsed,
            best: self.best,
            holding: self.holding,
        }
    }
}

/// Shared handle to the session state of one view.
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<Mutex<SessionState>>);

impl SessionHandle {
    pub fn new(target: TargetPose) -> Self {
        Self(Arc::new(Mutex::new(SessionState::new(target))))
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, SessionState>, Error> {
        self.0.lock().map_err(|_| Error::LockSession)
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, Error> {
        Ok(self.lock()?.snapshot())
    }

    pub fn select_pose(&self, target: TargetPose) -> Result<(), Error> {
        self.lock()?.select(target);
        Ok(())
    }
}
