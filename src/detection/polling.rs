use super::CycleOutcome;
use crate::error::Error;
use crossbeam::channel::{self, select, Receiver, Sender};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::{debug, trace};

/// Work run once per tick of a [`DetectionLoop`].
pub trait Cycle: Send + 'static {
    fn run_cycle(&mut self, now: Instant) -> CycleOutcome;
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    skipped_ticks: AtomicU64,
    failures: AtomicU64,
    not_ready: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: CycleOutcome) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        match outcome {
            CycleOutcome::Failed => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            CycleOutcome::NotReady => {
                self.not_ready.fetch_add(1, Ordering::Relaxed);
            }
            CycleOutcome::NoReliablePose { .. } | CycleOutcome::Classified { .. } => {}
        }
    }

    fn skip(&self) {
        self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LoopStats {
        LoopStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            not_ready: self.not_ready.load(Ordering::Relaxed),
        }
    }
}

/// Counters accumulated over the lifetime of a loop, across restarts.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    /// Ticks that arrived while a previous cycle was still running.
    pub skipped_ticks: u64,
    pub failures: u64,
    pub not_ready: u64,
}

/// Admits a tick only if it was scheduled after the previous cycle finished,
/// so a slow cycle never queues up a backlog of work.
#[derive(Debug, Default)]
struct InFlightGuard {
    busy_until: Option<Instant>,
}

impl InFlightGuard {
    fn admit(&self, tick: Instant) -> bool {
        self.busy_until.map_or(true, |until| tick >= until)
    }

    fn finish(&mut self, at: Instant) {
        self.busy_until = Some(at);
    }
}

struct Worker<P> {
    stop: Sender<()>,
    handle: JoinHandle<P>,
}

enum State<P> {
    Idle(P),
    Active(Worker<P>),
}

/// Runs a [`Cycle`] on a background thread at a fixed interval.
pub struct DetectionLoop<P: Cycle> {
    // `None` only after the worker panicked or could not be spawned
    state: Option<State<P>>,
    interval: Duration,
    counters: Arc<Counters>,
}

fn run_worker<P: Cycle>(
    mut cycle: P,
    interval: Duration,
    stop: Receiver<()>,
    counters: Arc<Counters>,
) -> P {
    let ticks = channel::tick(interval);
    let mut guard = InFlightGuard::default();

    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticks) -> tick => {
                let tick = match tick {
                    Ok(tick) => tick,
                    Err(_) => break,
                };
                if !guard.admit(tick) {
                    trace!(message = "previous cycle still in flight, skipping tick");
                    counters.skip();
                    continue;
                }
                let outcome = cycle.run_cycle(Instant::now());
                guard.finish(Instant::now());
                counters.record(outcome);
            }
        }
    }

    cycle
}

impl<P: Cycle> DetectionLoop<P> {
    pub fn new(cycle: P, interval: Duration) -> Self {
        Self {
            state: Some(State::Idle(cycle)),
            interval,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, Some(State::Active(_)))
    }

    pub fn stats(&self) -> LoopStats {
        self.counters.snapshot()
    }

    /// The cycle, while the loop is stopped.
    pub fn cycle(&self) -> Option<&P> {
        match self.state.as_ref() {
            Some(State::Idle(cycle)) => Some(cycle),
            _ => None,
        }
    }

    pub fn start(&mut self) -> Result<(), Error> {
        let cycle = match self.state.take() {
            Some(State::Idle(cycle)) => cycle,
            Some(active @ State::Active(_)) => {
                self.state = Some(active);
                return Err(Error::LoopAlreadyActive);
            }
            None => return Err(Error::LoopPoisoned),
        };

        let (stop, stopped) = channel::bounded(1);
        let counters = Arc::clone(&self.counters);
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("detection".to_owned())
            .spawn(move || run_worker(cycle, interval, stopped, counters))
            .map_err(Error::SpawnWorker)?;

        debug!(message = "detection loop started", interval_ms = interval.as_millis() as u64);
        self.state = Some(State::Active(Worker { stop, handle }));
        Ok(())
    }

    /// Stop the worker and wait for any in-flight cycle to finish.
    pub fn stop(&mut self) -> Result<(), Error> {
        let worker = match self.state.take() {
            Some(State::Active(worker)) => worker,
            Some(idle @ State::Idle(_)) => {
                self.state = Some(idle);
                return Err(Error::LoopNotActive);
            }
            None => return Err(Error::LoopPoisoned),
        };

        // the worker may already be gone, in which case join reports why
        let _ = worker.stop.send(());
        let cycle = worker.handle.join().map_err(|_| Error::WorkerPanicked)?;
        debug!(message = "detection loop stopped");
        self.state = Some(State::Idle(cycle));
        Ok(())
    }
}

impl<P: Cycle> Drop for DetectionLoop<P> {
    fn drop(&mut self) {
        if self.is_active() {
            let _ = self.stop();
        }
    }
}
