//! Background pumps.
//!
//! A pump owns a unit of [`PumpWork`] and runs it on a dedicated thread.
//! It is driven by messages: a stop command goes to the thread, and the
//! thread answers on a completion channel, handing the work back when it
//! was stopped so the pump can be resumed later without losing state.
//!
//! One [`Pump`] exists per direction, so there is never more than one thread
//! per direction. `pause(true)` waits for the completion message, which
//! keeps a following `resume` from racing a thread that is still exiting.

mod state;

pub use state::PumpState;

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{Result, TtyError};

/// Outcome of one unit of pump work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep going.
    Continue,
    /// The source is exhausted; the pump finishes.
    Done,
}

/// Work performed by a pump thread.
///
/// `step` must return within a bounded time (a poll interval) so that stop
/// commands are observed promptly.
pub trait PumpWork: Send + 'static {
    /// Perform one bounded unit of work.
    fn step(&mut self) -> Result<Step>;

    /// Called once on the pump thread when the pump finishes on its own.
    ///
    /// `error` is set when the pump ended because `step` failed.
    fn finished(&mut self, error: Option<&TtyError>);
}

enum Exit<W> {
    Stopped(W),
    Finished,
}

struct Worker<W> {
    stop: Sender<()>,
    done: Receiver<Exit<W>>,
    handle: JoinHandle<()>,
}

struct Slot<W> {
    state: PumpState,
    work: Option<W>,
    worker: Option<Worker<W>>,
}

/// A pausable background pump.
pub struct Pump<W: PumpWork> {
    name: &'static str,
    join_timeout: Duration,
    slot: Mutex<Slot<W>>,
}

impl<W: PumpWork> Pump<W> {
    /// Create an idle pump. Call [`resume`](Self::resume) to start it.
    pub fn new(name: &'static str, work: W, join_timeout: Duration) -> Self {
        Self {
            name,
            join_timeout,
            slot: Mutex::new(Slot {
                state: PumpState::Idle,
                work: Some(work),
                worker: None,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slot<W>>> {
        self.slot.lock().map_err(|_| TtyError::LockPoisoned)
    }

    /// Current state, after collecting a pending completion message.
    pub fn state(&self) -> Result<PumpState> {
        let mut slot = self.lock()?;
        self.reap(&mut slot, Some(Duration::ZERO))?;
        Ok(slot.state)
    }

    /// Start the pump, or do nothing if it is already running.
    ///
    /// A pending stop is completed first; if the old thread does not exit
    /// within the join timeout the pump is reported busy.
    pub fn resume(&self) -> Result<()> {
        let mut slot = self.lock()?;
        self.reap(&mut slot, Some(Duration::ZERO))?;
        if slot.state == PumpState::Stopping {
            self.reap(&mut slot, Some(self.join_timeout))?;
        }
        match slot.state {
            PumpState::Running => Ok(()),
            PumpState::Stopping => Err(TtyError::PumpBusy(self.name)),
            PumpState::Finished => Err(TtyError::Closed),
            PumpState::Idle => self.spawn(&mut slot),
        }
    }

    /// Ask the pump to stop.
    ///
    /// With `wait`, blocks until the thread confirms (bounded by the join
    /// timeout).
    pub fn pause(&self, wait: bool) -> Result<()> {
        let mut slot = self.lock()?;
        self.reap(&mut slot, Some(Duration::ZERO))?;
        if slot.state == PumpState::Running {
            if let Some(worker) = &slot.worker {
                // A closed channel means the thread is already gone.
                let _ = worker.stop.send(());
            }
            slot.state.transition_to(PumpState::Stopping)?;
            debug!(pump = self.name, "pause requested");
        }
        if wait && slot.state == PumpState::Stopping {
            self.reap(&mut slot, Some(self.join_timeout))?;
            if slot.state == PumpState::Stopping {
                warn!(pump = self.name, "pump did not stop within {:?}", self.join_timeout);
            }
        }
        Ok(())
    }

    /// Whether the pump is idle or stopping.
    pub fn paused(&self) -> Result<bool> {
        Ok(self.state()?.is_paused())
    }

    /// Wait up to `timeout` for the pump to stop or finish on its own.
    pub fn join(&self, timeout: Duration) -> Result<PumpState> {
        let mut slot = self.lock()?;
        if matches!(slot.state, PumpState::Running | PumpState::Stopping) {
            self.reap(&mut slot, Some(timeout))?;
        }
        Ok(slot.state)
    }

    /// Stop the pump for good.
    ///
    /// Waits (bounded) for a running thread, then drops the work.
    pub fn close(&self) -> Result<()> {
        self.pause(true)?;
        let mut slot = self.lock()?;
        if !slot.state.is_terminal() {
            slot.state.transition_to(PumpState::Finished)?;
        }
        slot.work = None;
        Ok(())
    }

    fn spawn(&self, slot: &mut Slot<W>) -> Result<()> {
        let Some(work) = slot.work.take() else {
            slot.state.transition_to(PumpState::Finished)?;
            return Err(TtyError::Closed);
        };
        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let name = self.name;

        let spawned = thread::Builder::new()
            .name(format!("ttyline-{name}"))
            .spawn(move || run(name, work, stop_rx, done_tx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                slot.state.transition_to(PumpState::Finished)?;
                return Err(e.into());
            }
        };

        slot.worker = Some(Worker {
            stop: stop_tx,
            done: done_rx,
            handle,
        });
        slot.state.transition_to(PumpState::Running)?;
        debug!(pump = name, "pump started");
        Ok(())
    }

    /// Collect a completion message, waiting at most `timeout`.
    fn reap(&self, slot: &mut Slot<W>, timeout: Option<Duration>) -> Result<()> {
        let Some(worker) = &slot.worker else {
            return Ok(());
        };
        let exit = match timeout {
            Some(t) if t.is_zero() => match worker.done.try_recv() {
                Ok(exit) => Some(exit),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Exit::Finished),
            },
            Some(t) => match worker.done.recv_timeout(t) {
                Ok(exit) => Some(exit),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => Some(Exit::Finished),
            },
            None => Some(worker.done.recv().unwrap_or(Exit::Finished)),
        };
        let Some(exit) = exit else {
            return Ok(());
        };

        if let Some(worker) = slot.worker.take() {
            if worker.handle.join().is_err() {
                error!(pump = self.name, "pump thread panicked");
            }
        }
        match exit {
            Exit::Stopped(work) => {
                slot.work = Some(work);
                if slot.state == PumpState::Running {
                    slot.state.transition_to(PumpState::Stopping)?;
                }
                slot.state.transition_to(PumpState::Idle)?;
                debug!(pump = self.name, "pump stopped");
            }
            Exit::Finished => {
                if !slot.state.is_terminal() {
                    slot.state.transition_to(PumpState::Finished)?;
                }
                debug!(pump = self.name, "pump finished");
            }
        }
        Ok(())
    }
}

impl<W: PumpWork> Drop for Pump<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn run<W: PumpWork>(name: &'static str, mut work: W, stop: Receiver<()>, done: Sender<Exit<W>>) {
    loop {
        match stop.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                let _ = done.send(Exit::Stopped(work));
                return;
            }
            Err(TryRecvError::Empty) => {}
        }
        match work.step() {
            Ok(Step::Continue) => {}
            Ok(Step::Done) => {
                debug!(pump = name, "source exhausted");
                work.finished(None);
                let _ = done.send(Exit::Finished);
                return;
            }
            Err(e) => {
                error!(pump = name, "pump failed: {}", e);
                work.finished(Some(&e));
                let _ = done.send(Exit::Finished);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        steps: Arc<AtomicUsize>,
        limit: Option<usize>,
        fail: bool,
        finished: Arc<AtomicUsize>,
    }

    impl Counter {
        fn new(limit: Option<usize>) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let steps = Arc::new(AtomicUsize::new(0));
            let finished = Arc::new(AtomicUsize::new(0));
            let work = Self {
                steps: Arc::clone(&steps),
                limit,
                fail: false,
                finished: Arc::clone(&finished),
            };
            (work, steps, finished)
        }
    }

    impl PumpWork for Counter {
        fn step(&mut self) -> Result<Step> {
            thread::sleep(Duration::from_millis(1));
            let n = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(TtyError::Pty("source broke".into()));
            }
            match self.limit {
                Some(limit) if n >= limit => Ok(Step::Done),
                _ => Ok(Step::Continue),
            }
        }

        fn finished(&mut self, _error: Option<&TtyError>) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_for(pump: &Pump<Counter>, state: PumpState) {
        for _ in 0..200 {
            if pump.state().unwrap() == state {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("pump never reached {state:?}");
    }

    #[test]
    fn test_pause_and_resume_keep_work() {
        let (work, steps, finished) = Counter::new(None);
        let pump = Pump::new("test", work, Duration::from_secs(2));
        assert_eq!(pump.state().unwrap(), PumpState::Idle);

        pump.resume().unwrap();
        assert_eq!(pump.state().unwrap(), PumpState::Running);
        thread::sleep(Duration::from_millis(20));

        pump.pause(true).unwrap();
        assert_eq!(pump.state().unwrap(), PumpState::Idle);
        assert!(pump.paused().unwrap());
        let paused_at = steps.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(steps.load(Ordering::SeqCst), paused_at);

        pump.resume().unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(steps.load(Ordering::SeqCst) > paused_at);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resume_while_running_is_noop() {
        let (work, _steps, _finished) = Counter::new(None);
        let pump = Pump::new("test", work, Duration::from_secs(2));
        pump.resume().unwrap();
        pump.resume().unwrap();
        assert_eq!(pump.state().unwrap(), PumpState::Running);
    }

    #[test]
    fn test_resume_completes_pending_stop() {
        let (work, _steps, _finished) = Counter::new(None);
        let pump = Pump::new("test", work, Duration::from_secs(2));
        pump.resume().unwrap();
        pump.pause(false).unwrap();
        pump.resume().unwrap();
        assert_eq!(pump.state().unwrap(), PumpState::Running);
    }

    #[test]
    fn test_finishes_on_exhaustion() {
        let (work, steps, finished) = Counter::new(Some(3));
        let pump = Pump::new("test", work, Duration::from_secs(2));
        pump.resume().unwrap();
        wait_for(&pump, PumpState::Finished);

        assert_eq!(steps.load(Ordering::SeqCst), 3);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(matches!(pump.resume(), Err(TtyError::Closed)));
    }

    #[test]
    fn test_failure_finishes_pump() {
        let (mut work, _steps, finished) = Counter::new(None);
        work.fail = true;
        let pump = Pump::new("test", work, Duration::from_secs(2));
        pump.resume().unwrap();
        wait_for(&pump, PumpState::Finished);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_is_final() {
        let (work, _steps, finished) = Counter::new(None);
        let pump = Pump::new("test", work, Duration::from_secs(2));
        pump.resume().unwrap();
        pump.close().unwrap();
        pump.close().unwrap();

        assert_eq!(pump.state().unwrap(), PumpState::Finished);
        assert!(pump.resume().is_err());
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_join_waits_for_exhaustion() {
        let (work, _steps, _finished) = Counter::new(Some(5));
        let pump = Pump::new("test", work, Duration::from_secs(2));
        pump.resume().unwrap();
        assert_eq!(pump.join(Duration::from_secs(2)).unwrap(), PumpState::Finished);
    }

    #[test]
    fn test_pause_when_idle_is_noop() {
        let (work, _steps, _finished) = Counter::new(None);
        let pump = Pump::new("test", work, Duration::from_secs(2));
        pump.pause(true).unwrap();
        assert_eq!(pump.state().unwrap(), PumpState::Idle);
    }
}
