//! Tick scheduling for the rig.
//!
//! The engine never owns a loop of its own: it asks a [`TickScheduler`] to
//! start and stop periodic wake-ups and an external driver calls `tick()` on
//! the owning thread. The channel policy mirrors the engine's threading
//! contract — commits and ticks happen on one logical thread, so scheduler
//! threads only ever push [`WakeUp`] messages through a bounded
//! crossbeam channel and never touch rig state.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;

/// Bound for wake-up channels. Wake-ups are coalescable; if the consumer
/// stalls, dropping extras is preferable to unbounded growth.
pub const WAKEUP_CHANNEL_CAP: usize = 64;

/// Messages a scheduler pushes to the driving loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeUp {
    /// Periodic frame wake-up; the driver should call `tick()`.
    Tick,
    /// One-shot timer armed via [`TickScheduler::after`] fired.
    Timer(TickHandle),
}

/// Opaque handle for a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

/// Periodic and one-shot scheduling as the engine consumes it.
///
/// `schedule` starts periodic invocation at the given interval, `cancel`
/// stops a job, `after` arms a single deferred wake-up. Implementations must
/// tolerate `cancel` on an already-finished handle.
pub trait TickScheduler {
    fn schedule(&mut self, interval: Duration) -> TickHandle;
    fn cancel(&mut self, handle: TickHandle);
    fn after(&mut self, delay: Duration) -> TickHandle;
}

/// Scheduler backed by real threads pushing wake-ups through a channel.
///
/// Each job owns one thread; cancellation is a stop flag checked every
/// period. Threads exit on their own when the channel closes.
pub struct ThreadTicker {
    tx: Sender<WakeUp>,
    jobs: HashMap<TickHandle, Job>,
    next_id: u64,
}

struct Job {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ThreadTicker {
    pub fn new(tx: Sender<WakeUp>) -> Self {
        Self {
            tx,
            jobs: HashMap::new(),
            next_id: 0,
        }
    }

    /// Create a ticker together with its wake-up channel.
    pub fn with_channel() -> (Self, crossbeam_channel::Receiver<WakeUp>) {
        let (tx, rx) = crossbeam_channel::bounded(WAKEUP_CHANNEL_CAP);
        (Self::new(tx), rx)
    }

    fn next_handle(&mut self) -> TickHandle {
        self.next_id += 1;
        TickHandle(self.next_id)
    }
}

impl TickScheduler for ThreadTicker {
    fn schedule(&mut self, interval: Duration) -> TickHandle {
        let handle = self.next_handle();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let tx = self.tx.clone();
        tracing::debug!(target: "rig.events", ?interval, "tick job started");
        let thread = std::thread::spawn(move || {
            let ticks = crossbeam_channel::tick(interval);
            while ticks.recv().is_ok() {
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }
                // Full channel means the consumer is behind; drop the wake-up
                // rather than queueing a burst.
                match tx.try_send(WakeUp::Tick) {
                    Ok(()) | Err(crossbeam_channel::TrySendError::Full(_)) => {}
                    Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
                }
            }
        });
        self.jobs.insert(
            handle,
            Job {
                stop,
                thread: Some(thread),
            },
        );
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        if let Some(mut job) = self.jobs.remove(&handle) {
            job.stop.store(true, Ordering::Relaxed);
            // Detach rather than join: the thread notices the flag within one
            // period and the channel disconnect stops anything after that.
            job.thread.take();
            tracing::debug!(target: "rig.events", "tick job cancelled");
        }
    }

    fn after(&mut self, delay: Duration) -> TickHandle {
        let handle = self.next_handle();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let tx = self.tx.clone();
        let thread = std::thread::spawn(move || {
            std::thread::sleep(delay);
            if !stop_flag.load(Ordering::Relaxed) {
                let _ = tx.try_send(WakeUp::Timer(handle));
            }
        });
        self.jobs.insert(
            handle,
            Job {
                stop,
                thread: Some(thread),
            },
        );
        handle
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        for job in self.jobs.values() {
            job.stop.store(true, Ordering::Relaxed);
        }
    }
}

/// Scheduler that records what the engine asked for and does nothing else.
///
/// Embedders and tests drive `tick_at` themselves; this keeps the lazy
/// start/auto-stop bookkeeping observable without any threads.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    active: Option<(TickHandle, Duration)>,
    pending_timers: Vec<(TickHandle, Duration)>,
    next_id: u64,
    pub schedule_count: u64,
    pub cancel_count: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_scheduled(&self) -> bool {
        self.active.is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.active.map(|(_, i)| i)
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self, interval: Duration) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.active = Some((handle, interval));
        self.schedule_count += 1;
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        if self.active.map(|(h, _)| h) == Some(handle) {
            self.active = None;
            self.cancel_count += 1;
        }
        self.pending_timers.retain(|(h, _)| *h != handle);
    }

    fn after(&mut self, delay: Duration) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending_timers.push((handle, delay));
        handle
    }
}
