//! Manually driven clock and scheduler for deterministic tests.
//!
//! [`ManualClock`] only moves when told to.  [`ManualScheduler`] queues tasks
//! against that clock and runs them, in due-time order, as tests call
//! [`ManualScheduler::advance`].  Tasks that schedule further tasks are
//! supported: anything that becomes due inside the advanced span also runs.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::application::timing::{Clock, ScheduledTask, Scheduler};

/// A clock frozen at a fixed origin plus a manually advanced offset.
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock whose origin is the real current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// The instant at offset zero.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Time elapsed since the origin.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the clock to `offset` past the origin.  Never moves backwards.
    pub fn set_elapsed(&self, offset: Duration) {
        let mut current = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        if offset > *current {
            *current = offset;
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut current = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *current += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}

struct PendingTask {
    due: Duration,
    seq: u64,
    task: ScheduledTask,
}

#[derive(Default)]
struct Queue {
    tasks: Vec<PendingTask>,
    next_seq: u64,
}

/// A scheduler whose tasks only run when the test advances time.
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    queue: Mutex<Queue>,
}

impl ManualScheduler {
    /// Creates a scheduler bound to `clock`.
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            queue: Mutex::new(Queue::default()),
        }
    }

    /// Number of tasks waiting to run.
    pub fn pending_count(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .len()
    }

    /// Offset from the clock origin at which the earliest task is due.
    pub fn next_due(&self) -> Option<Duration> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .iter()
            .map(|t| t.due)
            .min()
    }

    /// Advances the clock by `by`, running every task that falls due.
    pub fn advance(&self, by: Duration) {
        self.advance_to(self.clock.elapsed() + by);
    }

    /// Advances the clock to `target` past the origin, running every task
    /// that falls due on the way.  Each task observes the clock at its own
    /// due time.
    pub fn advance_to(&self, target: Duration) {
        while let Some(task) = self.pop_due(target) {
            self.clock.set_elapsed(task.due);
            (task.task)();
        }
        self.clock.set_elapsed(target);
    }

    /// Runs tasks until the queue is empty, advancing the clock to each due
    /// time.  Stops after `max_tasks` to guard against self-rearming loops.
    pub fn run_until_idle(&self, max_tasks: usize) -> usize {
        let mut ran = 0;
        while ran < max_tasks {
            let Some(due) = self.next_due() else { break };
            let target = due.max(self.clock.elapsed());
            let Some(task) = self.pop_due(target) else { break };
            self.clock.set_elapsed(task.due);
            (task.task)();
            ran += 1;
        }
        ran
    }

    fn pop_due(&self, target: Duration) -> Option<PendingTask> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let idx = queue
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= target)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;
        Some(queue.tasks.swap_remove(idx))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        let due = self.clock.elapsed() + delay;
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.tasks.push(PendingTask { due, seq, task });
    }
}

/// Builds a clock and a scheduler wired to it.
pub fn manual_timing() -> (Arc<ManualClock>, Arc<ManualScheduler>) {
    let clock = Arc::new(ManualClock::new());
    let scheduler = Arc::new(ManualScheduler::new(Arc::clone(&clock)));
    (clock, scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<(u32, Duration)>>>, Arc<ManualClock>, Arc<ManualScheduler>) {
        let (clock, scheduler) = manual_timing();
        (Arc::new(Mutex::new(Vec::new())), clock, scheduler)
    }

    #[test]
    fn test_clock_starts_at_origin() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), clock.origin());
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(2));
        clock.set_elapsed(Duration::from_secs(1));
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_tasks_run_in_due_order_at_their_due_time() {
        // Arrange
        let (log, clock, scheduler) = recorder();
        for (id, ms) in [(1u32, 300u64), (2, 100), (3, 200)] {
            let log = Arc::clone(&log);
            let c = Arc::clone(&clock);
            scheduler.schedule(
                Duration::from_millis(ms),
                Box::new(move || log.lock().unwrap().push((id, c.elapsed()))),
            );
        }

        // Act
        scheduler.advance(Duration::from_secs(1));

        // Assert
        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                (2, Duration::from_millis(100)),
                (3, Duration::from_millis(200)),
                (1, Duration::from_millis(300)),
            ]
        );
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn test_task_not_yet_due_stays_queued() {
        let (_, _clock, scheduler) = recorder();
        scheduler.schedule(Duration::from_secs(5), Box::new(|| {}));

        scheduler.advance(Duration::from_secs(4));

        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.next_due(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_task_scheduled_by_task_runs_within_same_advance() {
        // Arrange
        let (log, clock, scheduler) = recorder();
        let inner_log = Arc::clone(&log);
        let inner_clock = Arc::clone(&clock);
        let inner_sched = Arc::clone(&scheduler);
        scheduler.schedule(
            Duration::from_millis(100),
            Box::new(move || {
                let log = Arc::clone(&inner_log);
                let c = Arc::clone(&inner_clock);
                inner_sched.schedule(
                    Duration::from_millis(100),
                    Box::new(move || log.lock().unwrap().push((7, c.elapsed()))),
                );
            }),
        );

        // Act
        scheduler.advance(Duration::from_millis(250));

        // Assert
        assert_eq!(*log.lock().unwrap(), vec![(7, Duration::from_millis(200))]);
    }

    #[test]
    fn test_run_until_idle_drains_queue() {
        let (log, _clock, scheduler) = recorder();
        let log2 = Arc::clone(&log);
        scheduler.schedule(
            Duration::from_secs(10),
            Box::new(move || log2.lock().unwrap().push((1, Duration::ZERO))),
        );

        let ran = scheduler.run_until_idle(10);

        assert_eq!(ran, 1);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
