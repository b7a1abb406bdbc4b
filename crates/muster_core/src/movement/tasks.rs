//! Scheduled per-agent tasks.
//!
//! Long-running agent behaviours (following a path, scanning for obstacles,
//! steering around one, finishing a move) are entries in a [`TaskSet`], each
//! carrying its own due time. The owner polls the set once per fixed step
//! against the simulation clock. Cancelling a task is removing its entry.

use crate::math::Fixed;

/// How often a task comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every fixed step.
    EveryStep,
    /// Every `period` seconds.
    Every(Fixed),
    /// Once, then removed.
    Once,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledTask<K> {
    kind: K,
    due: Fixed,
    cadence: Cadence,
}

/// Ordered set of scheduled tasks.
///
/// Tasks due in the same step come out in scheduling order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSet<K> {
    tasks: Vec<ScheduledTask<K>>,
}

impl<K> Default for TaskSet<K> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<K: Copy> TaskSet<K> {
    /// Schedule a task that runs every step, starting with the step at `now`.
    pub fn every_step(&mut self, kind: K, now: Fixed) {
        self.push(kind, now, Cadence::EveryStep);
    }

    /// Schedule a task that first runs `period` after `now`, then every
    /// `period`.
    pub fn every(&mut self, kind: K, period: Fixed, now: Fixed) {
        self.push(kind, now + period, Cadence::Every(period));
    }

    /// Schedule a task that runs once, `delay` after `now`.
    pub fn once(&mut self, kind: K, delay: Fixed, now: Fixed) {
        self.push(kind, now + delay, Cadence::Once);
    }

    fn push(&mut self, kind: K, due: Fixed, cadence: Cadence) {
        self.tasks.push(ScheduledTask { kind, due, cadence });
    }

    /// Take the next task due at `now` and reschedule it.
    ///
    /// `step` is the fixed timestep; every-step tasks become due again at
    /// `now + step`. Periodic tasks that fell more than one period behind
    /// skip the missed runs. One-shot tasks are removed.
    pub fn poll(&mut self, now: Fixed, step: Fixed) -> Option<K> {
        let index = self.tasks.iter().position(|task| task.due <= now)?;
        let task = &mut self.tasks[index];
        let kind = task.kind;

        match task.cadence {
            Cadence::EveryStep => task.due = now + step,
            Cadence::Every(period) => {
                task.due += period;
                if task.due <= now {
                    task.due = now + period;
                }
            }
            Cadence::Once => {
                self.tasks.remove(index);
            }
        }

        Some(kind)
    }

    /// Remove every task matching `pred`. Returns true if any was removed.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| !pred(&task.kind));
        self.tasks.len() != before
    }

    /// Returns true if any task matches `pred`.
    pub fn any(&self, mut pred: impl FnMut(&K) -> bool) -> bool {
        self.tasks.iter().any(|task| pred(&task.kind))
    }

    /// First task matching `pred`.
    pub fn find(&self, mut pred: impl FnMut(&K) -> bool) -> Option<K> {
        self.tasks
            .iter()
            .find(|task| pred(&task.kind))
            .map(|task| task.kind)
    }

    /// Remove every task at once.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Number of scheduled tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
