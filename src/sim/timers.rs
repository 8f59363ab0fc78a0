//! Frame-driven delayed actions
//!
//! Timers only advance by the frame time passed to [`Timers::advance`], so a
//! paused or slowed simulation delays them too. Every task has an owner and
//! all of an owner's tasks can be cancelled at once.

/// Identifier of a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Task<O, A> {
    id: TaskId,
    owner: O,
    remaining: f64,
    action: A,
}

/// Pending delayed actions
#[derive(Debug, Clone)]
pub struct Timers<O, A> {
    tasks: Vec<Task<O, A>>,
    next_id: u64,
}

impl<O, A> Default for Timers<O, A> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }
}

impl<O: Copy + PartialEq, A> Timers<O, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` for `owner` after `delay` seconds of frame time
    pub fn schedule(&mut self, owner: O, delay: f64, action: A) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            owner,
            remaining: delay.max(0.0),
            action,
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// Cancel everything `owner` has pending. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: O) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.owner != owner);
        before - self.tasks.len()
    }

    /// Count down by `dt` and return the tasks that came due, in schedule order
    pub fn advance(&mut self, dt: f64) -> Vec<(O, A)> {
        if dt > 0.0 {
            for task in &mut self.tasks {
                task.remaining -= dt;
            }
        }
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.remaining <= 0.0);
        self.tasks = pending;
        due.into_iter()
            .map(|task| (task.owner, task.action))
            .collect()
    }

    pub fn pending_for(&self, owner: O) -> usize {
        self.tasks.iter().filter(|task| task.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
