//! Book keeping of the background tasks the dashboard spawns, shown in its status line.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, OnceLock},
  time::{Duration, Instant},
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskCategory {
  GeometryLoad,
  InfoFetch,
}

#[derive(Clone, Debug)]
pub struct TaskInfo {
  pub name: String,
  pub started_at: Instant,
  pub category: TaskCategory,
}

impl TaskInfo {
  #[must_use]
  pub fn elapsed(&self) -> Duration {
    self.started_at.elapsed()
  }
}

#[derive(Default)]
struct Tasks {
  running: HashMap<u64, TaskInfo>,
  next_id: u64,
}

#[derive(Default)]
pub struct TaskTracker {
  tasks: Mutex<Tasks>,
}

impl TaskTracker {
  pub fn register(&self, name: String, category: TaskCategory) -> u64 {
    let mut tasks = self.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let id = tasks.next_id;
    tasks.next_id += 1;
    tasks.running.insert(
      id,
      TaskInfo {
        name,
        started_at: Instant::now(),
        category,
      },
    );
    id
  }

  pub fn unregister(&self, id: u64) {
    self
      .tasks
      .lock()
      .unwrap_or_else(std::sync::PoisonError::into_inner)
      .running
      .remove(&id);
  }

  /// Running tasks, oldest first.
  #[must_use]
  pub fn snapshot(&self) -> Vec<TaskInfo> {
    let tasks = self.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let mut running: Vec<_> = tasks.running.iter().collect();
    running.sort_by_key(|(id, _)| **id);
    running.into_iter().map(|(_, info)| info.clone()).collect()
  }

  #[must_use]
  pub fn count_by_category(&self, category: &TaskCategory) -> usize {
    self
      .tasks
      .lock()
      .unwrap_or_else(std::sync::PoisonError::into_inner)
      .running
      .values()
      .filter(|info| &info.category == category)
      .count()
  }
}

static TASK_TRACKER: OnceLock<Arc<TaskTracker>> = OnceLock::new();

pub fn task_tracker() -> Arc<TaskTracker> {
  TASK_TRACKER.get_or_init(Arc::default).clone()
}

/// Registers a task for as long as it is alive.
pub struct TaskGuard {
  id: u64,
  tracker: Arc<TaskTracker>,
}

impl TaskGuard {
  #[must_use]
  pub fn new(name: String, category: TaskCategory) -> Self {
    let tracker = task_tracker();
    let id = tracker.register(name, category);
    Self { id, tracker }
  }
}

impl Drop for TaskGuard {
  fn drop(&mut self) {
    self.tracker.unregister(self.id);
  }
}
