//! Task list collaborator.
//!
//! The timer only needs one operation from the task list: dropping completed
//! tasks when the current section changes. [`InMemoryTaskList`] is the list
//! used by the CLI and the tests.

use serde::{Deserialize, Serialize};

/// Operations the timer calls on the task list.
pub trait TaskList {
    /// Removes completed tasks and returns how many were removed.
    fn remove_completed(&mut self) -> usize;
}

/// A single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: u64,
    /// Task title
    pub title: String,
    /// Whether the task is done
    pub completed: bool,
}

/// Task list held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskList {
    tasks: Vec<Task>,
    next_id: u64,
}

impl InMemoryTaskList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task and returns its id.
    pub fn add(&mut self, title: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            title: title.into(),
            completed: false,
        });
        id
    }

    /// Marks a task as completed. Returns false if no such task exists.
    pub fn complete(&mut self, id: u64) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = true;
                true
            }
            None => false,
        }
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }
}

impl TaskList for InMemoryTaskList {
    fn remove_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        before - self.tasks.len()
    }
}
