//! Pending decode task buffer.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;

use crate::types::DecodeTask;

/// Order in which pending tasks are admitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum QueuePolicy {
    /// Oldest request first.
    Fifo,
    /// Newest request first. Suits scrolling lists, where the most recent
    /// request is the one on screen.
    #[default]
    Lifo,
}

impl fmt::Display for QueuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => write!(f, "fifo"),
            Self::Lifo => write!(f, "lifo"),
        }
    }
}

/// Unknown queue policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown queue policy '{0}' - expected 'fifo' or 'lifo'")]
pub struct ParsePolicyError(String);

impl FromStr for QueuePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "lifo" => Ok(Self::Lifo),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Mutex-guarded double-ended buffer of [`DecodeTask`]s.
///
/// Tasks always go in at the back; [`pop`](Self::pop) takes from the front
/// or the back depending on the policy.
pub struct TaskQueue {
    tasks: Mutex<VecDeque<DecodeTask>>,
    policy: QueuePolicy,
}

impl TaskQueue {
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            policy,
        }
    }

    /// Appends a task and returns the resulting depth.
    pub fn push(&self, task: DecodeTask) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.push_back(task);
        tasks.len()
    }

    /// Removes the next task per policy, or `None` if empty.
    pub fn pop(&self) -> Option<DecodeTask> {
        let mut tasks = self.tasks.lock();
        match self.policy {
            QueuePolicy::Fifo => tasks.pop_front(),
            QueuePolicy::Lifo => tasks.pop_back(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    /// Drops every pending task, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let dropped = tasks.len();
        tasks.clear();
        dropped
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("policy", &self.policy)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{ImageSlot, SlotGeometry};
    use crate::types::{ImageSize, RequestKey};
    use std::sync::Arc;

    fn task(key: &str) -> DecodeTask {
        DecodeTask::new(
            RequestKey::new(key),
            Arc::new(ImageSlot::new(SlotGeometry::rendered(1, 1))),
            ImageSize::new(1, 1),
        )
    }

    fn drain(queue: &TaskQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.pop())
            .map(|t| t.key().to_string())
            .collect()
    }

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new(QueuePolicy::Fifo);
        queue.push(task("A"));
        queue.push(task("B"));
        queue.push(task("C"));
        assert_eq!(drain(&queue), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_lifo_order() {
        let queue = TaskQueue::new(QueuePolicy::Lifo);
        queue.push(task("A"));
        queue.push(task("B"));
        queue.push(task("C"));
        assert_eq!(drain(&queue), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_push_reports_depth() {
        let queue = TaskQueue::new(QueuePolicy::default());
        assert_eq!(queue.push(task("A")), 1);
        assert_eq!(queue.push(task("A")), 2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_pop_empty() {
        let queue = TaskQueue::new(QueuePolicy::Fifo);
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let queue = TaskQueue::new(QueuePolicy::Lifo);
        queue.push(task("A"));
        queue.push(task("B"));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!(QueuePolicy::default(), QueuePolicy::Lifo);
        assert_eq!("FIFO".parse::<QueuePolicy>().unwrap(), QueuePolicy::Fifo);
        assert_eq!(" lifo ".parse::<QueuePolicy>().unwrap(), QueuePolicy::Lifo);
        assert!("random".parse::<QueuePolicy>().is_err());
        assert_eq!(QueuePolicy::Fifo.to_string(), "fifo");
    }
}
