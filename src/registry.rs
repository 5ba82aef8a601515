use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::interval;
use uuid::Uuid;

use crate::events::TaskEvent;

const SWEEP_INTERVAL_SECS: u64 = 60;

/// Process-wide map from task id to its event channel and completion flag.
/// The worker holds the sender half; the consumer half stays here until a
/// stream claims it. Entries are evicted by the background sweeper once
/// they are completed (or were never claimed) and older than the TTL.
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<Mutex<HashMap<String, TaskEntry>>>,
    queue_capacity: usize,
    ttl: Duration,
}

struct TaskEntry {
    receiver: Option<mpsc::Receiver<TaskEvent>>,
    done: bool,
    created_at: Instant,
    completed_at: Option<Instant>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ClaimError {
    UnknownTask,
    AlreadyStreaming,
}

impl TaskRegistry {
    pub fn new(queue_capacity: usize, ttl: Duration) -> Self {
        TaskRegistry {
            inner: Arc::new(Mutex::new(HashMap::new())),
            queue_capacity,
            ttl,
        }
    }

    /// Register a new task and hand back its id together with the sender
    /// half of the event queue. Ids are fresh UUIDs and never reused.
    pub fn create(&self) -> (String, mpsc::Sender<TaskEvent>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let task_id = Uuid::new_v4().to_string();

        let mut map = self.inner.lock().unwrap();
        map.insert(
            task_id.clone(),
            TaskEntry {
                receiver: Some(rx),
                done: false,
                created_at: Instant::now(),
                completed_at: None,
            },
        );

        (task_id, tx)
    }

    /// Take the consumer half of a task's event queue. Each task supports
    /// exactly one stream; a second claim fails.
    pub fn claim(&self, task_id: &str) -> Result<mpsc::Receiver<TaskEvent>, ClaimError> {
        let mut map = self.inner.lock().unwrap();
        let entry = map.get_mut(task_id).ok_or(ClaimError::UnknownTask)?;
        entry.receiver.take().ok_or(ClaimError::AlreadyStreaming)
    }

    /// Flip the task's completion flag. Called by the worker on every exit
    /// path, strictly after its last event send. Flips at most once.
    pub fn mark_done(&self, task_id: &str) {
        let mut map = self.inner.lock().unwrap();
        if let Some(entry) = map.get_mut(task_id) {
            if !entry.done {
                entry.done = true;
                entry.completed_at = Some(Instant::now());
            }
        }
    }

    pub fn is_done(&self, task_id: &str) -> Option<bool> {
        let map = self.inner.lock().unwrap();
        map.get(task_id).map(|entry| entry.done)
    }

    /// Drop entries whose completion is older than the TTL, and entries
    /// nobody ever started streaming within the TTL. Dropping the receiver
    /// makes a still-blocked worker's sends fail, which unblocks it.
    pub fn sweep(&self) -> usize {
        let mut map = self.inner.lock().unwrap();
        let before = map.len();
        map.retain(|_, entry| {
            let expired = entry.done
                && entry
                    .completed_at
                    .map(|at| at.elapsed() >= self.ttl)
                    .unwrap_or(false);
            let abandoned = entry.receiver.is_some() && entry.created_at.elapsed() >= self.ttl;
            !(expired || abandoned)
        });
        before - map.len()
    }
}

/// Periodic eviction loop, spawned once at startup.
pub async fn run_sweeper(registry: TaskRegistry) {
    let mut interval = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
    loop {
        interval.tick().await;
        let evicted = registry.sweep();
        if evicted > 0 {
            tracing::info!("Evicted {} expired task entries", evicted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_order_then_channel_closes() {
        let registry = TaskRegistry::new(8, Duration::from_secs(60));
        let (task_id, tx) = registry.create();

        tx.send(TaskEvent::Log { line: "one".to_string() }).await.unwrap();
        tx.send(TaskEvent::Log { line: "two".to_string() }).await.unwrap();
        drop(tx);
        registry.mark_done(&task_id);

        let mut rx = registry.claim(&task_id).unwrap();
        assert_eq!(rx.recv().await, Some(TaskEvent::Log { line: "one".to_string() }));
        assert_eq!(rx.recv().await, Some(TaskEvent::Log { line: "two".to_string() }));
        assert_eq!(rx.recv().await, None);
        assert_eq!(registry.is_done(&task_id), Some(true));
    }

    #[tokio::test]
    async fn claim_is_single_use() {
        let registry = TaskRegistry::new(8, Duration::from_secs(60));
        let (task_id, _tx) = registry.create();

        assert!(registry.claim(&task_id).is_ok());
        assert_eq!(registry.claim(&task_id).unwrap_err(), ClaimError::AlreadyStreaming);
        assert_eq!(registry.claim("no-such-task").unwrap_err(), ClaimError::UnknownTask);
    }

    #[tokio::test]
    async fn sweep_evicts_completed_and_unclaimed_entries() {
        let registry = TaskRegistry::new(8, Duration::from_secs(0));
        let (abandoned, _tx_a) = registry.create();
        let (active, _tx_b) = registry.create();
        let (finished, _tx_c) = registry.create();

        let _rx_active = registry.claim(&active).unwrap();
        let _rx_finished = registry.claim(&finished).unwrap();
        registry.mark_done(&finished);

        assert_eq!(registry.sweep(), 2);
        assert_eq!(registry.claim(&abandoned).unwrap_err(), ClaimError::UnknownTask);
        assert_eq!(registry.claim(&finished).unwrap_err(), ClaimError::UnknownTask);
        // A claimed, still-running task survives the sweep.
        assert_eq!(registry.claim(&active).unwrap_err(), ClaimError::AlreadyStreaming);
    }

    #[tokio::test]
    async fn mark_done_is_idempotent() {
        let registry = TaskRegistry::new(8, Duration::from_secs(60));
        let (task_id, _tx) = registry.create();

        registry.mark_done(&task_id);
        registry.mark_done(&task_id);
        assert_eq!(registry.is_done(&task_id), Some(true));
        // Unknown ids are ignored.
        registry.mark_done("no-such-task");
    }
}
