//! Task store — concurrent repository of task records.
//!
//! One process-wide `RwLock` guards the task map. Readers take the shared
//! lock; insertion, update publication, and expiry promotion take the
//! exclusive lock. Workers never mutate the stored task directly: they own a
//! private snapshot during execution and publish every change through
//! [`TaskStore::apply_update`], which replaces the stored record under the
//! write lock. That replacement is the happens-before edge between the
//! executing worker and any concurrent reader.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::model::{Task, TaskParameters};

struct StoreInner {
    tasks: HashMap<u64, Task>,
    next_id: u64,
}

/// Authoritative owner of every task record.
pub struct TaskStore {
    inner: RwLock<StoreInner>,
}

impl TaskStore {
    /// Create an empty store. IDs start at 1.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(StoreInner {
                tasks: HashMap::new(),
                next_id: 1,
            }),
        })
    }

    /// Admit a task: allocate the next sequential id and store a Queued
    /// record seeded with `[n1]`. Never fails for validated parameters.
    pub async fn add_task(&self, params: TaskParameters) -> u64 {
        let mut inner = self.inner.write().await;

        let id = inner.next_id;
        inner.next_id += 1;
        inner.tasks.insert(id, Task::new(id, params));

        id
    }

    /// Point lookup. Returns a snapshot clone; performs no expiry promotion
    /// (promotion is a listing side effect only).
    pub async fn get(&self, id: u64) -> Option<Task> {
        self.inner.read().await.tasks.get(&id).cloned()
    }

    /// All tasks ascending by id.
    ///
    /// Before returning, promotes every Completed task whose ttl has elapsed
    /// to Expired. The promotion mutates status, so this takes the exclusive
    /// lock even though callers treat it as a read.
    pub async fn list(&self) -> Vec<Task> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        for task in inner.tasks.values_mut() {
            if task.is_expired_at(now) {
                task.expire();
                debug!(task_id = task.id, "Task result expired");
            }
        }

        let mut list: Vec<Task> = inner.tasks.values().cloned().collect();
        list.sort_by_key(|t| t.id);
        list
    }

    /// Publish a worker-side snapshot back into the store.
    ///
    /// The worker owns the only mutable copy of a Running task; every field
    /// write becomes visible to readers through this replacement under the
    /// write lock. Snapshots for unknown ids are dropped.
    pub async fn apply_update(&self, task: Task) {
        let mut inner = self.inner.write().await;
        if let std::collections::hash_map::Entry::Occupied(mut entry) =
            inner.tasks.entry(task.id)
        {
            entry.insert(task);
        }
    }

    /// Number of tasks ever admitted (tasks are never deleted).
    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tasks.is_empty()
    }
}
