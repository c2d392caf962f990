//! Worker — one long-lived execution loop per pool slot.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use super::model::TaskStatus;
use super::step;
use super::store::TaskStore;

/// A worker claims one task at a time, drives it to completion through the
/// step executor, and publishes progress to the store after every step.
///
/// Exactly one worker executes a given task for its entire Running phase.
/// Pacing sleeps inside the step executor occupy this worker's slot; it
/// takes no other task while waiting.
pub struct Worker {
    id: usize,
    store: Arc<TaskStore>,
    idle_tx: mpsc::Sender<mpsc::Sender<u64>>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(
        id: usize,
        store: Arc<TaskStore>,
        idle_tx: mpsc::Sender<mpsc::Sender<u64>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            store,
            idle_tx,
            shutdown,
        }
    }

    /// Run until shutdown. Each iteration registers a fresh private
    /// hand-off channel with the dispatcher's idle registry, then blocks
    /// until a task is delivered or the shutdown flag flips.
    pub async fn run(mut self) {
        loop {
            let (slot_tx, mut slot_rx) = mpsc::channel::<u64>(1);
            if self.idle_tx.send(slot_tx).await.is_err() {
                // Dispatcher gone.
                return;
            }

            tokio::select! {
                delivered = slot_rx.recv() => match delivered {
                    Some(task_id) => self.run_task(task_id).await,
                    None => return,
                },
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!(worker = self.id, "Worker shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// Drive one task from Queued to Completed.
    ///
    /// The worker holds the only mutable copy for the whole Running phase;
    /// every mutation is published via `apply_update` before the next step
    /// begins, so readers observe steps strictly in order.
    async fn run_task(&self, task_id: u64) {
        let Some(mut task) = self.store.get(task_id).await else {
            warn!(worker = self.id, task_id, "Delivered task not found in store");
            return;
        };

        task.begin();
        self.store.apply_update(task.clone()).await;
        info!(worker = self.id, task_id, n = task.params.n, "Worker started task");

        while task.status == TaskStatus::Running {
            step::execute_step(&mut task).await;
            self.store.apply_update(task.clone()).await;
        }

        info!(
            worker = self.id,
            task_id,
            iterations = task.current_iteration,
            value = task.current_value,
            "Worker finished task"
        );
    }
}
