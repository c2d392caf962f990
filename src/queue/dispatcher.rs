//! Dispatcher — admits tasks and hands each to the next idle worker.
//!
//! Hand-off is two-level: an unbounded admission queue feeds a coordination
//! loop, which spawns a short-lived hand-off task per admitted task. Each
//! hand-off claims one idle worker handle from the registry and delivers the
//! task id. Many pending tasks can therefore wait for a free worker
//! concurrently without serializing the admission loop behind any single
//! worker's availability.
//!
//! Assignment order among concurrently pending tasks is unspecified: when a
//! worker frees up, which pending hand-off wins is a race. Only eventual
//! assignment is guaranteed. The admission queue has no backlog limit, so
//! under sustained overload the set of tasks waiting for a worker grows
//! without bound.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info};

use super::store::TaskStore;
use super::worker::Worker;

/// Idle registry: workers park their private hand-off senders here.
type IdleRegistry = mpsc::Receiver<mpsc::Sender<u64>>;

/// Coordinates a fixed-size worker pool. Pool size is set at startup and
/// never changes.
pub struct Dispatcher {
    queue_tx: mpsc::UnboundedSender<u64>,
    shutdown_tx: watch::Sender<bool>,
}

impl Dispatcher {
    /// Spawn `workers` worker loops and the coordination loop.
    pub fn start(store: Arc<TaskStore>, workers: usize) -> Self {
        let workers = workers.max(1);

        let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<u64>();
        let (idle_tx, idle_rx) = mpsc::channel::<mpsc::Sender<u64>>(workers);
        let idle_rx: Arc<Mutex<IdleRegistry>> = Arc::new(Mutex::new(idle_rx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        for id in 1..=workers {
            let worker = Worker::new(id, Arc::clone(&store), idle_tx.clone(), shutdown_rx.clone());
            tokio::spawn(worker.run());
        }
        info!(workers, "Worker pool started");

        let mut loop_shutdown = shutdown_rx;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    admitted = queue_rx.recv() => match admitted {
                        Some(task_id) => {
                            debug!(task_id, "Task admitted, awaiting idle worker");
                            let idle = Arc::clone(&idle_rx);
                            tokio::spawn(async move {
                                // Claim one idle handle; the mutex lets many
                                // hand-offs wait here concurrently.
                                let slot = idle.lock().await.recv().await;
                                if let Some(slot) = slot {
                                    let _ = slot.send(task_id).await;
                                }
                            });
                        }
                        None => return,
                    },
                    changed = loop_shutdown.changed() => {
                        if changed.is_err() || *loop_shutdown.borrow() {
                            return;
                        }
                    }
                }
            }
        });

        Self {
            queue_tx,
            shutdown_tx,
        }
    }

    /// Enqueue a task for eventual assignment to some idle worker. No bound
    /// on wait time, no FIFO guarantee.
    pub fn submit(&self, task_id: u64) {
        if self.queue_tx.send(task_id).is_err() {
            debug!(task_id, "Submit after dispatcher shutdown, task dropped");
        }
    }

    /// Flip the shutdown flag. Workers exit at their next suspension point;
    /// tasks still waiting for a worker are abandoned (state is in-memory
    /// only, nothing survives the process anyway).
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
