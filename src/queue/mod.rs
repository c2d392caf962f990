//! Concurrent task queue — model, store, step executor, workers, dispatcher.

pub mod dispatcher;
pub mod model;
pub mod step;
pub mod store;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use model::{Task, TaskParameters, TaskStatus, TaskView};
pub use store::TaskStore;
