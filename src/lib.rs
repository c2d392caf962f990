//! Progressor — arithmetic progression task queue service.

pub mod api;
pub mod config;
pub mod error;
pub mod queue;
