//! Worker lifecycle management for the external classifier process.

mod wsd_worker;

pub use wsd_worker::WorkerManager;
