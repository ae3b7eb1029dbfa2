//! Asynchronous job subsystem: in-memory store and the research worker.

pub mod store;
pub mod worker;
