//! Core domain concepts shared by every pipeline.

pub mod error;
pub mod message;
pub mod model;
