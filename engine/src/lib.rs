//! Bulk process manager engine
//!
//! Registers scripted projects, supervises their processes, restarts crashes
//! and serves runtime status and logs over a local REST API.

pub mod adapters;
pub mod application;
pub mod constants;
pub mod domain;
pub mod infrastructure;
