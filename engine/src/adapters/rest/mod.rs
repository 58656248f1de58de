//! REST API Driving Adapter
//!
//! Exposes the control boundary through a JSON HTTP API

pub mod handlers;
pub mod router;
pub mod server;

pub use router::build_router;
pub use server::serve_on_tcp;
