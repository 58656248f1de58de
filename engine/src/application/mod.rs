//! Application Layer
//! Composition root exposing the control boundary to driving adapters

pub mod registry;

pub use registry::Application;
