//! Driving Adapters
//! Entry points that translate external requests into control-boundary calls

pub mod rest;
