//! `quire-worker` library crate.
//!
//! Configuration, document loading and wiring for the publishing worker.
//! The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod source;
pub mod wiring;
