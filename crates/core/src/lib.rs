//! Domain types and pure transformations for the tiered publishing client.
//!
//! Nothing in this crate performs I/O: the markdown transformer, the
//! editor-tree encoder and the session value types are all deterministic
//! so they can be exercised without a network or a database.

pub mod document;
pub mod error;
pub mod markdown;
pub mod prose;
pub mod publish;
pub mod session;
pub mod types;
