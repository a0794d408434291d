//! Session lifecycle and tiered publishing.
//!
//! [`store`] persists the platform session, [`bootstrap`] turns whatever is
//! stored (or a fresh browser login) into a verified session, and
//! [`orchestrator`] publishes the free and paid editions with it.

pub mod bootstrap;
pub mod orchestrator;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
