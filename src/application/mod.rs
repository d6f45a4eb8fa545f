//! Preview-synchronization engine.
//!
//! Everything here runs on one event loop ([`session::PreviewSession`]);
//! timers and transport tasks only post events back into it.

pub mod artifacts;
pub mod cancellation;
pub mod controller;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub(crate) mod lock;
pub mod persistence;
pub mod scheduler;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;
pub mod view;
