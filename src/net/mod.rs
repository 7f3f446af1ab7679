//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerSpec (name, host:port)
//!     → listener.rs (parse address, bind socket)
//!     → handed to a service lifecycle for serving
//! ```
//!
//! # Design Decisions
//! - Bind errors are returned synchronously, never deferred to the serve loop
//! - Each listener is owned by exactly one service

pub mod listener;

pub use listener::{bind, ListenerError};
