//! Bulk event client.
//!
//! Keep the public surface small: build an [`EventClient`] with
//! [`EventClientBuilder`], then submit payloads. Wiring lives under `src/client/`.

pub mod builder;
pub mod core;

pub use builder::EventClientBuilder;
pub use core::EventClient;
