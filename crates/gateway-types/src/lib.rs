//! Common types module for the payment gateway.
//!
//! This module defines the data types shared by every gateway component: the
//! order model and its lifecycle, the balance service wire schema, the uniform
//! result envelope, the closed error taxonomy and the configuration validation
//! helpers used by pluggable implementations.

/// Envelope and host-facing request/response types.
pub mod api;
/// Balance service wire schema (products, balances, preorders, completions).
pub mod balance;
/// Closed error taxonomy shared across crates.
pub mod error;
/// Structured log events and redaction of sensitive payload fields.
pub mod logging;
/// Order model, lifecycle status and the create-order command.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Storage namespaces.
pub mod storage;
/// Utility functions.
pub mod utils;
/// Configuration validation types for pluggable implementations.
pub mod validation;
/// Case-insensitive wire key handling.
pub mod wire;

pub use api::*;
pub use balance::*;
pub use error::*;
pub use logging::{redact_sensitive, LogEvent, LogType};
pub use order::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use utils::truncate_id;
pub use validation::*;
pub use wire::canonicalize_keys;
