//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod accounts;
pub mod catalog;
pub mod clock;
pub mod ports;
