//! Shared fixtures for unit tests.
//!
//! [`factories::TestModel`] wires a host, a stub core library that defines the platform types,
//! and an empty test assembly to populate.

pub mod factories;
