//! Domain model for tagged project elements.
//!
//! # Responsibility
//! - Define the records returned by repositories and services.
//! - Own tag normalization rules shared by every write path.
//!
//! # Invariants
//! - An element is addressed externally by its unique `identifier`.
//! - Surrogate ids are engine-assigned and never reused by callers.

pub mod element;
