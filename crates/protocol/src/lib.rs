//! Shared data types for face-verification session orchestration.
//!
//! This crate contains the serde-serializable shapes that cross the boundary
//! between the orchestration core, the embedding application, and the
//! identity service.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization and small predicates
//! * Stable: Names match the vocabulary the embedding application already consumes
//!
//! Session orchestration built on top of these types lives in `fv-rs`.

pub mod enrollment;
pub mod event;
pub mod status;

pub use enrollment::*;
pub use event::*;
pub use status::*;
