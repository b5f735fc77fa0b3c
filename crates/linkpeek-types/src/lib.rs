//! Foundation types for linkpeek.
//!
//! This crate contains the host-agnostic types shared by all linkpeek
//! crates: pointer events, geometry, configuration, and error types.

pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
