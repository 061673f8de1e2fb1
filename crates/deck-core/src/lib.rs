//! # deck-core
//!
//! Core types, traits, and utilities for Deck RS.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Common error types with HTTP status mapping
//! - Core entity traits (Identifiable, Timestamped, SoftDeletable)
//! - Configuration types and loading

pub mod config;
pub mod error;
pub mod traits;

pub use error::*;
pub use traits::*;
