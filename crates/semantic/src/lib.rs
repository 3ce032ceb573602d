//! `paymatch-semantic` — HTTP client for the semantic disambiguation service.
//!
//! Implements the engine's `Disambiguator` trait; the engine itself never
//! links a network stack.

pub mod client;

pub use client::{SemanticClient, SemanticError};
