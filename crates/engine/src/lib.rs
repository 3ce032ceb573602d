//! `paymatch-engine` — transaction-to-invoice reconciliation matching engine.
//!
//! Pure engine crate: receives snapshot records, returns classified matches.
//! No network or persistence dependencies; the semantic disambiguator is a
//! trait implemented elsewhere.

pub mod candidate;
pub mod classify;
pub mod combine;
pub mod config;
pub mod engine;
pub mod error;
pub mod load;
pub mod model;
pub mod normalize;
pub mod processor;
pub mod resolve;
pub mod semantic;
pub mod strategy;
pub mod subset;

pub use config::EngineConfig;
pub use engine::run;
pub use error::EngineError;
pub use model::{Invoice, Match, RunInput, RunResult, Transaction};
pub use semantic::{Disambiguator, SemanticRequest, SemanticVerdict};
