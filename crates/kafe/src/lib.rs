//! Kafe - Cafe Recommendation Engine
//!
//! Compares two retrieval strategies over a fixed corpus of cafe reviews:
//! exact keyword matching, and embedding similarity with critique-based
//! refinement and a memory of earlier users' choices.

pub mod casebase;
pub mod config;
pub mod corpus;
pub mod critique;
pub mod display;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod keyword;
pub mod lexicon;
pub mod ranker;
pub mod session;
pub mod similarity;

pub use engine::Engine;
pub use error::{KafeError, Result};
