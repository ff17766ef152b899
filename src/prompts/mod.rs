//! Prompt module for LLM-based operations.
//!
//! This module provides the versioned prompt templates sent to the model.

pub mod paper_analysis;

pub use paper_analysis::*;
