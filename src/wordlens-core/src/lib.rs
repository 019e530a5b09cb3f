//! wordlens-core - Scanner orchestration and lookup session for WordLens
//!
//! Ties the capture pipeline, the recognizer and the dictionary together:
//! the scanner streams frames into the processing worker, and the lookup
//! session turns recognized words into dictionary entries.

pub mod colored_logger;
pub mod config;
pub mod events;
pub mod scanner;
pub mod session;
pub mod worker;
