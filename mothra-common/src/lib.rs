//! # Mothra Common Library
//!
//! Shared code for the Mothra workflow crates:
//! - Error types
//! - Configuration loading (TOML + environment)
//! - Workflow component ABI (input/output dictionaries)
//! - Engine settings merge
//! - Tracing initialization

pub mod config;
pub mod error;
pub mod logging;
pub mod settings;
pub mod workflow;

pub use error::{Error, Result};
pub use workflow::{InputDict, OutputDict};
