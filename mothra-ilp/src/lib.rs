//! mothra-ilp - inductive logic programming adapters
//!
//! Wraps the external relational learners (Aleph, RSD, TreeLiker, Proper, 1BC,
//! Tertius and the SDM-Aleph web service) behind workflow components, and
//! implements the in-process utilities: wordification, feature mapping of
//! unseen examples and binary score conversion.

pub mod adapters;
pub mod engine;
pub mod library;
pub mod mapper;
pub mod scoring;
pub mod security;
pub mod wordification;

pub use engine::{Engine, EngineJob, EngineOutput, ProcessEngine, RecordingEngine};
pub use security::check_input;
