//! Converters from a [`DbContext`](crate::DbContext) to learner input formats
//!
//! Each converter borrows the context and produces its artifacts on demand.
//! The Prolog-based formats share one walk over the context
//! ([`prolog::KnowledgeBuilder`]) so RSD, Aleph and TreeLiker see the same facts.

pub mod aleph;
pub mod orange;
pub mod prd_fct;
pub mod prolog;
pub mod rsd;
pub mod treeliker;

pub use aleph::AlephConverter;
pub use orange::{OrangeConverter, TabDataset};
pub use prd_fct::PrdFctConverter;
pub use rsd::RsdConverter;
pub use treeliker::TreeLikerConverter;
