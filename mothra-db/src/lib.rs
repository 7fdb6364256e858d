//! mothra-db - relational database context and format converters
//!
//! Builds a [`DbContext`] snapshot from a MySQL or PostgreSQL database and turns
//! it into the artifacts the relational learners consume: Prolog background
//! knowledge and examples (RSD, Aleph), TreeLiker datasets, Orange tables and
//! Proper PRD/FCT files.

pub mod connection;
pub mod context;
pub mod converters;
pub mod discretization;
pub mod library;
pub mod schema;

pub use connection::{DbConnection, DbPool, Vendor};
pub use context::{ContextSelection, DbContext, Link, LinkKind, TableData};
pub use discretization::DiscretizationIntervals;
pub use schema::{ColumnInfo, DbSchema, Relation};
