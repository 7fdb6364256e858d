//! Adapters for the external relational learners
//!
//! Each adapter follows the same three steps: read `set/2` facts from an
//! optional settings file, merge them with compiled defaults and explicit
//! parameters ([`merge_settings`](mothra_common::settings::merge_settings)),
//! then screen every user-supplied Prolog text, run the engine and reshape its
//! output.

pub mod aleph;
pub mod prd_fct;
pub mod rsd;
pub mod sdmaleph;
pub mod treeliker;

pub use aleph::{Aleph, AlephRequest, AlephResult};
pub use prd_fct::{PrdFctEngine, PrdFctRequest};
pub use rsd::{Rsd, RsdRequest, RsdResult};
pub use sdmaleph::{SdmClient, SdmExamples, SdmRequest};
pub use treeliker::{TreeLiker, TreeLikerRequest, TreeLikerRun};

use mothra_common::settings::parse_settings_facts;
use mothra_common::Result;

/// `set/2` facts of an optional settings file
pub(crate) fn file_settings(settings: Option<&str>) -> Result<Vec<(String, String)>> {
    match settings {
        Some(text) if !text.trim().is_empty() => parse_settings_facts(text),
        _ => Ok(Vec::new()),
    }
}

/// Prolog quoted atom for a file path
pub(crate) fn quoted_path(path: &std::path::Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "\\'"))
}
