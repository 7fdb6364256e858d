//! Runtime resources shared by every component call

use mothra_common::config::MothraConfig;
use mothra_common::Result;
use mothra_ilp::adapters::SdmClient;
use mothra_ilp::{Engine, ProcessEngine};
use std::sync::Arc;

/// Built once at startup and handed to the router
pub struct AppContext {
    pub config: MothraConfig,
    pub engine: Arc<dyn Engine>,
    pub sdm: SdmClient,
}

impl AppContext {
    /// Context running engines as local processes
    pub fn new(config: MothraConfig) -> Result<Self> {
        Self::with_engine(config, Arc::new(ProcessEngine::new()))
    }

    pub fn with_engine(config: MothraConfig, engine: Arc<dyn Engine>) -> Result<Self> {
        let sdm = SdmClient::new(&config.sdm)?;
        Ok(Self {
            config,
            engine,
            sdm,
        })
    }
}

/// Handler state
pub type SharedContext = Arc<AppContext>;
