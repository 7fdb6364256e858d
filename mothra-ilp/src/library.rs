//! ILP workflow components
//!
//! Every component takes its [`InputDict`] plus whatever runtime resources it
//! needs (engine, engine configuration, public files root, SDM client) and
//! returns an [`OutputDict`].

use crate::adapters::{
    Aleph, AlephRequest, PrdFctEngine, PrdFctRequest, Rsd, RsdRequest, SdmClient, SdmRequest,
    TreeLiker, TreeLikerRequest, TreeLikerRun,
};
use crate::engine::Engine;
use crate::mapper::{domain_map, FeatureFormat, MapRequest};
use crate::scoring::{to_binary_score, BinaryScore, BinaryScoreRequest};
use crate::wordification::{wordify, WordificationRequest};
use mothra_common::config::EngineConfig;
use mothra_common::workflow::FromInput;
use mothra_common::{InputDict, OutputDict, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

// ============================================================================
// Learners
// ============================================================================

pub async fn ilp_aleph(
    engine: &dyn Engine,
    config: &EngineConfig,
    input: &InputDict,
) -> Result<OutputDict> {
    let request = AlephRequest::from_input(input)?;
    let result = Aleph::new(engine, config).induce(&request).await?;
    OutputDict::from_response(&result)
}

pub async fn ilp_rsd(
    engine: &dyn Engine,
    config: &EngineConfig,
    input: &InputDict,
) -> Result<OutputDict> {
    let request = RsdRequest::from_input(input)?;
    let result = Rsd::new(engine, config).induce(&request).await?;
    OutputDict::from_response(&result)
}

#[derive(Debug, Serialize)]
pub struct TreeLikerResponse {
    pub arff: String,
    pub treeliker: TreeLikerRun,
}

pub async fn ilp_treeliker(
    engine: &dyn Engine,
    config: &EngineConfig,
    input: &InputDict,
) -> Result<OutputDict> {
    let request = TreeLikerRequest::from_input(input)?;
    let (arff, treeliker) = TreeLiker::new(engine, config).run(&request).await?;
    OutputDict::from_response(&TreeLikerResponse { arff, treeliker })
}

async fn prd_fct(
    kind: PrdFctEngine,
    engine: &dyn Engine,
    config: &EngineConfig,
    public_files_root: &Path,
    input: &InputDict,
) -> Result<OutputDict> {
    let request = PrdFctRequest::from_input_under(input, public_files_root)?;
    kind.run(engine, config, &request).await
}

pub async fn ilp_cardinalization(
    engine: &dyn Engine,
    config: &EngineConfig,
    public_files_root: &Path,
    input: &InputDict,
) -> Result<OutputDict> {
    prd_fct(PrdFctEngine::Cardinalization, engine, config, public_files_root, input).await
}

pub async fn ilp_quantiles(
    engine: &dyn Engine,
    config: &EngineConfig,
    public_files_root: &Path,
    input: &InputDict,
) -> Result<OutputDict> {
    prd_fct(PrdFctEngine::Quantiles, engine, config, public_files_root, input).await
}

pub async fn ilp_relaggs(
    engine: &dyn Engine,
    config: &EngineConfig,
    public_files_root: &Path,
    input: &InputDict,
) -> Result<OutputDict> {
    prd_fct(PrdFctEngine::Relaggs, engine, config, public_files_root, input).await
}

pub async fn ilp_1bc(
    engine: &dyn Engine,
    config: &EngineConfig,
    public_files_root: &Path,
    input: &InputDict,
) -> Result<OutputDict> {
    prd_fct(PrdFctEngine::OneBc, engine, config, public_files_root, input).await
}

pub async fn ilp_1bc2(
    engine: &dyn Engine,
    config: &EngineConfig,
    public_files_root: &Path,
    input: &InputDict,
) -> Result<OutputDict> {
    prd_fct(PrdFctEngine::OneBc2, engine, config, public_files_root, input).await
}

pub async fn ilp_tertius(
    engine: &dyn Engine,
    config: &EngineConfig,
    public_files_root: &Path,
    input: &InputDict,
) -> Result<OutputDict> {
    prd_fct(PrdFctEngine::Tertius, engine, config, public_files_root, input).await
}

// ============================================================================
// Propositionalization and subgroup discovery
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WordificationResponse {
    pub arff: String,
    pub corpus: String,
    pub idf: BTreeMap<String, f64>,
}

pub fn ilp_wordification(input: &InputDict) -> Result<OutputDict> {
    let request = WordificationRequest::from_input(input)?;
    let (arff, corpus, idf) = wordify(&request);
    OutputDict::from_response(&WordificationResponse { arff, corpus, idf })
}

#[derive(Debug, Serialize)]
pub struct TheoryResponse {
    pub theory: String,
}

pub async fn ilp_sdmaleph(client: &SdmClient, input: &InputDict) -> Result<OutputDict> {
    let request = SdmRequest::from_input(input)?;
    let theory = client.sdmaleph(&request).await?;
    info!(endpoint = client.endpoint(), theory = theory.len(), "SDM-Aleph finished");
    OutputDict::from_response(&TheoryResponse { theory })
}

/// Rule display happens in the client; nothing to compute here
pub fn ilp_sdmsegs_rule_viewer(_input: &InputDict) -> Result<OutputDict> {
    Ok(OutputDict::new())
}

// ============================================================================
// Mapping and scoring
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub evaluations: String,
}

async fn map_features(
    format: FeatureFormat,
    engine: &dyn Engine,
    config: &EngineConfig,
    input: &InputDict,
) -> Result<OutputDict> {
    let request = MapRequest::from_input(input, format)?;
    let evaluations = domain_map(engine, config, &request).await?;
    OutputDict::from_response(&MapResponse { evaluations })
}

pub async fn ilp_map_rsd(
    engine: &dyn Engine,
    config: &EngineConfig,
    input: &InputDict,
) -> Result<OutputDict> {
    map_features(FeatureFormat::Rsd, engine, config, input).await
}

pub async fn ilp_map_treeliker(
    engine: &dyn Engine,
    config: &EngineConfig,
    input: &InputDict,
) -> Result<OutputDict> {
    map_features(FeatureFormat::TreeLiker, engine, config, input).await
}

pub async fn ilp_map_aleph(
    engine: &dyn Engine,
    config: &EngineConfig,
    input: &InputDict,
) -> Result<OutputDict> {
    map_features(FeatureFormat::Aleph, engine, config, input).await
}

#[derive(Debug, Serialize)]
pub struct BinaryScoreResponse {
    pub binary_score: BinaryScore,
}

pub fn ilp_multiple_classes_to_one_binary_score(input: &InputDict) -> Result<OutputDict> {
    let request = BinaryScoreRequest::from_input(input)?;
    let binary_score =
        to_binary_score(&request.multiple_classes, request.pos_col, request.neg_col)?;
    OutputDict::from_response(&BinaryScoreResponse { binary_score })
}
