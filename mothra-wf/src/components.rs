//! Component registry
//!
//! Maps workflow component names to the library functions of `mothra-db` and
//! `mothra-ilp`, supplying the runtime resources each one needs.

use crate::state::AppContext;
use mothra_common::{Error, InputDict, OutputDict, Result};
use mothra_db::library as db;
use mothra_ilp::library as ilp;
use serde::Deserialize;
use serde_json::Value;

/// One component invocation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentCall {
    #[serde(default)]
    pub input: InputDict,
    /// Interactive widget submission, used by `mysql_db_context_finished`
    #[serde(default)]
    pub postdata: Option<Value>,
}

impl ComponentCall {
    pub fn new(input: InputDict) -> Self {
        Self {
            input,
            postdata: None,
        }
    }
}

pub const COMPONENT_NAMES: &[&str] = &[
    "database_connect",
    "mysql_db_context",
    "mysql_db_context_finished",
    "mysql_query_to_odt",
    "mysql_rsd_converter",
    "mysql_aleph_converter",
    "mysql_treeliker_converter",
    "mysql_orange_converter",
    "mysql_prd_fct_converter",
    "ilp_aleph",
    "ilp_rsd",
    "ilp_wordification",
    "ilp_treeliker",
    "ilp_cardinalization",
    "ilp_quantiles",
    "ilp_relaggs",
    "ilp_1bc",
    "ilp_1bc2",
    "ilp_tertius",
    "ilp_sdmaleph",
    "ilp_sdmsegs_rule_viewer",
    "ilp_map_rsd",
    "ilp_map_treeliker",
    "ilp_map_aleph",
    "ilp_multiple_classes_to_one_binary_score",
];

/// Run component `name`
pub async fn dispatch(ctx: &AppContext, name: &str, call: ComponentCall) -> Result<OutputDict> {
    let input = &call.input;
    let engine = ctx.engine.as_ref();
    let engines = &ctx.config.engines;
    let public = ctx.config.public_files_root.as_path();

    match name {
        "database_connect" => db::database_connect(input).await,
        "mysql_db_context" => db::mysql_db_context(input),
        "mysql_db_context_finished" => {
            let postdata = call.postdata.unwrap_or(Value::Null);
            db::mysql_db_context_finished(&postdata, input).await
        }
        "mysql_query_to_odt" => db::mysql_query_to_odt(input),
        "mysql_rsd_converter" => db::mysql_rsd_converter(input),
        "mysql_aleph_converter" => db::mysql_aleph_converter(input),
        "mysql_treeliker_converter" => db::mysql_treeliker_converter(input),
        "mysql_orange_converter" => db::mysql_orange_converter(input),
        "mysql_prd_fct_converter" => db::mysql_prd_fct_converter(input, public),

        "ilp_aleph" => ilp::ilp_aleph(engine, engines, input).await,
        "ilp_rsd" => ilp::ilp_rsd(engine, engines, input).await,
        "ilp_wordification" => ilp::ilp_wordification(input),
        "ilp_treeliker" => ilp::ilp_treeliker(engine, engines, input).await,
        "ilp_cardinalization" => ilp::ilp_cardinalization(engine, engines, public, input).await,
        "ilp_quantiles" => ilp::ilp_quantiles(engine, engines, public, input).await,
        "ilp_relaggs" => ilp::ilp_relaggs(engine, engines, public, input).await,
        "ilp_1bc" => ilp::ilp_1bc(engine, engines, public, input).await,
        "ilp_1bc2" => ilp::ilp_1bc2(engine, engines, public, input).await,
        "ilp_tertius" => ilp::ilp_tertius(engine, engines, public, input).await,
        "ilp_sdmaleph" => ilp::ilp_sdmaleph(&ctx.sdm, input).await,
        "ilp_sdmsegs_rule_viewer" => ilp::ilp_sdmsegs_rule_viewer(input),
        "ilp_map_rsd" => ilp::ilp_map_rsd(engine, engines, input).await,
        "ilp_map_treeliker" => ilp::ilp_map_treeliker(engine, engines, input).await,
        "ilp_map_aleph" => ilp::ilp_map_aleph(engine, engines, input).await,
        "ilp_multiple_classes_to_one_binary_score" => {
            ilp::ilp_multiple_classes_to_one_binary_score(input)
        }

        other => Err(Error::NotFound(format!("Unknown component '{}'", other))),
    }
}
