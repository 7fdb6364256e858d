//! Database workflow components
//!
//! Each component decodes a typed request from its [`InputDict`], does its work
//! and returns a typed response serialized into an [`OutputDict`].

use crate::connection::{DbConnection, Vendor};
use crate::context::{ContextSelection, DbContext};
use crate::converters::{
    AlephConverter, OrangeConverter, PrdFctConverter, RsdConverter, TabDataset,
    TreeLikerConverter,
};
use crate::discretization::DiscretizationIntervals;
use mothra_common::workflow::FromInput;
use mothra_common::{Error, InputDict, OutputDict, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// Connection and context
// ============================================================================

pub struct ConnectRequest {
    pub connection: DbConnection,
}

impl FromInput for ConnectRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        let vendor: Vendor = input.required_str("vendor")?.parse()?;
        Ok(Self {
            connection: DbConnection::new(
                vendor,
                input.required_str("host")?,
                input.required_str("database")?,
                input.required_str("user")?,
                input.required_str("password")?,
            ),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub connection: DbConnection,
}

/// Verify the credentials by connecting once and hand the descriptor on
pub async fn database_connect(input: &InputDict) -> Result<OutputDict> {
    let request = ConnectRequest::from_input(input)?;
    let pool = request.connection.connect().await?;
    pool.close().await;
    OutputDict::from_response(&ConnectResponse {
        connection: request.connection,
    })
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub context: Option<DbContext>,
}

/// Interactive step; the context is produced once the user posts a selection
pub fn mysql_db_context(_input: &InputDict) -> Result<OutputDict> {
    OutputDict::from_response(&ContextResponse { context: None })
}

pub struct ContextFinishedRequest {
    pub connection: DbConnection,
    pub find_connections: bool,
}

impl FromInput for ContextFinishedRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        Ok(Self {
            connection: input.required_typed("connection")?,
            find_connections: input.flag("find_connections"),
        })
    }
}

pub async fn mysql_db_context_finished(postdata: &Value, input: &InputDict) -> Result<OutputDict> {
    let request = ContextFinishedRequest::from_input(input)?;
    let selection: ContextSelection = serde_json::from_value(postdata.clone())
        .map_err(|e| Error::invalid(format!("malformed context selection: {}", e)))?;

    let context =
        DbContext::build(&request.connection, &selection, request.find_connections).await?;
    OutputDict::from_response(&ContextResponse {
        context: Some(context),
    })
}

#[derive(Debug, Serialize)]
pub struct OdtResponse {
    pub dataset: Option<Value>,
}

pub fn mysql_query_to_odt(_input: &InputDict) -> Result<OutputDict> {
    OutputDict::from_response(&OdtResponse { dataset: None })
}

// ============================================================================
// Converters
// ============================================================================

/// Shared converter parameters
pub struct ConverterRequest {
    pub context: DbContext,
    pub discr_intervals: DiscretizationIntervals,
    /// Accepted for compatibility; output is the same either way
    pub dump: bool,
}

impl FromInput for ConverterRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        let discr_intervals: DiscretizationIntervals =
            input.optional_typed("discr_intervals")?.unwrap_or_default();
        discr_intervals.validate()?;
        Ok(Self {
            context: input.required_typed("context")?,
            discr_intervals,
            dump: input.flag("dump"),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RsdResponse {
    pub examples: String,
    pub bk: String,
}

pub fn mysql_rsd_converter(input: &InputDict) -> Result<OutputDict> {
    let request = ConverterRequest::from_input(input)?;
    let rsd = RsdConverter::new(&request.context, &request.discr_intervals)?;
    let response = RsdResponse {
        examples: rsd.all_examples(),
        bk: rsd.background_knowledge(),
    };
    debug!(
        examples = response.examples.len(),
        bk = response.bk.len(),
        dump = request.dump,
        "RSD artifacts generated"
    );
    OutputDict::from_response(&response)
}

pub struct AlephConverterRequest {
    pub target_att_val: String,
    pub converter: ConverterRequest,
}

impl FromInput for AlephConverterRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        // Checked before the context is decoded
        let target_att_val = input
            .non_empty_str("target_att_val")
            .ok_or_else(|| Error::invalid("Please specify a target attribute value."))?;
        Ok(Self {
            target_att_val,
            converter: ConverterRequest::from_input(input)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AlephResponse {
    pub pos_examples: String,
    pub neg_examples: String,
    pub bk: String,
}

pub fn mysql_aleph_converter(input: &InputDict) -> Result<OutputDict> {
    let request = AlephConverterRequest::from_input(input)?;
    let aleph = AlephConverter::new(
        &request.converter.context,
        &request.target_att_val,
        &request.converter.discr_intervals,
    )?;
    OutputDict::from_response(&AlephResponse {
        pos_examples: aleph.positive_examples(),
        neg_examples: aleph.negative_examples(),
        bk: aleph.background_knowledge(),
    })
}

#[derive(Debug, Serialize)]
pub struct TreeLikerResponse {
    pub dataset: String,
    pub template: String,
}

pub fn mysql_treeliker_converter(input: &InputDict) -> Result<OutputDict> {
    let request = ConverterRequest::from_input(input)?;
    let treeliker = TreeLikerConverter::new(&request.context, &request.discr_intervals)?;
    OutputDict::from_response(&TreeLikerResponse {
        dataset: treeliker.dataset(),
        template: treeliker.default_template(),
    })
}

#[derive(Debug, Serialize)]
pub struct OrangeResponse {
    pub target_table_dataset: TabDataset,
    pub other_table_datasets: Vec<TabDataset>,
}

pub fn mysql_orange_converter(input: &InputDict) -> Result<OutputDict> {
    let context: DbContext = input.required_typed("context")?;
    let orange = OrangeConverter::new(&context);
    OutputDict::from_response(&OrangeResponse {
        target_table_dataset: orange.target_table_dataset(),
        other_table_datasets: orange.other_table_datasets(),
    })
}

#[derive(Debug, Serialize)]
pub struct PrdFctResponse {
    pub prd_file: String,
    pub fct_file: String,
}

/// Writes the files under `public_files_root` and returns their paths
pub fn mysql_prd_fct_converter(input: &InputDict, public_files_root: &Path) -> Result<OutputDict> {
    let context: DbContext = input.required_typed("context")?;
    let (prd, fct) = PrdFctConverter::new(&context).write_files(public_files_root)?;
    info!(prd = %prd.display(), fct = %fct.display(), "PRD/FCT conversion complete");
    OutputDict::from_response(&PrdFctResponse {
        prd_file: prd.display().to_string(),
        fct_file: fct.display().to_string(),
    })
}
