//! Component listing and invocation

use axum::{
    extract::{Path, State},
    Json,
};
use mothra_common::OutputDict;
use serde::Serialize;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::error::ApiResult;
use crate::components::{dispatch, ComponentCall, COMPONENT_NAMES};
use crate::state::SharedContext;

#[derive(Debug, Serialize)]
pub struct ComponentList {
    pub components: Vec<&'static str>,
}

/// GET /api/components
pub async fn list_components() -> Json<ComponentList> {
    Json(ComponentList {
        components: COMPONENT_NAMES.to_vec(),
    })
}

/// POST /api/components/:name
///
/// Body is `{input: {...}, postdata?: {...}}`; the response is the component's
/// output dict.
pub async fn run_component(
    State(ctx): State<SharedContext>,
    Path(name): Path<String>,
    Json(call): Json<ComponentCall>,
) -> ApiResult<Json<OutputDict>> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("component", %run_id, component = %name);

    async move {
        info!(inputs = call.input.iter().count(), "Component run started");
        match dispatch(&ctx, &name, call).await {
            Ok(output) => {
                info!(outputs = output.len(), "Component run finished");
                Ok(Json(output))
            }
            Err(e) => {
                warn!(error = %e, "Component run failed");
                Err(e.into())
            }
        }
    }
    .instrument(span)
    .await
}
