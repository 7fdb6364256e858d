//! SDM-Aleph web service client
//!
//! Semantic subgroup discovery runs remotely: the examples, the mapping of
//! examples to ontology terms and the ontologies themselves are posted as JSON
//! to `<endpoint>/sdmaleph`, which answers with the induced theory.

use mothra_common::config::SdmConfig;
use mothra_common::workflow::FromInput;
use mothra_common::{Error, InputDict, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = concat!("mothra/", env!("CARGO_PKG_VERSION"));

/// SDM client errors
#[derive(Debug, thiserror::Error)]
pub enum SdmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("SDM service error {0}: {1}")]
    Service(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<SdmError> for Error {
    fn from(err: SdmError) -> Self {
        Error::Http(err.to_string())
    }
}

/// Accepted shapes of the `examples` input
#[derive(Debug, Clone, PartialEq)]
pub enum SdmExamples {
    /// Text in one of the service's data formats
    Text(String),
    /// Example records, sent JSON-encoded
    List(Vec<Value>),
    /// Orange table (`{name, tab}`), sent as `.tab` text
    Table(String),
}

impl SdmExamples {
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            Some(Value::String(text)) => Ok(SdmExamples::Text(text.clone())),
            Some(Value::Array(items)) => Ok(SdmExamples::List(items.clone())),
            Some(Value::Object(table)) => match table.get("tab") {
                Some(Value::String(tab)) => Ok(SdmExamples::Table(tab.clone())),
                _ => Err(illegal_examples()),
            },
            _ => Err(illegal_examples()),
        }
    }

    /// Text payload sent to the service
    pub fn to_payload(&self) -> Result<String> {
        match self {
            SdmExamples::Text(text) | SdmExamples::Table(text) => Ok(text.clone()),
            SdmExamples::List(items) => Ok(serde_json::to_string(items)?),
        }
    }
}

fn illegal_examples() -> Error {
    Error::Unsupported("Illegal examples format. Supported formats: str, list or Orange".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OntologyEntry {
    pub ontology: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationEntry {
    pub relation: String,
}

/// Request body; empty optional parameters are sent as `null`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdmRequest {
    pub examples: String,
    pub mapping: Option<String>,
    pub ontologies: Vec<OntologyEntry>,
    pub relations: Vec<RelationEntry>,
    pub pos_class_val: Option<String>,
    pub cutoff: Option<String>,
    pub min_pos: Option<String>,
    pub noise: Option<String>,
    pub clause_len: Option<String>,
    pub data_format: Option<String>,
}

impl FromInput for SdmRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        let examples = SdmExamples::from_value(input.get("examples"))?.to_payload()?;
        Ok(Self {
            examples,
            mapping: input.optional_str("mapping"),
            ontologies: input
                .string_list("ontology")?
                .into_iter()
                .map(|ontology| OntologyEntry { ontology })
                .collect(),
            relations: input
                .string_list("relation")?
                .into_iter()
                .map(|relation| RelationEntry { relation })
                .collect(),
            pos_class_val: input.non_empty_str("posClassVal"),
            cutoff: input.non_empty_str("cutoff"),
            min_pos: input.non_empty_str("minPos"),
            noise: input.non_empty_str("noise"),
            clause_len: input.non_empty_str("clauseLen"),
            data_format: input.non_empty_str("dataFormat"),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SdmResponse {
    theory: String,
}

/// SDM-Aleph service client
pub struct SdmClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl SdmClient {
    pub fn new(config: &SdmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SdmError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run SDM-Aleph remotely and return the theory
    pub async fn sdmaleph(&self, request: &SdmRequest) -> Result<String> {
        let url = format!("{}/sdmaleph", self.endpoint);
        tracing::debug!(
            url = %url,
            ontologies = request.ontologies.len(),
            examples_bytes = request.examples.len(),
            "Calling SDM-Aleph service"
        );

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| SdmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SdmError::Service(status.as_u16(), body).into());
        }

        let parsed: SdmResponse = response
            .json()
            .await
            .map_err(|e| SdmError::Parse(e.to_string()))?;

        tracing::info!(theory_bytes = parsed.theory.len(), "SDM-Aleph finished");
        Ok(parsed.theory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Local SDM service answering every POST with `status` and `reply`;
    /// returns its endpoint and the bodies it received
    async fn sdm_service(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let seen = received.clone();
        let app = Router::new().route(
            "/sdmaleph",
            post(move |Json(body): Json<Value>| {
                let seen = seen.clone();
                let reply = reply.clone();
                async move {
                    seen.lock().unwrap().push(body);
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), received)
    }

    fn client(endpoint: String) -> SdmClient {
        SdmClient::new(&SdmConfig {
            endpoint,
            timeout_secs: 10,
        })
        .unwrap()
    }

    fn sample_request() -> SdmRequest {
        let input = InputDict::new()
            .with("examples", "g1\t1.5\ng2\t0.3\n")
            .with("mapping", "g1 GO:1\n")
            .with("ontology", "go.owl")
            .with("posClassVal", "pos");
        SdmRequest::from_input(&input).unwrap()
    }

    #[test]
    fn test_example_shapes() {
        assert_eq!(
            SdmExamples::from_value(Some(&json!("a\tb"))).unwrap(),
            SdmExamples::Text("a\tb".to_string())
        );
        assert_eq!(
            SdmExamples::from_value(Some(&json!([{"id": 1}])))
                .unwrap()
                .to_payload()
                .unwrap(),
            r#"[{"id":1}]"#
        );
        assert_eq!(
            SdmExamples::from_value(Some(&json!({"name": "genes", "tab": "id\tclass\n"}))).unwrap(),
            SdmExamples::Table("id\tclass\n".to_string())
        );

        let err = SdmExamples::from_value(Some(&json!(42))).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert!(err.to_string().contains("Supported formats: str, list or Orange"));
        assert!(SdmExamples::from_value(None).is_err());
    }

    #[test]
    fn test_empty_optionals_become_null() {
        let input = InputDict::new()
            .with("examples", "data")
            .with("mapping", "g1 t1")
            .with("ontology", json!(["go.owl", "kegg.owl"]))
            .with("relation", "rel.n3")
            .with("posClassVal", "")
            .with("cutoff", "100")
            .with("minPos", "");
        let request = SdmRequest::from_input(&input).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["ontologies"], json!([{"ontology": "go.owl"}, {"ontology": "kegg.owl"}]));
        assert_eq!(body["relations"], json!([{"relation": "rel.n3"}]));
        assert_eq!(body["posClassVal"], Value::Null);
        assert_eq!(body["minPos"], Value::Null);
        assert_eq!(body["cutoff"], "100");
        assert_eq!(body["clauseLen"], Value::Null);
    }

    #[tokio::test]
    async fn test_theory_from_service() {
        let (endpoint, received) =
            sdm_service(StatusCode::OK, json!({"theory": "pos(X) :- GO_1(X)."})).await;
        let theory = client(endpoint).sdmaleph(&sample_request()).await.unwrap();
        assert_eq!(theory, "pos(X) :- GO_1(X).");

        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["examples"], "g1\t1.5\ng2\t0.3\n");
        assert_eq!(bodies[0]["ontologies"], json!([{"ontology": "go.owl"}]));
        assert_eq!(bodies[0]["posClassVal"], "pos");
        assert_eq!(bodies[0]["cutoff"], Value::Null);
    }

    #[tokio::test]
    async fn test_service_failure_is_http_error() {
        let (endpoint, _) =
            sdm_service(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})).await;
        let err = client(endpoint).sdmaleph(&sample_request()).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert!(err.to_string().contains("500"), "{}", err);
    }

    #[tokio::test]
    async fn test_response_without_theory_is_http_error() {
        let (endpoint, _) = sdm_service(StatusCode::OK, json!({"rules": []})).await;
        let err = client(endpoint).sdmaleph(&sample_request()).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[test]
    fn test_client_uses_configured_endpoint() {
        let config = SdmConfig {
            endpoint: "http://localhost:8097/".to_string(),
            timeout_secs: 3600,
        };
        let client = SdmClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8097");
    }
}
