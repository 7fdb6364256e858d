//! TreeLiker: tree-like relational feature construction (Java)
//!
//! Runs `java -jar treeliker.jar -batch <file>` with a generated batch file.
//! Only settings the user actually supplied are written; TreeLiker's own
//! defaults apply to the rest.

use crate::engine::{Engine, EngineJob};
use mothra_common::config::EngineConfig;
use mothra_common::settings::{
    bool_value, plain_value, float_value, non_negative_int, EngineSettings, ParamMetadata,
};
use mothra_common::workflow::FromInput;
use mothra_common::{InputDict, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const PARAMS: &[ParamMetadata] = &[
    ParamMetadata {
        key: "algorithm",
        default_value: "relf",
        description: "Pattern search algorithm (relf, hifi, poly)",
        validator: algorithm_value,
    },
    ParamMetadata {
        key: "minimum_frequency",
        default_value: "1",
        description: "Minimum pattern frequency",
        validator: float_value,
    },
    ParamMetadata {
        key: "covered_class",
        default_value: "",
        description: "Class whose examples patterns must cover",
        validator: plain_value,
    },
    ParamMetadata {
        key: "maximum_size",
        default_value: "",
        description: "Maximum pattern size",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "use_sampling",
        default_value: "false",
        description: "Sample examples when counting",
        validator: bool_value,
    },
    ParamMetadata {
        key: "sample_size",
        default_value: "",
        description: "Number of sampled examples",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "max_degree",
        default_value: "",
        description: "Maximum degree of pattern variables",
        validator: non_negative_int,
    },
];

fn algorithm_value(s: &str) -> std::result::Result<(), String> {
    match s.trim() {
        "relf" | "hifi" | "poly" => Ok(()),
        other => Err(format!("'{}' is not relf, hifi or poly", other)),
    }
}

const DATASET_FILE: &str = "dataset.txt";
const BATCH_FILE: &str = "settings.treeliker";
const ARFF_FILE: &str = "dataset.arff";

pub struct TreeLikerRequest {
    pub template: String,
    pub dataset: String,
    pub settings: EngineSettings,
}

impl FromInput for TreeLikerRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        let mut settings = EngineSettings::default();
        for meta in PARAMS {
            if let Some(value) = input.non_empty_str(meta.key) {
                meta.validate(&value)?;
                settings.set(meta.key, value);
            }
        }
        Ok(Self {
            template: input.required_str("template")?,
            dataset: input.required_str("dataset")?,
            settings,
        })
    }
}

/// Handle describing a finished run; lets later components reuse the template
/// and settings on unseen data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeLikerRun {
    pub template: String,
    pub settings: Vec<(String, String)>,
}

pub struct TreeLiker<'a> {
    engine: &'a dyn Engine,
    config: &'a EngineConfig,
}

impl<'a> TreeLiker<'a> {
    pub fn new(engine: &'a dyn Engine, config: &'a EngineConfig) -> Self {
        Self { engine, config }
    }

    pub fn batch_file(request: &TreeLikerRequest) -> String {
        let mut batch = format!(
            "set(output_type, single)\nset(examples, '{}')\nset(template, {})\nset(output, '{}')\n",
            DATASET_FILE,
            request.template.trim(),
            ARFF_FILE
        );
        for (key, value) in request.settings.iter() {
            batch.push_str(&format!("set({}, {})\n", key, value));
        }
        batch.push_str("work(yes)\n");
        batch
    }

    pub async fn run(&self, request: &TreeLikerRequest) -> Result<(String, TreeLikerRun)> {
        let job = EngineJob::new("TreeLiker", self.config.java.clone())
            .arg("-jar")
            .arg(self.config.treeliker.display().to_string())
            .args(["-batch", BATCH_FILE])
            .input(DATASET_FILE, request.dataset.clone())
            .input(BATCH_FILE, Self::batch_file(request))
            .output(ARFF_FILE);

        let output = self.engine.run(job).await?;
        let arff = output.require_file("TreeLiker", ARFF_FILE)?.to_string();
        info!(arff_bytes = arff.len(), "TreeLiker run finished");

        let run = TreeLikerRun {
            template: request.template.clone(),
            settings: request
                .settings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        Ok((arff, run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingEngine;

    fn input() -> InputDict {
        InputDict::new()
            .with("template", "[has_atom(+molecule, -atom)]")
            .with("dataset", "pos has_atom(d1, a1)\n")
    }

    #[test]
    fn test_only_given_settings_are_written() {
        let req = TreeLikerRequest::from_input(
            &input()
                .with("algorithm", "hifi")
                .with("max_degree", "")
                .with("minimum_frequency", "0.5"),
        )
        .unwrap();
        let batch = TreeLiker::batch_file(&req);
        assert!(batch.contains("set(algorithm, hifi)\n"));
        assert!(batch.contains("set(minimum_frequency, 0.5)\n"));
        assert!(!batch.contains("max_degree"));
        assert!(batch.ends_with("work(yes)\n"));
    }

    #[test]
    fn test_invalid_setting_rejected() {
        assert!(TreeLikerRequest::from_input(&input().with("sample_size", "many")).is_err());
        assert!(TreeLikerRequest::from_input(&input().with("algorithm", "exhaustive")).is_err());
        // a class name cannot add lines to the batch file
        assert!(TreeLikerRequest::from_input(
            &input().with("covered_class", "pos)\nset(output, '/etc/passwd'")
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_run_uses_java_batch_mode() {
        let engine = RecordingEngine::new().with_file(ARFF_FILE, "@RELATION treeliker\n");
        let config = EngineConfig::default();
        let req = TreeLikerRequest::from_input(&input()).unwrap();

        let (arff, run) = TreeLiker::new(&engine, &config).run(&req).await.unwrap();
        assert_eq!(arff, "@RELATION treeliker\n");
        assert_eq!(run.template, "[has_atom(+molecule, -atom)]");

        let jobs = engine.jobs().await;
        let job = &jobs[0];
        assert_eq!(job.program, "java");
        assert_eq!(job.args[0], "-jar");
        assert_eq!(&job.args[2..], &["-batch", BATCH_FILE]);
    }
}
