//! RSD: relational subgroup discovery by first-order feature construction
//!
//! RSD constructs first-order features from mode-declared background knowledge,
//! propositionalizes the examples into an ARFF table and, when asked,
//! induces CN2-SD subgroup rules over those features.

use super::{file_settings, quoted_path};
use crate::engine::{Engine, EngineJob};
use crate::security::check_input;
use mothra_common::config::EngineConfig;
use mothra_common::settings::{
    bool_value, merge_settings, non_negative_int, EngineSettings, ParamMetadata,
};
use mothra_common::workflow::FromInput;
use mothra_common::{Error, InputDict, Result};
use serde::Serialize;
use tracing::info;

pub const ESSENTIAL_PARAMS: &[ParamMetadata] = &[
    ParamMetadata {
        key: "clauselength",
        default_value: "8",
        description: "Maximum literals in a feature",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "depth",
        default_value: "4",
        description: "Maximum variable depth",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "negation",
        default_value: "none",
        description: "Use of negated features (none, only, all)",
        validator: negation_value,
    },
    ParamMetadata {
        key: "min_coverage",
        default_value: "1",
        description: "Minimum examples a feature must cover",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "filtering",
        default_value: "true",
        description: "Drop features that cover the same examples",
        validator: bool_value,
    },
];

fn negation_value(s: &str) -> std::result::Result<(), String> {
    match s.trim() {
        "none" | "only" | "all" => Ok(()),
        other => Err(format!("'{}' is not none, only or all", other)),
    }
}

const FEATURES_FILE: &str = "features.pl";
const ARFF_FILE: &str = "data.arff";
const RULES_FILE: &str = "rules.txt";

/// Examples are given either as one `target(Class, Id)` file or as separate
/// positive and negative files
#[derive(Debug, Clone, PartialEq)]
pub enum RsdExamples {
    Labelled(String),
    PosNeg { pos: String, neg: String },
}

pub struct RsdRequest {
    pub settings: Option<String>,
    pub b: String,
    pub examples: RsdExamples,
    /// Also induce CN2-SD subgroups
    pub subgroups: bool,
    pub params: InputDict,
}

impl FromInput for RsdRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        let examples = match (
            input.non_empty_str("examples"),
            input.non_empty_str("pos"),
            input.non_empty_str("neg"),
        ) {
            (Some(examples), _, _) => RsdExamples::Labelled(examples),
            (None, Some(pos), Some(neg)) => RsdExamples::PosNeg { pos, neg },
            _ => {
                return Err(Error::invalid(
                    "RSD needs either examples or both positive and negative examples",
                ))
            }
        };
        Ok(Self {
            settings: input.non_empty_str("settings"),
            b: input.required_str("b")?,
            examples,
            subgroups: input.flag("subgroups"),
            params: input.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsdResult {
    pub features: String,
    pub arff: String,
    pub rules: String,
}

pub struct Rsd<'a> {
    engine: &'a dyn Engine,
    config: &'a EngineConfig,
}

impl<'a> Rsd<'a> {
    pub fn new(engine: &'a dyn Engine, config: &'a EngineConfig) -> Self {
        Self { engine, config }
    }

    pub fn settings(request: &RsdRequest) -> Result<EngineSettings> {
        let from_file = file_settings(request.settings.as_deref())?;
        merge_settings(ESSENTIAL_PARAMS, &from_file, &request.params)
    }

    pub async fn induce(&self, request: &RsdRequest) -> Result<RsdResult> {
        let settings = Self::settings(request)?;
        check_input(Some(request.b.as_str()))?;
        check_input(request.settings.as_deref())?;
        let directives = settings.to_prolog_directives();
        check_input(Some(directives.as_str()))?;

        let background = format!("{}\n{}", directives, request.b);
        let mut job = EngineJob::new("RSD", self.config.prolog.clone())
            .args(["-l", "driver.pl"])
            .input("data.b", background)
            .input("driver.pl", self.driver(request))
            .output(FEATURES_FILE)
            .output(ARFF_FILE)
            .output(RULES_FILE);

        match &request.examples {
            RsdExamples::Labelled(examples) => {
                check_input(Some(examples.as_str()))?;
                job = job.input("data.pl", examples.clone());
            }
            RsdExamples::PosNeg { pos, neg } => {
                check_input(Some(pos.as_str()))?;
                check_input(Some(neg.as_str()))?;
                job = job.input("data.f", pos.clone()).input("data.n", neg.clone());
            }
        }

        let output = self.engine.run(job).await?;
        let result = RsdResult {
            features: output.require_file("RSD", FEATURES_FILE)?.to_string(),
            arff: output.require_file("RSD", ARFF_FILE)?.to_string(),
            rules: output.file_or_empty(RULES_FILE),
        };

        info!(
            subgroups = request.subgroups,
            features_bytes = result.features.len(),
            arff_bytes = result.arff.len(),
            "RSD induction finished"
        );
        Ok(result)
    }

    fn driver(&self, request: &RsdRequest) -> String {
        let mut driver = format!(
            ":- consult({}).\n:- read_all(data).\n:- featurize.\n\
             :- write_features('{}').\n:- write_arff('{}').\n",
            quoted_path(&self.config.rsd),
            FEATURES_FILE,
            ARFF_FILE
        );
        if request.subgroups {
            driver.push_str(&format!(":- cn2sd.\n:- write_rules('{}').\n", RULES_FILE));
        }
        driver.push_str(":- halt.\n");
        driver
    }
}
