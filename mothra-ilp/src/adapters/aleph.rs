//! Aleph: top-down induction of Horn clause theories
//!
//! Aleph runs inside the configured Prolog. The adapter writes the usual
//! `data.b` / `data.f` / `data.n` triple, with the merged settings prepended to
//! the background knowledge as `:- set/2` directives, and a driver that loads
//! Aleph, runs the requested induce command and saves the theory.

use super::{file_settings, quoted_path};
use crate::engine::{Engine, EngineJob};
use crate::security::check_input;
use mothra_common::config::EngineConfig;
use mothra_common::settings::{
    float_value, int_or_inf, merge_settings, non_negative_int, EngineSettings, ParamMetadata,
};
use mothra_common::workflow::FromInput;
use mothra_common::{Error, InputDict, Result};
use serde::Serialize;
use tracing::info;

/// Induce commands Aleph understands
pub const INDUCE_MODES: &[&str] = &[
    "induce",
    "induce_max",
    "induce_cover",
    "induce_incremental",
    "induce_clauses",
    "induce_theory",
    "induce_tree",
    "induce_constraints",
    "induce_modes",
    "induce_features",
];

/// Parameters that may be given explicitly; these override the settings file
pub const ESSENTIAL_PARAMS: &[ParamMetadata] = &[
    ParamMetadata {
        key: "depth",
        default_value: "10",
        description: "Maximum proof depth",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "evalfn",
        default_value: "coverage",
        description: "Clause evaluation function",
        validator: evalfn_value,
    },
    ParamMetadata {
        key: "i",
        default_value: "2",
        description: "Maximum variable depth",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "language",
        default_value: "inf",
        description: "Maximum occurrences of a predicate in a clause",
        validator: int_or_inf,
    },
    ParamMetadata {
        key: "m",
        default_value: "0.0",
        description: "m-estimate parameter",
        validator: float_value,
    },
    ParamMetadata {
        key: "max_features",
        default_value: "inf",
        description: "Maximum number of features to construct",
        validator: int_or_inf,
    },
    ParamMetadata {
        key: "minpos",
        default_value: "1",
        description: "Minimum positive examples covered by a clause",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "noise",
        default_value: "0",
        description: "Maximum negative examples covered by a clause",
        validator: non_negative_int,
    },
];

/// Clause evaluation functions Aleph implements
pub const EVALFNS: &[&str] = &[
    "coverage",
    "compression",
    "posonly",
    "pbayes",
    "accuracy",
    "laplace",
    "auto_m",
    "mestimate",
    "entropy",
    "gini",
    "sd",
    "wracc",
    "user",
];

fn evalfn_value(s: &str) -> std::result::Result<(), String> {
    if EVALFNS.contains(&s.trim()) {
        Ok(())
    } else {
        Err(format!("'{}' is not one of: {}", s, EVALFNS.join(", ")))
    }
}

const THEORY_FILE: &str = "theory.pl";
const FEATURES_FILE: &str = "features.pl";

pub struct AlephRequest {
    pub settings: Option<String>,
    pub mode: String,
    pub pos: String,
    pub neg: String,
    pub b: String,
    /// Full input, for the essential parameters
    pub params: InputDict,
}

impl FromInput for AlephRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        let mode = input.required_str("mode")?;
        if !INDUCE_MODES.contains(&mode.as_str()) {
            return Err(Error::invalid(format!(
                "Unknown Aleph mode '{}' (expected one of: {})",
                mode,
                INDUCE_MODES.join(", ")
            )));
        }
        Ok(Self {
            settings: input.non_empty_str("settings"),
            mode,
            pos: input.required_str("pos")?,
            neg: input.required_str("neg")?,
            b: input.required_str("b")?,
            params: input.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlephResult {
    pub theory: String,
    pub features: String,
}

pub struct Aleph<'a> {
    engine: &'a dyn Engine,
    config: &'a EngineConfig,
}

impl<'a> Aleph<'a> {
    pub fn new(engine: &'a dyn Engine, config: &'a EngineConfig) -> Self {
        Self { engine, config }
    }

    pub fn settings(request: &AlephRequest) -> Result<EngineSettings> {
        let from_file = file_settings(request.settings.as_deref())?;
        merge_settings(ESSENTIAL_PARAMS, &from_file, &request.params)
    }

    pub async fn induce(&self, request: &AlephRequest) -> Result<AlephResult> {
        let settings = Self::settings(request)?;
        for script in [&request.b, &request.pos, &request.neg] {
            check_input(Some(script.as_str()))?;
        }
        check_input(request.settings.as_deref())?;
        let directives = settings.to_prolog_directives();
        check_input(Some(directives.as_str()))?;

        let background = format!("{}\n{}", directives, request.b);
        let job = EngineJob::new("Aleph", self.config.prolog.clone())
            .args(["-l", "driver.pl"])
            .input("data.b", background)
            .input("data.f", request.pos.clone())
            .input("data.n", request.neg.clone())
            .input("driver.pl", self.driver(&request.mode))
            .output(THEORY_FILE)
            .output(FEATURES_FILE);

        let output = self.engine.run(job).await?;
        let theory = output.require_file("Aleph", THEORY_FILE)?.to_string();
        let features = output.file_or_empty(FEATURES_FILE);

        info!(
            mode = %request.mode,
            theory_bytes = theory.len(),
            features_bytes = features.len(),
            "Aleph induction finished"
        );
        Ok(AlephResult { theory, features })
    }

    fn driver(&self, mode: &str) -> String {
        let mut driver = format!(
            ":- consult({}).\n:- read_all(data).\n:- {}.\n:- write_rules('{}').\n",
            quoted_path(&self.config.aleph),
            mode,
            THEORY_FILE
        );
        if mode == "induce_features" {
            driver.push_str(&format!(
                ":- tell('{}'), show(features), told.\n",
                FEATURES_FILE
            ));
        }
        driver.push_str(":- halt.\n");
        driver
    }
}
