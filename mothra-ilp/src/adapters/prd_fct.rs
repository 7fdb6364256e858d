//! Learners reading Proper PRD/FCT files: the Proper propositionalizers
//! (cardinalization, quantiles, RelAggs), 1BC / 1BC2 and Tertius
//!
//! All of them take the declaration and fact files written by the PRD/FCT
//! converter plus a handful of `-name value` options, and produce one result
//! file.

use crate::engine::{Engine, EngineJob};
use mothra_common::config::EngineConfig;
use mothra_common::settings::{
    bool_value, float_value, int_or_inf, merge_settings, non_negative_int, plain_value,
    EngineSettings, ParamMetadata,
};
use mothra_common::workflow::FromInput;
use mothra_common::{Error, InputDict, OutputDict, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const CARDINALIZATION_PARAMS: &[ParamMetadata] = &[ParamMetadata {
    key: "max_cardinality",
    default_value: "inf",
    description: "Largest cardinality threshold to test",
    validator: int_or_inf,
}];

const QUANTILES_PARAMS: &[ParamMetadata] = &[ParamMetadata {
    key: "quantiles",
    default_value: "4",
    description: "Number of quantiles per numeric attribute",
    validator: non_negative_int,
}];

const RELAGGS_PARAMS: &[ParamMetadata] = &[ParamMetadata {
    key: "aggregates",
    default_value: "count,min,max,avg,sum",
    description: "Aggregate functions applied to related rows",
    validator: plain_value,
}];

const ONEBC_PARAMS: &[ParamMetadata] = &[
    ParamMetadata {
        key: "max_literals",
        default_value: "3",
        description: "Maximum literals per first-order feature",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "max_variables",
        default_value: "3",
        description: "Maximum variables per first-order feature",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "cwa",
        default_value: "true",
        description: "Closed world assumption",
        validator: bool_value,
    },
];

const TERTIUS_PARAMS: &[ParamMetadata] = &[
    ParamMetadata {
        key: "max_literals",
        default_value: "3",
        description: "Maximum literals per rule",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "max_variables",
        default_value: "3",
        description: "Maximum variables per rule",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "results",
        default_value: "10",
        description: "Number of best rules to report",
        validator: non_negative_int,
    },
    ParamMetadata {
        key: "noise",
        default_value: "0.0",
        description: "Minimum confirmation",
        validator: float_value,
    },
];

/// Learners driven by PRD/FCT input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrdFctEngine {
    Cardinalization,
    Quantiles,
    Relaggs,
    OneBc,
    OneBc2,
    Tertius,
}

impl PrdFctEngine {
    pub fn label(&self) -> &'static str {
        match self {
            PrdFctEngine::Cardinalization => "Proper (cardinalization)",
            PrdFctEngine::Quantiles => "Proper (quantiles)",
            PrdFctEngine::Relaggs => "Proper (RelAggs)",
            PrdFctEngine::OneBc => "1BC",
            PrdFctEngine::OneBc2 => "1BC2",
            PrdFctEngine::Tertius => "Tertius",
        }
    }

    pub fn params(&self) -> &'static [ParamMetadata] {
        match self {
            PrdFctEngine::Cardinalization => CARDINALIZATION_PARAMS,
            PrdFctEngine::Quantiles => QUANTILES_PARAMS,
            PrdFctEngine::Relaggs => RELAGGS_PARAMS,
            PrdFctEngine::OneBc | PrdFctEngine::OneBc2 => ONEBC_PARAMS,
            PrdFctEngine::Tertius => TERTIUS_PARAMS,
        }
    }

    /// Output key and file of the engine's result
    fn result(&self) -> (&'static str, &'static str) {
        match self {
            PrdFctEngine::Cardinalization | PrdFctEngine::Quantiles | PrdFctEngine::Relaggs => {
                ("arff", "result.arff")
            }
            PrdFctEngine::OneBc | PrdFctEngine::OneBc2 | PrdFctEngine::Tertius => {
                ("results", "results.txt")
            }
        }
    }

    /// Program and the leading arguments that select the learner
    fn command(&self, config: &EngineConfig) -> (String, Vec<String>) {
        let proper = |method: &str| {
            (
                config.java.clone(),
                vec![
                    "-jar".to_string(),
                    config.proper.display().to_string(),
                    "-method".to_string(),
                    method.to_string(),
                ],
            )
        };
        match self {
            PrdFctEngine::Cardinalization => proper("cardinalization"),
            PrdFctEngine::Quantiles => proper("quantiles"),
            PrdFctEngine::Relaggs => proper("relaggs"),
            PrdFctEngine::OneBc => (
                config.onebc.display().to_string(),
                vec!["-learner".to_string(), "1BC".to_string()],
            ),
            PrdFctEngine::OneBc2 => (
                config.onebc.display().to_string(),
                vec!["-learner".to_string(), "1BC2".to_string()],
            ),
            PrdFctEngine::Tertius => (config.tertius.display().to_string(), Vec::new()),
        }
    }

    pub fn settings(&self, params: &InputDict) -> Result<EngineSettings> {
        merge_settings(self.params(), &[], params)
    }

    /// Run on the files named in `request`; the result goes under the
    /// engine's output key
    pub async fn run(
        &self,
        engine: &dyn Engine,
        config: &EngineConfig,
        request: &PrdFctRequest,
    ) -> Result<OutputDict> {
        let settings = self.settings(&request.params)?;
        let prd = std::fs::read_to_string(&request.prd_file)?;
        let fct = std::fs::read_to_string(&request.fct_file)?;

        let (key, result_file) = self.result();
        let (program, leading) = self.command(config);
        let job = EngineJob::new(self.label(), program)
            .args(leading)
            .args(["-prd", "data.prd", "-fct", "data.fct", "-output", result_file])
            .args(settings.to_cli_args())
            .input("data.prd", prd)
            .input("data.fct", fct)
            .output(result_file);

        let run = engine.run(job).await?;
        let output = run.require_file(self.label(), result_file)?;
        info!(engine = self.label(), bytes = output.len(), "PRD/FCT learner finished");

        let mut out = OutputDict::new();
        out.insert(key, output);
        Ok(out)
    }
}

pub struct PrdFctRequest {
    pub prd_file: PathBuf,
    pub fct_file: PathBuf,
    pub params: InputDict,
}

impl PrdFctRequest {
    /// Decode and require both files to lie under `public_files_root`
    pub fn from_input_under(input: &InputDict, public_files_root: &Path) -> Result<Self> {
        let request = Self::from_input(input)?;
        let root = public_files_root.canonicalize()?;
        for path in [&request.prd_file, &request.fct_file] {
            let resolved = path
                .canonicalize()
                .map_err(|_| Error::NotFound(format!("file '{}' does not exist", path.display())))?;
            if !resolved.starts_with(&root) {
                return Err(Error::invalid(format!(
                    "file '{}' is outside the public files directory",
                    path.display()
                )));
            }
        }
        Ok(request)
    }
}

impl FromInput for PrdFctRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        Ok(Self {
            prd_file: PathBuf::from(input.required_str("prd_file")?),
            fct_file: PathBuf::from(input.required_str("fct_file")?),
            params: input.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingEngine;

    fn files(dir: &Path) -> InputDict {
        let prd = dir.join("a.prd");
        let fct = dir.join("a.fct");
        std::fs::write(&prd, "--INDIVIDUAL\nm 1 m cwa\n").unwrap();
        std::fs::write(&fct, "!m\nd1\n").unwrap();
        InputDict::new()
            .with("prd_file", prd.display().to_string())
            .with("fct_file", fct.display().to_string())
    }

    #[tokio::test]
    async fn test_relaggs_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let input = files(dir.path()).with("aggregates", "count,max");
        let request = PrdFctRequest::from_input_under(&input, dir.path()).unwrap();

        let engine = RecordingEngine::new().with_file("result.arff", "@RELATION m\n");
        let config = EngineConfig::default();
        let out = PrdFctEngine::Relaggs
            .run(&engine, &config, &request)
            .await
            .unwrap();
        assert_eq!(out.get("arff").unwrap(), "@RELATION m\n");

        let jobs = engine.jobs().await;
        let args = &jobs[0].args;
        assert_eq!(args[2..4], ["-method".to_string(), "relaggs".to_string()]);
        assert!(args.windows(2).any(|w| w[0] == "-aggregates" && w[1] == "count,max"));
        assert_eq!(jobs[0].input_file("data.fct"), Some("!m\nd1\n"));
    }

    #[tokio::test]
    async fn test_onebc2_results() {
        let dir = tempfile::tempdir().unwrap();
        let request = PrdFctRequest::from_input_under(&files(dir.path()), dir.path()).unwrap();
        let engine = RecordingEngine::new().with_file("results.txt", "accuracy 0.9\n");
        let config = EngineConfig::default();

        let out = PrdFctEngine::OneBc2
            .run(&engine, &config, &request)
            .await
            .unwrap();
        assert_eq!(out.get("results").unwrap(), "accuracy 0.9\n");
        let jobs = engine.jobs().await;
        assert_eq!(jobs[0].args[..2], ["-learner".to_string(), "1BC2".to_string()]);
        assert!(jobs[0].args.contains(&"-max_literals".to_string()));
    }

    #[test]
    fn test_files_outside_public_root_rejected() {
        let public = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let input = files(elsewhere.path());
        assert!(PrdFctRequest::from_input_under(&input, public.path()).is_err());
    }

    #[test]
    fn test_invalid_setting() {
        let input = InputDict::new().with("quantiles", "four");
        assert!(PrdFctEngine::Quantiles.settings(&input).is_err());
    }
}
