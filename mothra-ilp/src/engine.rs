//! External engine seam
//!
//! Every external learner is driven the same way: write input files into a
//! private working directory, run one program with arguments, read back named
//! output files. [`Engine`] abstracts that so adapters can be exercised
//! without the real programs installed.

use async_trait::async_trait;
use mothra_common::{Error, Result};
use std::collections::BTreeMap;
use std::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// One engine invocation
#[derive(Debug, Clone, PartialEq)]
pub struct EngineJob {
    /// Engine label for logs and errors
    pub name: String,
    pub program: String,
    /// Arguments; relative paths resolve inside the working directory
    pub args: Vec<String>,
    /// Files written into the working directory before the run
    pub inputs: Vec<(String, String)>,
    /// Files read back after the run; missing ones are simply absent
    pub outputs: Vec<String>,
}

impl EngineJob {
    pub fn new(name: &str, program: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            program: program.into(),
            args: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, file: &str, contents: impl Into<String>) -> Self {
        self.inputs.push((file.to_string(), contents.into()));
        self
    }

    pub fn output(mut self, file: &str) -> Self {
        self.outputs.push(file.to_string());
        self
    }

    /// Contents of an input file, if the job writes one
    pub fn input_file(&self, file: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|(name, _)| name == file)
            .map(|(_, contents)| contents.as_str())
    }
}

/// Captured results of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub stdout: String,
    pub files: BTreeMap<String, String>,
}

impl EngineOutput {
    pub fn file(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Output file contents; empty when the engine did not produce the file
    pub fn file_or_empty(&self, name: &str) -> String {
        self.file(name).unwrap_or_default().to_string()
    }

    pub fn require_file(&self, engine: &str, name: &str) -> Result<&str> {
        self.file(name)
            .ok_or_else(|| Error::Engine(format!("{} produced no {}", engine, name)))
    }
}

#[async_trait]
pub trait Engine: Send + Sync {
    async fn run(&self, job: EngineJob) -> Result<EngineOutput>;
}

/// Runs jobs as local processes in a temporary directory removed afterwards
#[derive(Debug, Default, Clone)]
pub struct ProcessEngine;

impl ProcessEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Engine for ProcessEngine {
    async fn run(&self, job: EngineJob) -> Result<EngineOutput> {
        let workdir = tempfile::Builder::new().prefix("mothra-").tempdir()?;
        for (name, contents) in &job.inputs {
            std::fs::write(workdir.path().join(name), contents)?;
        }

        debug!(
            engine = %job.name,
            program = %job.program,
            args = ?job.args,
            workdir = %workdir.path().display(),
            "Running engine"
        );

        let output = tokio::task::spawn_blocking({
            let program = job.program.clone();
            let args = job.args.clone();
            let dir = workdir.path().to_path_buf();
            move || Command::new(&program).args(&args).current_dir(&dir).output()
        })
        .await
        .map_err(|e| Error::Engine(format!("{}: task join error: {}", job.name, e)))?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::Engine(format!("{}: program '{}' not found", job.name, job.program))
            }
            _ => Error::Engine(format!("{}: failed to execute: {}", job.name, e)),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Engine(format!(
                "{} failed. Exit code: {:?}, stderr: {}",
                job.name,
                output.status.code(),
                stderr.trim()
            )));
        }

        let mut files = BTreeMap::new();
        for name in &job.outputs {
            let path = workdir.path().join(name);
            if path.exists() {
                files.insert(name.clone(), std::fs::read_to_string(&path)?);
            }
        }

        info!(
            engine = %job.name,
            outputs = files.len(),
            "Engine run completed"
        );

        Ok(EngineOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            files,
        })
    }
}

/// Records every job and answers with canned output files
///
/// Only files a job asks for are returned, as with [`ProcessEngine`].
#[derive(Debug, Default)]
pub struct RecordingEngine {
    stdout: String,
    files: BTreeMap<String, String>,
    jobs: Mutex<Vec<EngineJob>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, contents: &str) -> Self {
        self.files.insert(name.to_string(), contents.to_string());
        self
    }

    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.stdout = stdout.to_string();
        self
    }

    pub async fn jobs(&self) -> Vec<EngineJob> {
        self.jobs.lock().await.clone()
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    async fn run(&self, job: EngineJob) -> Result<EngineOutput> {
        let files = job
            .outputs
            .iter()
            .filter_map(|name| self.files.get(name).map(|c| (name.clone(), c.clone())))
            .collect();
        self.jobs.lock().await.push(job);
        Ok(EngineOutput {
            stdout: self.stdout.clone(),
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_builder() {
        let job = EngineJob::new("aleph", "yap")
            .args(["-l", "driver.pl"])
            .input("driver.pl", ":- halt.")
            .output("theory.txt");
        assert_eq!(job.args, vec!["-l", "driver.pl"]);
        assert_eq!(job.input_file("driver.pl"), Some(":- halt."));
        assert_eq!(job.input_file("other"), None);
    }

    #[tokio::test]
    async fn test_recording_engine_returns_requested_files_only() {
        let engine = RecordingEngine::new()
            .with_file("a.txt", "A")
            .with_file("b.txt", "B");
        let out = engine
            .run(EngineJob::new("t", "prog").output("a.txt").output("c.txt"))
            .await
            .unwrap();
        assert_eq!(out.file("a.txt"), Some("A"));
        assert_eq!(out.file("b.txt"), None);
        assert!(out.require_file("t", "c.txt").is_err());
        assert_eq!(engine.jobs().await.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_engine_runs_in_workdir() {
        let job = EngineJob::new("sh", "sh")
            .args(["-c", "cat in.txt > out.txt; echo done"])
            .input("in.txt", "hello")
            .output("out.txt");
        let out = ProcessEngine::new().run(job).await.unwrap();
        assert_eq!(out.file("out.txt"), Some("hello"));
        assert_eq!(out.stdout.trim(), "done");
    }

    #[tokio::test]
    async fn test_process_engine_missing_program() {
        let job = EngineJob::new("ghost", "/nonexistent/mothra-engine");
        let err = ProcessEngine::new().run(job).await.unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_engine_failure_status() {
        let job = EngineJob::new("sh", "sh").args(["-c", "echo broken >&2; exit 3"]);
        let err = ProcessEngine::new().run(job).await.unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
