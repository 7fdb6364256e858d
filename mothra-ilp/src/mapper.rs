//! Mapping unseen examples onto previously induced features
//!
//! The test context is converted with the same converter that produced the
//! training input, the engine evaluates every feature on every test example
//! and writes a 0/1 matrix (`matrix.csv`, header `id,<feature>...`), and the
//! matrix is rendered as ARFF or CSV with the class column appended. The class
//! domain always comes from the training context.

use crate::engine::{Engine, EngineJob};
use crate::security::check_input;
use crate::wordification::arff_name;
use mothra_common::config::EngineConfig;
use mothra_common::{Error, InputDict, Result};
use mothra_db::converters::{AlephConverter, RsdConverter, TreeLikerConverter};
use mothra_db::{DbContext, DiscretizationIntervals};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

const MATRIX_FILE: &str = "matrix.csv";

/// Which learner produced the features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFormat {
    Rsd,
    Aleph,
    TreeLiker,
}

impl FeatureFormat {
    fn name(&self) -> &'static str {
        match self {
            FeatureFormat::Rsd => "rsd",
            FeatureFormat::Aleph => "aleph",
            FeatureFormat::TreeLiker => "treeliker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Arff,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arff" => Ok(OutputFormat::Arff),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(Error::invalid(format!(
                "Unknown output format '{}' (expected arff or csv)",
                other
            ))),
        }
    }
}

pub struct MapRequest {
    pub features: String,
    pub format: FeatureFormat,
    pub train_ctx: DbContext,
    pub test_ctx: DbContext,
    pub output_format: OutputFormat,
    /// Required for Aleph, whose features are rules for one class
    pub positive_class: Option<String>,
}

impl MapRequest {
    pub fn from_input(input: &InputDict, format: FeatureFormat) -> Result<Self> {
        let positive_class = input.non_empty_str("positive_class");
        if format == FeatureFormat::Aleph && positive_class.is_none() {
            return Err(Error::invalid("Please specify the positive class."));
        }
        let output_format = match input.non_empty_str("output_format") {
            Some(name) => name.parse()?,
            None => OutputFormat::Arff,
        };
        Ok(Self {
            features: input.required_str("features")?,
            format,
            train_ctx: input.required_typed("train_ctx")?,
            test_ctx: input.required_typed("test_ctx")?,
            output_format,
            positive_class,
        })
    }
}

/// Evaluate `request.features` on the test examples
pub async fn domain_map(
    engine: &dyn Engine,
    config: &EngineConfig,
    request: &MapRequest,
) -> Result<String> {
    let train = &request.train_ctx;
    let test = &request.test_ctx;
    if train.target_table() != test.target_table() || train.target_att() != test.target_att() {
        return Err(Error::invalid(format!(
            "test context target {}.{} does not match training target {}.{}",
            test.target_table(),
            test.target_att().unwrap_or("?"),
            train.target_table(),
            train.target_att().unwrap_or("?")
        )));
    }
    check_input(Some(request.features.as_str()))?;

    let domain = class_domain(train, request.positive_class.as_deref());
    let job = evaluation_job(config, request)?;
    let output = engine.run(job).await?;
    let matrix = FeatureMatrix::parse(output.require_file("feature mapping", MATRIX_FILE)?)?;

    let classes = example_classes(test, request.positive_class.as_deref());
    let rendered = match request.output_format {
        OutputFormat::Arff => matrix.to_arff(
            &format!("{}_{}", test.target_table(), request.format.name()),
            &domain,
            &classes,
        ),
        OutputFormat::Csv => matrix.to_csv(&domain, &classes),
    };

    info!(
        format = request.format.name(),
        features = matrix.features.len(),
        examples = matrix.rows.len(),
        "Feature mapping finished"
    );
    Ok(rendered)
}

fn class_domain(train: &DbContext, positive_class: Option<&str>) -> Vec<String> {
    match positive_class {
        Some(pos) => vec![pos.to_string(), negative_label(pos)],
        None => train.class_values(),
    }
}

fn negative_label(pos: &str) -> String {
    format!("not_{}", pos)
}

/// Class of every test example by id; binarized when a positive class is given
fn example_classes(test: &DbContext, positive_class: Option<&str>) -> HashMap<String, String> {
    test.examples()
        .into_iter()
        .filter_map(|(id, class)| {
            let class = class?;
            let class = match positive_class {
                Some(pos) if class == pos => pos.to_string(),
                Some(pos) => negative_label(pos),
                None => class.to_string(),
            };
            Some((id.to_string(), class))
        })
        .collect()
}

fn evaluation_job(config: &EngineConfig, request: &MapRequest) -> Result<EngineJob> {
    let test = &request.test_ctx;
    let intervals = DiscretizationIntervals::new();

    let job = match request.format {
        FeatureFormat::TreeLiker => {
            let dataset = TreeLikerConverter::new(test, &intervals)?.dataset();
            EngineJob::new("TreeLiker mapping", config.java.clone())
                .arg("-jar")
                .arg(config.treeliker.display().to_string())
                .args(["-batch", "mapping.treeliker"])
                .input("test.txt", dataset)
                .input("patterns.txt", request.features.clone())
                .input(
                    "mapping.treeliker",
                    format!(
                        "set(examples, 'test.txt')\nset(patterns, 'patterns.txt')\n\
                         set(output_format, csv)\nset(output, '{}')\nwork(yes)\n",
                        MATRIX_FILE
                    ),
                )
        }
        FeatureFormat::Rsd | FeatureFormat::Aleph => {
            let (bk, features) = match (request.format, request.positive_class.as_deref()) {
                (FeatureFormat::Aleph, Some(pos)) => (
                    AlephConverter::new(test, pos, &intervals)?.background_knowledge(),
                    rules_as_features(&request.features),
                ),
                _ => (
                    RsdConverter::new(test, &intervals)?.background_knowledge(),
                    request.features.clone(),
                ),
            };
            let examples: String = test
                .examples()
                .iter()
                .map(|(id, _)| format!("example({}).\n", mothra_db::converters::prolog::atom(id)))
                .collect();
            EngineJob::new("Prolog mapping", config.prolog.clone())
                .args(["-l", "driver.pl"])
                .input("bk.pl", strip_directives(&bk))
                .input("features.pl", features)
                .input("examples.pl", examples)
                .input("driver.pl", evaluation_driver())
        }
    };
    Ok(job.output(MATRIX_FILE))
}

fn evaluation_driver() -> String {
    format!(
        ":- dynamic f/2.\n\
         :- consult('bk.pl').\n\
         :- consult('features.pl').\n\
         :- consult('examples.pl').\n\
         feature_ids(Ids) :- findall(I, clause(f(I, _), _), Is), sort(Is, Ids).\n\
         covers(I, E) :- catch(once(f(I, E)), _, fail).\n\
         write_row(Ids, E) :- write(E), forall(member(I, Ids), \
         (covers(I, E) -> write(',1') ; write(',0'))), nl.\n\
         :- feature_ids(Ids), tell('{}'), write(id), \
         forall(member(I, Ids), (write(',f'), write(I))), nl, \
         forall(example(E), write_row(Ids, E)), told.\n\
         :- halt.\n",
        MATRIX_FILE
    )
}

/// Mode declarations and determinations mean nothing outside the learner
fn strip_directives(bk: &str) -> String {
    bk.lines()
        .filter(|line| !line.trim_start().starts_with(":-"))
        .map(|line| format!("{}\n", line))
        .collect()
}

/// Turn `target(X) :- Body.` rules into numbered `f(N, X) :- Body.` features.
/// Other clauses are kept as helper definitions.
pub fn rules_as_features(theory: &str) -> String {
    let mut out = String::new();
    let mut n = 0;
    for clause in split_clauses(theory) {
        let Some(rest) = clause.strip_prefix("target(") else {
            out.push_str(&clause);
            out.push('\n');
            continue;
        };
        let Some(close) = matching_paren(rest) else {
            out.push_str(&clause);
            out.push('\n');
            continue;
        };
        n += 1;
        out.push_str(&format!("f({}, {}){}\n", n, &rest[..close], &rest[close + 1..]));
    }
    out
}

/// Index of the `)` closing an already opened parenthesis
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split Prolog text into clauses ending with `.`; comments are dropped
fn split_clauses(text: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(line);
        if line.ends_with('.') {
            clauses.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        clauses.push(current);
    }
    clauses
}

/// Feature values per example as produced by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub features: Vec<String>,
    pub rows: Vec<(String, Vec<String>)>,
}

impl FeatureMatrix {
    pub fn parse(csv: &str) -> Result<Self> {
        let mut lines = csv.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| Error::Engine("feature matrix is empty".to_string()))?;
        let features: Vec<String> = header.split(',').skip(1).map(|f| f.trim().to_string()).collect();

        let mut rows = Vec::new();
        for (i, line) in lines.enumerate() {
            let mut cells = line.split(',').map(|c| c.trim().to_string());
            let id = cells.next().unwrap_or_default();
            let values: Vec<String> = cells.collect();
            if values.len() != features.len() {
                return Err(Error::Engine(format!(
                    "feature matrix row {} has {} values, expected {}",
                    i + 2,
                    values.len(),
                    features.len()
                )));
            }
            rows.push((id, values));
        }
        Ok(Self { features, rows })
    }

    fn class_of<'c>(classes: &'c HashMap<String, String>, domain: &[String], id: &str) -> Option<&'c str> {
        classes
            .get(id)
            .filter(|c| domain.contains(*c))
            .map(String::as_str)
    }

    pub fn to_arff(&self, relation: &str, domain: &[String], classes: &HashMap<String, String>) -> String {
        let mut out = format!("@RELATION {}\n\n", arff_name(relation));
        for feature in &self.features {
            out.push_str(&format!("@ATTRIBUTE {} {{0,1}}\n", arff_name(feature)));
        }
        let nominal: Vec<String> = domain.iter().map(|c| arff_name(c)).collect();
        out.push_str(&format!("@ATTRIBUTE class {{{}}}\n\n@DATA\n", nominal.join(",")));
        for (id, values) in &self.rows {
            let class = Self::class_of(classes, domain, id).map_or_else(|| "?".to_string(), arff_name);
            out.push_str(&format!("{},{}\n", values.join(","), class));
        }
        out
    }

    pub fn to_csv(&self, domain: &[String], classes: &HashMap<String, String>) -> String {
        let mut out = format!("id,{},class\n", self.features.join(","));
        for (id, values) in &self.rows {
            let class = Self::class_of(classes, domain, id).unwrap_or("");
            out.push_str(&format!("{},{},{}\n", id, values.join(","), class));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_become_numbered_features() {
        let theory = "% induced\ntarget(A) :-\n   has_atom(A, B), atom_element(B, c).\n\
                      target(A) :- molecule_logp(A, '>2').\nhelper(x).\n";
        let features = rules_as_features(theory);
        assert_eq!(
            features,
            "f(1, A) :- has_atom(A, B), atom_element(B, c).\n\
             f(2, A) :- molecule_logp(A, '>2').\nhelper(x).\n"
        );
    }

    #[test]
    fn test_matrix_parse_and_render() {
        let matrix = FeatureMatrix::parse("id,f1,f2\nd1,1,0\nd2,0,1\n").unwrap();
        assert_eq!(matrix.features, vec!["f1", "f2"]);

        let domain = vec!["pos".to_string(), "neg".to_string()];
        let mut classes = HashMap::new();
        classes.insert("d1".to_string(), "pos".to_string());
        classes.insert("d2".to_string(), "unknown".to_string());

        let arff = matrix.to_arff("molecule_rsd", &domain, &classes);
        assert!(arff.contains("@ATTRIBUTE f1 {0,1}\n"));
        assert!(arff.contains("@ATTRIBUTE class {pos,neg}\n"));
        assert!(arff.ends_with("1,0,pos\n0,1,?\n"));

        let csv = matrix.to_csv(&domain, &classes);
        assert_eq!(csv, "id,f1,f2,class\nd1,1,0,pos\nd2,0,1,\n");
    }

    #[test]
    fn test_arff_quotes_names_with_separators() {
        let matrix = FeatureMatrix::parse("id,f1\nd1,1\nd2,0\n").unwrap();
        let domain = vec!["very active".to_string(), "a,b".to_string()];
        let mut classes = HashMap::new();
        classes.insert("d1".to_string(), "very active".to_string());
        classes.insert("d2".to_string(), "a,b".to_string());

        let arff = matrix.to_arff("drug's data", &domain, &classes);
        assert!(arff.starts_with("@RELATION 'drug\\'s data'\n"));
        assert!(arff.contains("@ATTRIBUTE class {'very active','a,b'}\n"));
        assert!(arff.ends_with("@DATA\n1,'very active'\n0,'a,b'\n"));
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        assert!(FeatureMatrix::parse("id,f1,f2\nd1,1\n").is_err());
        assert!(FeatureMatrix::parse("").is_err());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }
}
