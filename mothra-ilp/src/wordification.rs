//! Wordification: propositionalization by turning examples into documents
//!
//! Every target example becomes a document. Each attribute value of the
//! example's own row and of every related row reachable through the selected
//! tables contributes the word `table_attribute_value`; with `f_ngram_size > 1`
//! combinations of up to that many words from one row are added as well,
//! joined by `__`. Documents are then weighted with a term weighting measure
//! and written as an ARFF table.

use mothra_common::workflow::FromInput;
use mothra_common::{Error, InputDict, Result};
use mothra_db::context::RelationWalker;
use mothra_db::DbContext;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Term weighting measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightingMeasure {
    /// Term frequency
    Tf,
    /// Term frequency times inverse document frequency
    Tfidf,
    /// Term frequency times the word's chi-squared class association
    Chi,
    /// Term frequency times the word's information gain about the class
    Ig,
}

impl FromStr for WeightingMeasure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tf" => Ok(WeightingMeasure::Tf),
            "tfidf" | "tf-idf" => Ok(WeightingMeasure::Tfidf),
            "chi" | "chi2" => Ok(WeightingMeasure::Chi),
            "ig" => Ok(WeightingMeasure::Ig),
            other => Err(Error::invalid(format!(
                "Unknown weighting measure '{}' (expected tf, tfidf, chi or ig)",
                other
            ))),
        }
    }
}

impl fmt::Display for WeightingMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeightingMeasure::Tf => "tf",
            WeightingMeasure::Tfidf => "tfidf",
            WeightingMeasure::Chi => "chi",
            WeightingMeasure::Ig => "ig",
        };
        write!(f, "{}", name)
    }
}

/// Largest accepted `f_ngram_size`; a row of `w` words yields `C(w, n)` n-grams
pub const MAX_NGRAM_SIZE: usize = 3;

pub struct WordificationRequest {
    pub context: DbContext,
    pub other_tables: Vec<String>,
    pub measure: WeightingMeasure,
    pub ngram_size: usize,
    /// Inverse document frequencies of a previous run, for weighting test data
    pub idf: Option<BTreeMap<String, f64>>,
}

impl FromInput for WordificationRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        let context: DbContext = input.required_typed("context")?;

        if let Some(target) = input.non_empty_str("target_table") {
            if target != context.target_table() {
                return Err(Error::invalid(format!(
                    "target table '{}' does not match the context target '{}'",
                    target,
                    context.target_table()
                )));
            }
        }

        let other_tables = input.string_list("other_tables")?;
        for table in &other_tables {
            if !context.tables().contains(table) {
                return Err(Error::invalid(format!(
                    "table '{}' is not part of the context",
                    table
                )));
            }
        }

        let measure = match input.non_empty_str("weighting_measure") {
            Some(name) => name.parse()?,
            None => WeightingMeasure::Tfidf,
        };

        let ngram_size = input.optional_parsed::<usize>("f_ngram_size")?.unwrap_or(1);
        if !(1..=MAX_NGRAM_SIZE).contains(&ngram_size) {
            return Err(Error::invalid(format!(
                "f_ngram_size must be between 1 and {}",
                MAX_NGRAM_SIZE
            )));
        }

        Ok(Self {
            context,
            other_tables,
            measure,
            ngram_size,
            idf: input.optional_typed("idf")?,
        })
    }
}

/// One target example as a bag of words
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub class: Option<String>,
    pub words: Vec<String>,
}

pub struct Wordification<'a> {
    walker: RelationWalker<'a>,
    /// Tables whose rows contribute words besides the target table
    tables: BTreeSet<String>,
    ngram_size: usize,
    documents: Vec<Document>,
    idf: BTreeMap<String, f64>,
    weights: Vec<BTreeMap<String, f64>>,
}

impl<'a> Wordification<'a> {
    /// An empty `other_tables` selects every table of the context
    pub fn new(context: &'a DbContext, other_tables: &[String], ngram_size: usize) -> Self {
        let tables = if other_tables.is_empty() {
            context.tables().iter().cloned().collect()
        } else {
            other_tables.iter().cloned().collect()
        };
        Self {
            walker: RelationWalker::new(context),
            tables,
            ngram_size: ngram_size.clamp(1, MAX_NGRAM_SIZE),
            documents: Vec::new(),
            idf: BTreeMap::new(),
            weights: Vec::new(),
        }
    }

    /// Build one document per target example
    pub fn run(&mut self) {
        let context = self.walker.context();
        let data = context.target_data();
        let Some(pk) = context.pkey(context.target_table()) else {
            return;
        };

        let mut documents = Vec::with_capacity(data.len());
        for row in 0..data.len() {
            let Some(id) = data.value(row, pk) else {
                continue;
            };
            let class = context
                .target_att()
                .and_then(|att| data.value(row, att))
                .map(str::to_string);
            let mut words = Vec::new();
            self.collect_words(context.target_table(), row, &mut words);
            documents.push(Document {
                id: id.to_string(),
                class,
                words,
            });
        }
        self.documents = documents;
    }

    fn collect_words(&self, table: &str, row: usize, out: &mut Vec<String>) {
        let context = self.walker.context();
        let Some(data) = context.data(table) else {
            return;
        };

        let row_words: Vec<String> = context
            .attribute_columns(table)
            .into_iter()
            .filter_map(|column| {
                data.value(row, column)
                    .map(|value| word(table, column, value))
            })
            .collect();
        for n in 1..=self.ngram_size.min(row_words.len()) {
            for combination in combinations(row_words.len(), n) {
                let parts: Vec<&str> = combination.iter().map(|&i| row_words[i].as_str()).collect();
                out.push(parts.join("__"));
            }
        }

        for (idx, link) in self.walker.links_from(table) {
            if !self.tables.contains(&link.child) {
                continue;
            }
            for &child_row in self.walker.children(idx, row) {
                self.collect_words(&link.child, child_row, out);
            }
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Compute word weights; `idf` from an earlier run replaces the idf
    /// computed from these documents
    pub fn calculate_weights(&mut self, measure: WeightingMeasure, idf: Option<&BTreeMap<String, f64>>) {
        let n_docs = self.documents.len() as f64;
        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &self.documents {
            let unique: BTreeSet<&str> = doc.words.iter().map(String::as_str).collect();
            for w in unique {
                *df.entry(w).or_default() += 1;
            }
        }

        self.idf = match idf {
            Some(given) => given.clone(),
            None => df
                .iter()
                .map(|(w, count)| (w.to_string(), (n_docs / *count as f64).ln()))
                .collect(),
        };

        let class_scores = match measure {
            WeightingMeasure::Chi => Some(self.class_scores(chi_squared)),
            WeightingMeasure::Ig => Some(self.class_scores(information_gain)),
            WeightingMeasure::Tf | WeightingMeasure::Tfidf => None,
        };

        self.weights = self
            .documents
            .iter()
            .map(|doc| {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for w in &doc.words {
                    *counts.entry(w.as_str()).or_default() += 1;
                }
                let len = doc.words.len().max(1) as f64;
                counts
                    .into_iter()
                    .map(|(w, count)| {
                        let tf = count as f64 / len;
                        let factor = match measure {
                            WeightingMeasure::Tf => 1.0,
                            WeightingMeasure::Tfidf => self.idf.get(w).copied().unwrap_or(0.0),
                            WeightingMeasure::Chi | WeightingMeasure::Ig => class_scores
                                .as_ref()
                                .and_then(|scores| scores.get(w).copied())
                                .unwrap_or(0.0),
                        };
                        (w.to_string(), tf * factor)
                    })
                    .collect()
            })
            .collect();
    }

    /// Per-word class association from word presence per class
    fn class_scores(&self, score: fn(&Contingency) -> f64) -> BTreeMap<String, f64> {
        let labelled: Vec<(&str, BTreeSet<&str>)> = self
            .documents
            .iter()
            .filter_map(|doc| {
                doc.class.as_deref().map(|class| {
                    (class, doc.words.iter().map(String::as_str).collect())
                })
            })
            .collect();

        let mut class_totals: BTreeMap<&str, usize> = BTreeMap::new();
        let mut vocabulary: BTreeSet<&str> = BTreeSet::new();
        for (class, words) in &labelled {
            *class_totals.entry(*class).or_default() += 1;
            vocabulary.extend(words.iter().copied());
        }

        vocabulary
            .into_iter()
            .map(|w| {
                let mut with_word: BTreeMap<&str, usize> = BTreeMap::new();
                for (class, words) in &labelled {
                    if words.contains(w) {
                        *with_word.entry(*class).or_default() += 1;
                    }
                }
                let table = Contingency {
                    rows: class_totals
                        .iter()
                        .map(|(class, total)| {
                            let present = with_word.get(class).copied().unwrap_or(0);
                            (present as f64, (total - present) as f64)
                        })
                        .collect(),
                };
                (w.to_string(), score(&table))
            })
            .collect()
    }

    pub fn idf(&self) -> &BTreeMap<String, f64> {
        &self.idf
    }

    /// Documents one per line, words separated by spaces
    pub fn wordify(&self) -> String {
        self.documents
            .iter()
            .map(|doc| doc.words.join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Dense ARFF table of word weights with the class as last attribute
    pub fn to_arff(&self) -> String {
        let context = self.walker.context();
        let vocabulary: BTreeSet<&str> = self
            .weights
            .iter()
            .flat_map(|w| w.keys().map(String::as_str))
            .collect();

        let mut out = format!("@RELATION {}\n\n", arff_name(context.target_table()));
        for w in &vocabulary {
            out.push_str(&format!("@ATTRIBUTE {} NUMERIC\n", arff_name(w)));
        }
        let classes = context.class_values();
        if context.target_att().is_some() {
            let values: Vec<String> = classes.iter().map(|c| arff_name(c)).collect();
            out.push_str(&format!("@ATTRIBUTE class {{{}}}\n", values.join(",")));
        }

        out.push_str("\n@DATA\n");
        for (doc, weights) in self.documents.iter().zip(&self.weights) {
            let mut values: Vec<String> = vocabulary
                .iter()
                .map(|w| format_weight(weights.get(*w).copied().unwrap_or(0.0)))
                .collect();
            if context.target_att().is_some() {
                values.push(doc.class.as_deref().map(arff_name).unwrap_or_else(|| "?".to_string()));
            }
            out.push_str(&values.join(","));
            out.push('\n');
        }
        out
    }
}

fn word(table: &str, column: &str, value: &str) -> String {
    format!("{}_{}_{}", table, column, value)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Index combinations of size `k` out of `n`, in lexicographic order
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k == 0 || k > n {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        result.push(idx.clone());
        let Some(pos) = (0..k).rev().find(|&i| idx[i] != i + n - k) else {
            return result;
        };
        idx[pos] += 1;
        for j in pos + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Class-by-presence table: per class `(documents with word, documents without)`
struct Contingency {
    rows: Vec<(f64, f64)>,
}

fn chi_squared(table: &Contingency) -> f64 {
    let total: f64 = table.rows.iter().map(|(a, b)| a + b).sum();
    let present: f64 = table.rows.iter().map(|(a, _)| a).sum();
    let absent = total - present;
    if total == 0.0 {
        return 0.0;
    }
    table
        .rows
        .iter()
        .map(|(a, b)| {
            let class_total = a + b;
            let expected = [class_total * present / total, class_total * absent / total];
            [*a, *b]
                .iter()
                .zip(expected)
                .filter(|(_, e)| *e > 0.0)
                .map(|(o, e)| (o - e).powi(2) / e)
                .sum::<f64>()
        })
        .sum()
}

fn entropy(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total == 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|c| **c > 0.0)
        .map(|c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

fn information_gain(table: &Contingency) -> f64 {
    let present: Vec<f64> = table.rows.iter().map(|(a, _)| *a).collect();
    let absent: Vec<f64> = table.rows.iter().map(|(_, b)| *b).collect();
    let totals: Vec<f64> = table.rows.iter().map(|(a, b)| a + b).collect();

    let n: f64 = totals.iter().sum();
    if n == 0.0 {
        return 0.0;
    }
    let p_present = present.iter().sum::<f64>() / n;
    entropy(&totals) - p_present * entropy(&present) - (1.0 - p_present) * entropy(&absent)
}

/// ARFF identifier or nominal value, single-quoted unless plain
pub(crate) fn arff_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

fn format_weight(w: f64) -> String {
    if w == 0.0 {
        "0".to_string()
    } else {
        format!("{:.6}", w)
    }
}

/// Run wordification for a decoded request
pub fn wordify(request: &WordificationRequest) -> (String, String, BTreeMap<String, f64>) {
    let mut wordification = Wordification::new(
        &request.context,
        &request.other_tables,
        request.ngram_size,
    );
    wordification.run();
    wordification.calculate_weights(request.measure, request.idf.as_ref());

    info!(
        documents = wordification.documents().len(),
        words = wordification.idf().len(),
        measure = %request.measure,
        "Wordification finished"
    );
    (
        wordification.to_arff(),
        wordification.wordify(),
        wordification.idf().clone(),
    )
}
