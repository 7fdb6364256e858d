//! Multi-class score table to binary discriminant score
//!
//! Each score line is `name,tag,score,score,...`. Column numbers are 1-based
//! over the whole line; a column number `c` selects the class tag `c - 3`.
//! Column 0 addresses the last column of the line.

use mothra_common::workflow::FromInput;
use mothra_common::{Error, InputDict, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Points for ROC/PR curve plotting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryScore {
    pub name: String,
    pub actual: Vec<u8>,
    pub predicted: Vec<f64>,
}

pub struct BinaryScoreRequest {
    pub multiple_classes: String,
    pub pos_col: i64,
    pub neg_col: i64,
}

impl FromInput for BinaryScoreRequest {
    fn from_input(input: &InputDict) -> Result<Self> {
        let pos_col = column_number(input, "pos_col", "Positive")?;
        let neg_col = column_number(input, "neg_col", "Negative")?;
        Ok(Self {
            multiple_classes: input.required_str("multiple_classes")?,
            pos_col,
            neg_col,
        })
    }
}

fn column_number(input: &InputDict, key: &str, label: &str) -> Result<i64> {
    let raw = input.required_str(key)?;
    let col: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::invalid(format!("{} column number should be an integer", label)))?;
    if col < 0 {
        return Err(Error::invalid(format!(
            "{} column number should be a positive integer",
            label
        )));
    }
    Ok(col)
}

/// Cell addressed by a 1-based column number; 0 wraps to the last cell
fn cell<'s>(cells: &[&'s str], col: i64) -> Option<&'s str> {
    let idx = if col == 0 {
        cells.len().checked_sub(1)?
    } else {
        usize::try_from(col - 1).ok()?
    };
    cells.get(idx).copied()
}

fn score(cells: &[&str], col: i64, line: usize) -> Result<Option<f64>> {
    match cell(cells, col) {
        None => Ok(None),
        Some(text) => text.trim().parse::<f64>().map(Some).map_err(|_| {
            Error::invalid(format!("line {}: score '{}' is not a number", line, text.trim()))
        }),
    }
}

/// Rows whose tag matches neither class are dropped, as are rows too short to
/// hold both score columns.
pub fn to_binary_score(multiple_score: &str, pos_col: i64, neg_col: i64) -> Result<BinaryScore> {
    let pos_tag = pos_col - 3;
    let neg_tag = neg_col - 3;
    let mut actual = Vec::new();
    let mut predicted = Vec::new();

    let text = multiple_score.trim();
    if !text.is_empty() {
        for (i, line) in text.split('\n').enumerate() {
            let line_no = i + 1;
            let cells: Vec<&str> = line.split(',').collect();
            let tag_text = cells.get(1).map(|t| t.trim()).ok_or_else(|| {
                Error::invalid(format!("line {}: missing class tag column", line_no))
            })?;
            let tag: i64 = tag_text.parse().map_err(|_| {
                Error::invalid(format!("line {}: class tag '{}' is not an integer", line_no, tag_text))
            })?;

            let label = if tag == pos_tag {
                1
            } else if tag == neg_tag {
                0
            } else {
                continue;
            };

            match (score(&cells, pos_col, line_no)?, score(&cells, neg_col, line_no)?) {
                (Some(pos), Some(neg)) => {
                    actual.push(label);
                    predicted.push(pos - neg);
                }
                _ => debug!(line = line_no, "Score row lacks a selected column, dropped"),
            }
        }
    }

    Ok(BinaryScore {
        name: "Curve".to_string(),
        actual,
        predicted,
    })
}
