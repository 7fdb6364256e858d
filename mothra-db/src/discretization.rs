//! Discretization intervals for continuous columns
//!
//! Cut points are kept per table and column. A value `v` with cut points
//! `c1 < c2 < ... < cn` falls into one of `n + 1` bins labelled
//! `=<c1`, `(c1-c2]`, ..., `>cn`.

use mothra_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `table -> column -> ascending cut points`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscretizationIntervals(BTreeMap<String, BTreeMap<String, Vec<f64>>>);

impl DiscretizationIntervals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add cut points for one column
    pub fn with(mut self, table: &str, column: &str, cuts: Vec<f64>) -> Result<Self> {
        check_cuts(table, column, &cuts)?;
        self.0
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), cuts);
        Ok(self)
    }

    /// Check every column's cut points (used after deserialization)
    pub fn validate(&self) -> Result<()> {
        for (table, columns) in &self.0 {
            for (column, cuts) in columns {
                check_cuts(table, column, cuts)?;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }

    pub fn cuts(&self, table: &str, column: &str) -> Option<&[f64]> {
        self.0
            .get(table)
            .and_then(|columns| columns.get(column))
            .map(Vec::as_slice)
            .filter(|cuts| !cuts.is_empty())
    }

    /// Bin label for `value`, or `None` when the column is not discretized or the
    /// value is not numeric
    pub fn label(&self, table: &str, column: &str, value: &str) -> Option<String> {
        let cuts = self.cuts(table, column)?;
        let v: f64 = value.trim().parse().ok().filter(|v: &f64| v.is_finite())?;

        let bin = cuts.iter().position(|cut| v <= *cut);
        Some(match bin {
            Some(0) => format!("=<{}", cuts[0]),
            Some(i) => format!("({}-{}]", cuts[i - 1], cuts[i]),
            None => format!(">{}", cuts[cuts.len() - 1]),
        })
    }
}

fn check_cuts(table: &str, column: &str, cuts: &[f64]) -> Result<()> {
    if cuts.iter().any(|c| !c.is_finite()) {
        return Err(Error::invalid(format!(
            "discretization intervals for {}.{} contain a non-finite cut point",
            table, column
        )));
    }
    if cuts.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::invalid(format!(
            "discretization intervals for {}.{} must be strictly ascending",
            table, column
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_labels() {
        let intervals = DiscretizationIntervals::new()
            .with("atom", "charge", vec![-0.5, 0.5])
            .unwrap();

        assert_eq!(intervals.label("atom", "charge", "-1").as_deref(), Some("=<-0.5"));
        assert_eq!(intervals.label("atom", "charge", "-0.5").as_deref(), Some("=<-0.5"));
        assert_eq!(intervals.label("atom", "charge", "0.1").as_deref(), Some("(-0.5-0.5]"));
        assert_eq!(intervals.label("atom", "charge", "2").as_deref(), Some(">0.5"));
    }

    #[test]
    fn test_unlisted_or_non_numeric_values_are_not_binned() {
        let intervals = DiscretizationIntervals::new()
            .with("atom", "charge", vec![0.0])
            .unwrap();
        assert_eq!(intervals.label("atom", "element", "1"), None);
        assert_eq!(intervals.label("atom", "charge", "n/a"), None);
    }

    #[test]
    fn test_cuts_must_ascend() {
        assert!(DiscretizationIntervals::new()
            .with("t", "c", vec![1.0, 1.0])
            .is_err());

        let parsed: DiscretizationIntervals =
            serde_json::from_str(r#"{"t": {"c": [3.0, 2.0]}}"#).unwrap();
        assert!(parsed.validate().is_err());
        assert!(DiscretizationIntervals::new().is_empty());
    }
}
