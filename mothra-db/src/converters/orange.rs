//! Orange `.tab` tables, one per selected table
//!
//! Row one holds the column names, row two the types (`d` discrete,
//! `c` continuous, `string`) and row three the flags (`class`, `meta` or empty).
//! Missing values are written as `?`.

use crate::context::DbContext;
use serde::{Deserialize, Serialize};

/// A named `.tab` document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabDataset {
    pub name: String,
    pub tab: String,
}

pub struct OrangeConverter<'a> {
    context: &'a DbContext,
}

impl<'a> OrangeConverter<'a> {
    pub fn new(context: &'a DbContext) -> Self {
        Self { context }
    }

    pub fn target_table_dataset(&self) -> TabDataset {
        self.table_dataset(self.context.target_table())
    }

    pub fn other_table_datasets(&self) -> Vec<TabDataset> {
        self.context
            .tables()
            .iter()
            .filter(|t| t.as_str() != self.context.target_table())
            .map(|t| self.table_dataset(t))
            .collect()
    }

    fn table_dataset(&self, table: &str) -> TabDataset {
        let columns = self.context.cols(table);
        let mut names = Vec::with_capacity(columns.len());
        let mut types = Vec::with_capacity(columns.len());
        let mut flags = Vec::with_capacity(columns.len());

        let data = self.context.data(table);
        for column in columns {
            let is_key = self.context.pkey(table) == Some(column.as_str())
                || self.context.is_fkey(table, column)
                || self
                    .context
                    .relations()
                    .iter()
                    .any(|r| r.ref_table == table && &r.ref_column == column);
            let is_class = table == self.context.target_table()
                && self.context.target_att() == Some(column.as_str());

            names.push(cell(column));
            if is_key {
                types.push("string");
                flags.push("meta");
            } else {
                let continuous = data.is_some_and(|d| is_continuous(d, column));
                types.push(if continuous && !is_class { "c" } else { "d" });
                flags.push(if is_class { "class" } else { "" });
            }
        }

        let mut lines = vec![names.join("\t"), types.join("\t"), flags.join("\t")];
        if let Some(data) = data {
            for row in 0..data.len() {
                let values: Vec<String> = columns
                    .iter()
                    .map(|c| data.value(row, c).map(cell).unwrap_or_else(|| "?".to_string()))
                    .collect();
                lines.push(values.join("\t"));
            }
        }

        TabDataset {
            name: table.to_string(),
            tab: lines.join("\n") + "\n",
        }
    }
}

/// A column is continuous when it has values and every value is numeric
fn is_continuous(data: &crate::context::TableData, column: &str) -> bool {
    let mut seen = false;
    for row in 0..data.len() {
        if let Some(value) = data.value(row, column) {
            if value.trim().parse::<f64>().is_err() {
                return false;
            }
            seen = true;
        }
    }
    seen
}

fn cell(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
