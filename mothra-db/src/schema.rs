//! Schema introspection via `information_schema`
//!
//! Reads tables, columns, primary keys and foreign-key relations. Optionally
//! discovers additional relations from column naming conventions for databases
//! that do not declare foreign keys.

use crate::connection::{DbConnection, DbPool, Vendor};
use mothra_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Column name and SQL data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// `table.column` references `ref_table.ref_column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub table: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

impl Relation {
    pub fn new(table: &str, column: &str, ref_table: &str, ref_column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
        }
    }
}

/// Introspected database schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbSchema {
    /// Base tables in name order
    pub tables: Vec<String>,
    /// Columns per table in ordinal order
    pub columns: BTreeMap<String, Vec<ColumnInfo>>,
    /// Single-column primary key per table
    pub primary_keys: BTreeMap<String, String>,
    pub relations: Vec<Relation>,
}

/// Vendor-specific introspection queries; each binds the schema name once
struct IntrospectionQueries {
    tables: &'static str,
    columns: &'static str,
    primary_keys: &'static str,
    foreign_keys: &'static str,
}

const MYSQL_QUERIES: IntrospectionQueries = IntrospectionQueries {
    tables: "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'BASE TABLE' ORDER BY table_name",
    columns: "SELECT CAST(table_name AS CHAR), CAST(column_name AS CHAR), CAST(data_type AS CHAR) \
              FROM information_schema.columns WHERE table_schema = ? \
              ORDER BY table_name, ordinal_position",
    primary_keys: "SELECT CAST(table_name AS CHAR), CAST(column_name AS CHAR) \
                   FROM information_schema.key_column_usage \
                   WHERE table_schema = ? AND constraint_name = 'PRIMARY' \
                   ORDER BY table_name, ordinal_position",
    foreign_keys: "SELECT CAST(table_name AS CHAR), CAST(column_name AS CHAR), \
                   CAST(referenced_table_name AS CHAR), CAST(referenced_column_name AS CHAR) \
                   FROM information_schema.key_column_usage \
                   WHERE table_schema = ? AND referenced_table_name IS NOT NULL \
                   ORDER BY table_name, column_name",
};

const POSTGRES_QUERIES: IntrospectionQueries = IntrospectionQueries {
    tables: "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name",
    columns: "SELECT table_name::text, column_name::text, data_type::text \
              FROM information_schema.columns WHERE table_schema = $1 \
              ORDER BY table_name, ordinal_position",
    primary_keys: "SELECT kcu.table_name::text, kcu.column_name::text \
                   FROM information_schema.table_constraints tc \
                   JOIN information_schema.key_column_usage kcu \
                     ON tc.constraint_name = kcu.constraint_name \
                    AND tc.table_schema = kcu.table_schema \
                   WHERE tc.table_schema = $1 AND tc.constraint_type = 'PRIMARY KEY' \
                   ORDER BY kcu.table_name, kcu.ordinal_position",
    foreign_keys: "SELECT kcu.table_name::text, kcu.column_name::text, \
                          ccu.table_name::text, ccu.column_name::text \
                   FROM information_schema.table_constraints tc \
                   JOIN information_schema.key_column_usage kcu \
                     ON tc.constraint_name = kcu.constraint_name \
                    AND tc.table_schema = kcu.table_schema \
                   JOIN information_schema.constraint_column_usage ccu \
                     ON ccu.constraint_name = tc.constraint_name \
                    AND ccu.table_schema = tc.table_schema \
                   WHERE tc.table_schema = $1 AND tc.constraint_type = 'FOREIGN KEY' \
                   ORDER BY kcu.table_name, kcu.column_name",
};

impl DbSchema {
    /// Read the schema of the connected database
    pub async fn introspect(
        pool: &DbPool,
        connection: &DbConnection,
        find_connections: bool,
    ) -> Result<Self> {
        let (queries, schema_name) = match pool.vendor() {
            Vendor::Mysql => (&MYSQL_QUERIES, connection.database.as_str()),
            Vendor::Postgres => (&POSTGRES_QUERIES, "public"),
        };
        let binds = [schema_name];

        let tables: Vec<String> = pool
            .fetch_text_rows(queries.tables, &binds)
            .await?
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect();

        let mut columns: BTreeMap<String, Vec<ColumnInfo>> = BTreeMap::new();
        for row in pool.fetch_text_rows(queries.columns, &binds).await? {
            if let [Some(table), Some(name), data_type] = row.as_slice() {
                columns.entry(table.clone()).or_default().push(ColumnInfo {
                    name: name.clone(),
                    data_type: data_type.clone().unwrap_or_default(),
                });
            }
        }

        let mut primary_keys = BTreeMap::new();
        for row in pool.fetch_text_rows(queries.primary_keys, &binds).await? {
            if let [Some(table), Some(column)] = row.as_slice() {
                if primary_keys.contains_key(table) {
                    warn!(
                        table = %table,
                        column = %column,
                        "Composite primary key - only the first column is used"
                    );
                    continue;
                }
                primary_keys.insert(table.clone(), column.clone());
            }
        }

        let mut relations = Vec::new();
        for row in pool.fetch_text_rows(queries.foreign_keys, &binds).await? {
            if let [Some(table), Some(column), Some(ref_table), Some(ref_column)] = row.as_slice()
            {
                relations.push(Relation::new(table, column, ref_table, ref_column));
            }
        }

        let mut schema = Self {
            tables,
            columns,
            primary_keys,
            relations,
        };

        if find_connections {
            schema.discover_connections();
        }

        info!(
            tables = schema.tables.len(),
            relations = schema.relations.len(),
            find_connections,
            "Schema introspected"
        );
        Ok(schema)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }

    pub fn column_names(&self, table: &str) -> Vec<String> {
        self.columns
            .get(table)
            .map(|cols| cols.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Add relations implied by `<name>_id` columns.
    ///
    /// A column `<x>_id` is taken to reference the primary key of the first
    /// existing table among `<x>`, `<x>s` and (for `<x>` ending in `y`) `<x'>ies`.
    /// Columns that already take part in a declared relation are left alone.
    /// Returns the number of relations added.
    pub fn discover_connections(&mut self) -> usize {
        let mut discovered = Vec::new();

        for table in &self.tables {
            for column in self.column_names(table) {
                let Some(stem) = column.strip_suffix("_id").filter(|s| !s.is_empty()) else {
                    continue;
                };
                if self
                    .relations
                    .iter()
                    .any(|r| &r.table == table && r.column == column)
                {
                    continue;
                }

                let target = referenced_table_candidates(stem)
                    .into_iter()
                    .find(|candidate| candidate != table && self.primary_keys.contains_key(candidate));

                if let Some(ref_table) = target {
                    let ref_column = self.primary_keys[&ref_table].clone();
                    debug!(
                        table = %table,
                        column = %column,
                        ref_table = %ref_table,
                        "Discovered connection by naming convention"
                    );
                    discovered.push(Relation::new(table, &column, &ref_table, &ref_column));
                }
            }
        }

        let added = discovered.len();
        self.relations.extend(discovered);
        added
    }
}

fn referenced_table_candidates(stem: &str) -> Vec<String> {
    let mut candidates = vec![stem.to_string(), format!("{}s", stem)];
    if let Some(base) = stem.strip_suffix('y') {
        candidates.push(format!("{}ies", base));
    }
    candidates
}
