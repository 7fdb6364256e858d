//! Database context: the schema and data snapshot shared by all converters
//!
//! A [`DbContext`] is assembled once per workflow run from the introspected
//! schema, the user's posted [`ContextSelection`] and the selected rows. It is
//! immutable afterwards; converters only read from it.

use crate::connection::DbConnection;
use crate::schema::{DbSchema, Relation};
use mothra_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, info};

/// Table and column selection posted by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSelection {
    pub target_table: String,
    /// Class attribute of the target table
    #[serde(default)]
    pub target_att: Option<String>,
    /// Selected tables; empty selects every table
    #[serde(default)]
    pub tables: Vec<String>,
    /// Selected columns per table; a missing entry selects every column
    #[serde(default)]
    pub cols: BTreeMap<String, Vec<String>>,
}

/// Rows of one table, every cell read as text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableData {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell value; `None` for NULL or unknown columns
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Direction of a traversal link as seen from the parent table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Each parent row has any number of child rows
    OneToMany,
    /// Each parent row references at most one child row
    ManyToOne,
}

/// One step of the traversal away from the target table.
///
/// Parent row `p` is linked to child row `c` when
/// `p[parent_col] == c[child_col]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub parent: String,
    pub child: String,
    pub parent_col: String,
    pub child_col: String,
    pub kind: LinkKind,
}

/// Immutable relational context
///
/// Contexts travel between workflow components as JSON; deserializing one
/// re-checks the same invariants as building it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDbContext")]
pub struct DbContext {
    database: String,
    target_table: String,
    target_att: Option<String>,
    tables: Vec<String>,
    cols: BTreeMap<String, Vec<String>>,
    pkeys: BTreeMap<String, String>,
    fkeys: BTreeMap<String, BTreeSet<String>>,
    relations: Vec<Relation>,
    data: BTreeMap<String, TableData>,
}

/// Wire form of [`DbContext`] before validation
#[derive(Deserialize)]
struct RawDbContext {
    #[serde(default)]
    database: String,
    target_table: String,
    #[serde(default)]
    target_att: Option<String>,
    #[serde(default)]
    tables: Vec<String>,
    #[serde(default)]
    cols: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pkeys: BTreeMap<String, String>,
    #[serde(default)]
    fkeys: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    relations: Vec<Relation>,
    #[serde(default)]
    data: BTreeMap<String, TableData>,
}

impl TryFrom<RawDbContext> for DbContext {
    type Error = Error;

    fn try_from(raw: RawDbContext) -> Result<Self> {
        let context = Self {
            database: raw.database,
            target_table: raw.target_table,
            target_att: raw.target_att,
            tables: raw.tables,
            cols: raw.cols,
            pkeys: raw.pkeys,
            fkeys: raw.fkeys,
            relations: raw.relations,
            data: raw.data,
        };
        context.validate()?;
        Ok(context)
    }
}

/// Validated selection: which columns of which tables to load
struct ContextLayout {
    target_table: String,
    target_att: Option<String>,
    tables: Vec<String>,
    cols: BTreeMap<String, Vec<String>>,
    pkeys: BTreeMap<String, String>,
    fkeys: BTreeMap<String, BTreeSet<String>>,
    relations: Vec<Relation>,
}

impl ContextLayout {
    fn new(schema: &DbSchema, selection: &ContextSelection) -> Result<Self> {
        let target_table = selection.target_table.trim().to_string();
        if target_table.is_empty() {
            return Err(Error::invalid("Please select a target table."));
        }
        if !schema.has_table(&target_table) {
            return Err(Error::invalid(format!(
                "target table '{}' does not exist",
                target_table
            )));
        }

        let mut tables: Vec<String> = if selection.tables.is_empty() {
            schema.tables.clone()
        } else {
            selection.tables.clone()
        };
        if !tables.contains(&target_table) {
            tables.insert(0, target_table.clone());
        }
        for table in &tables {
            if !schema.has_table(table) {
                return Err(Error::invalid(format!("table '{}' does not exist", table)));
            }
        }

        let mut pkeys = BTreeMap::new();
        for table in &tables {
            let pk = schema.primary_keys.get(table).ok_or_else(|| {
                Error::invalid(format!("table '{}' has no primary key", table))
            })?;
            pkeys.insert(table.clone(), pk.clone());
        }

        let relations: Vec<Relation> = schema
            .relations
            .iter()
            .filter(|r| tables.contains(&r.table) && tables.contains(&r.ref_table))
            .cloned()
            .collect();

        let mut fkeys: BTreeMap<String, BTreeSet<String>> =
            tables.iter().map(|t| (t.clone(), BTreeSet::new())).collect();
        for relation in &relations {
            if let Some(keys) = fkeys.get_mut(&relation.table) {
                keys.insert(relation.column.clone());
            }
        }

        let mut cols = BTreeMap::new();
        for table in &tables {
            let available = schema.column_names(table);
            let mut selected: Vec<String> = match selection.cols.get(table) {
                Some(chosen) => {
                    for column in chosen {
                        if !available.contains(column) {
                            return Err(Error::invalid(format!(
                                "column '{}.{}' does not exist",
                                table, column
                            )));
                        }
                    }
                    chosen.clone()
                }
                None => available.clone(),
            };

            // Keys are always loaded: converters need them to join rows
            let mut required: Vec<&String> = vec![&pkeys[table]];
            required.extend(fkeys[table].iter());
            required.extend(
                relations
                    .iter()
                    .filter(|r| &r.ref_table == table)
                    .map(|r| &r.ref_column),
            );
            for key in required {
                if !selected.contains(key) {
                    selected.push(key.clone());
                }
            }

            cols.insert(table.clone(), selected);
        }

        let target_att = selection
            .target_att
            .as_ref()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        if let Some(att) = &target_att {
            if !schema.column_names(&target_table).contains(att) {
                return Err(Error::invalid(format!(
                    "target attribute '{}.{}' does not exist",
                    target_table, att
                )));
            }
            let target_cols = cols.get_mut(&target_table).ok_or_else(|| {
                Error::invalid(format!("target table '{}' is not selected", target_table))
            })?;
            if !target_cols.contains(att) {
                target_cols.push(att.clone());
            }
        }

        Ok(Self {
            target_table,
            target_att,
            tables,
            cols,
            pkeys,
            fkeys,
            relations,
        })
    }
}

impl DbContext {
    /// Introspect, apply the selection and load the selected rows
    pub async fn build(
        connection: &DbConnection,
        selection: &ContextSelection,
        find_connections: bool,
    ) -> Result<Self> {
        let pool = connection.connect().await?;
        let schema = DbSchema::introspect(&pool, connection, find_connections).await?;
        let layout = ContextLayout::new(&schema, selection)?;

        let vendor = connection.vendor;
        let mut data = BTreeMap::new();
        for table in &layout.tables {
            let columns = &layout.cols[table];
            let select_list: Vec<String> = columns.iter().map(|c| vendor.text_column(c)).collect();
            let sql = format!(
                "SELECT {} FROM {}",
                select_list.join(", "),
                vendor.quote_ident(table)
            );
            debug!(sql = %sql, "Loading table rows");
            let rows = pool.fetch_text_rows(&sql, &[]).await?;
            data.insert(table.clone(), TableData::new(columns.clone(), rows));
        }
        pool.close().await;

        let context = Self::from_layout(connection.database.clone(), layout, data)?;
        info!(
            target_table = %context.target_table,
            tables = context.tables.len(),
            examples = context.target_data().len(),
            "Database context built"
        );
        Ok(context)
    }

    /// Assemble a context from an already-loaded snapshot
    pub fn assemble(
        database: &str,
        schema: &DbSchema,
        selection: &ContextSelection,
        data: BTreeMap<String, TableData>,
    ) -> Result<Self> {
        let layout = ContextLayout::new(schema, selection)?;
        Self::from_layout(database.to_string(), layout, data)
    }

    fn from_layout(
        database: String,
        layout: ContextLayout,
        mut data: BTreeMap<String, TableData>,
    ) -> Result<Self> {
        data.retain(|table, _| layout.tables.contains(table));

        let context = Self {
            database,
            target_table: layout.target_table,
            target_att: layout.target_att,
            tables: layout.tables,
            cols: layout.cols,
            pkeys: layout.pkeys,
            fkeys: layout.fkeys,
            relations: layout.relations,
            data,
        };
        context.validate()?;
        Ok(context)
    }

    /// Every selected table has a primary key and loaded rows holding all of
    /// its selected columns; the target table and attribute are among them.
    fn validate(&self) -> Result<()> {
        if !self.tables.contains(&self.target_table) {
            return Err(Error::invalid(format!(
                "target table '{}' is not selected",
                self.target_table
            )));
        }

        for table in &self.tables {
            let pk = self.pkeys.get(table).ok_or_else(|| {
                Error::invalid(format!("table '{}' has no primary key", table))
            })?;
            let cols = self.cols.get(table).ok_or_else(|| {
                Error::invalid(format!("no columns selected for table '{}'", table))
            })?;
            if !cols.contains(pk) {
                return Err(Error::invalid(format!(
                    "primary key '{}.{}' is not selected",
                    table, pk
                )));
            }
            let loaded = self.data.get(table).ok_or_else(|| {
                Error::invalid(format!("no data loaded for table '{}'", table))
            })?;
            for column in cols {
                if loaded.column_index(column).is_none() {
                    return Err(Error::invalid(format!(
                        "loaded data for '{}' lacks column '{}'",
                        table, column
                    )));
                }
            }
        }

        if let Some(att) = &self.target_att {
            if !self.cols(&self.target_table).contains(att) {
                return Err(Error::invalid(format!(
                    "target attribute '{}.{}' is not selected",
                    self.target_table, att
                )));
            }
        }

        for relation in &self.relations {
            for (table, column) in [
                (&relation.table, &relation.column),
                (&relation.ref_table, &relation.ref_column),
            ] {
                if !self.cols(table).contains(column) {
                    return Err(Error::invalid(format!(
                        "relation column '{}.{}' is not selected",
                        table, column
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn target_table(&self) -> &str {
        &self.target_table
    }

    pub fn target_att(&self) -> Option<&str> {
        self.target_att.as_deref()
    }

    pub fn require_target_att(&self) -> Result<&str> {
        self.target_att().ok_or_else(|| {
            Error::invalid("Please select a target attribute for the target table.")
        })
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn cols(&self, table: &str) -> &[String] {
        self.cols.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pkey(&self, table: &str) -> Option<&str> {
        self.pkeys.get(table).map(String::as_str)
    }

    pub fn is_fkey(&self, table: &str, column: &str) -> bool {
        self.fkeys.get(table).is_some_and(|keys| keys.contains(column))
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn data(&self, table: &str) -> Option<&TableData> {
        self.data.get(table)
    }

    pub fn target_data(&self) -> &TableData {
        // checked by validate
        &self.data[&self.target_table]
    }

    /// Columns carrying attribute values: not keys, not the class attribute
    pub fn attribute_columns(&self, table: &str) -> Vec<&str> {
        let pk = self.pkey(table);
        let referenced: BTreeSet<&str> = self
            .relations
            .iter()
            .filter(|r| r.ref_table == table)
            .map(|r| r.ref_column.as_str())
            .collect();

        self.cols(table)
            .iter()
            .map(String::as_str)
            .filter(|c| Some(*c) != pk)
            .filter(|c| !self.is_fkey(table, c))
            .filter(|c| !referenced.contains(c))
            .filter(|c| !(table == self.target_table && Some(*c) == self.target_att()))
            .collect()
    }

    /// `(primary key, class value)` for every target row with a primary key.
    /// Rows with a NULL class are skipped when a target attribute is set.
    pub fn examples(&self) -> Vec<(&str, Option<&str>)> {
        let data = self.target_data();
        let pk = &self.pkeys[&self.target_table];
        (0..data.len())
            .filter_map(|row| {
                let id = data.value(row, pk)?;
                match self.target_att() {
                    Some(att) => data.value(row, att).map(|cls| (id, Some(cls))),
                    None => Some((id, None)),
                }
            })
            .collect()
    }

    /// Distinct class values in first-seen order
    pub fn class_values(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (_, cls) in self.examples() {
            if let Some(cls) = cls {
                if !seen.iter().any(|s: &String| s == cls) {
                    seen.push(cls.to_string());
                }
            }
        }
        seen
    }

    /// Breadth-first traversal from the target table.
    ///
    /// Every selected table reachable from the target appears as a child exactly
    /// once, so following the links from any example never cycles.
    pub fn traversal(&self) -> Vec<Link> {
        let mut links = Vec::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(self.target_table.as_str());
        queue.push_back(self.target_table.as_str());

        while let Some(table) = queue.pop_front() {
            for relation in &self.relations {
                let (child, link) = if relation.ref_table == table
                    && !visited.contains(relation.table.as_str())
                {
                    (
                        relation.table.as_str(),
                        Link {
                            parent: table.to_string(),
                            child: relation.table.clone(),
                            parent_col: relation.ref_column.clone(),
                            child_col: relation.column.clone(),
                            kind: LinkKind::OneToMany,
                        },
                    )
                } else if relation.table == table && !visited.contains(relation.ref_table.as_str())
                {
                    (
                        relation.ref_table.as_str(),
                        Link {
                            parent: table.to_string(),
                            child: relation.ref_table.clone(),
                            parent_col: relation.column.clone(),
                            child_col: relation.ref_column.clone(),
                            kind: LinkKind::ManyToOne,
                        },
                    )
                } else {
                    continue;
                };

                visited.insert(child);
                queue.push_back(child);
                links.push(link);
            }
        }

        links
    }
}

/// Row-level navigation along the traversal links
pub struct RelationWalker<'a> {
    context: &'a DbContext,
    links: Vec<Link>,
    /// Per link: child rows keyed by their `child_col` value
    indexes: Vec<HashMap<&'a str, Vec<usize>>>,
}

impl<'a> RelationWalker<'a> {
    pub fn new(context: &'a DbContext) -> Self {
        let links = context.traversal();
        let indexes = links
            .iter()
            .map(|link| {
                let mut index: HashMap<&'a str, Vec<usize>> = HashMap::new();
                if let Some(data) = context.data(&link.child) {
                    for row in 0..data.len() {
                        if let Some(key) = data.value(row, &link.child_col) {
                            index.entry(key).or_default().push(row);
                        }
                    }
                }
                index
            })
            .collect();

        Self {
            context,
            links,
            indexes,
        }
    }

    pub fn context(&self) -> &'a DbContext {
        self.context
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Links leaving `table`, with their positions
    pub fn links_from<'s>(&'s self, table: &'s str) -> impl Iterator<Item = (usize, &'s Link)> + 's {
        self.links
            .iter()
            .enumerate()
            .filter(move |(_, link)| link.parent == table)
    }

    /// Child rows of `parent_row` along link `link_idx`
    pub fn children(&self, link_idx: usize, parent_row: usize) -> &[usize] {
        let link = &self.links[link_idx];
        self.context
            .data(&link.parent)
            .and_then(|data| data.value(parent_row, &link.parent_col))
            .and_then(|key| self.indexes[link_idx].get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Row index of a target example by primary key
    pub fn target_row(&self, pk: &str) -> Option<usize> {
        let data = self.context.target_data();
        let pk_col = self.context.pkey(self.context.target_table())?;
        (0..data.len()).find(|row| data.value(*row, pk_col) == Some(pk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnInfo;

    fn col(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: "varchar".to_string(),
        }
    }

    fn schema() -> DbSchema {
        let mut columns = BTreeMap::new();
        columns.insert(
            "molecule".to_string(),
            vec![col("id"), col("logp"), col("class")],
        );
        columns.insert(
            "atom".to_string(),
            vec![col("id"), col("molecule_id"), col("element")],
        );
        let mut primary_keys = BTreeMap::new();
        primary_keys.insert("molecule".to_string(), "id".to_string());
        primary_keys.insert("atom".to_string(), "id".to_string());
        DbSchema {
            tables: vec!["atom".to_string(), "molecule".to_string()],
            columns,
            primary_keys,
            relations: vec![Relation::new("atom", "molecule_id", "molecule", "id")],
        }
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn data() -> BTreeMap<String, TableData> {
        let mut data = BTreeMap::new();
        data.insert(
            "molecule".to_string(),
            TableData::new(
                vec!["id".into(), "logp".into(), "class".into()],
                vec![
                    vec![s("d1"), s("4.2"), s("pos")],
                    vec![s("d2"), s("1.1"), s("neg")],
                    vec![s("d3"), None, None],
                ],
            ),
        );
        data.insert(
            "atom".to_string(),
            TableData::new(
                vec!["id".into(), "molecule_id".into(), "element".into()],
                vec![
                    vec![s("d1_1"), s("d1"), s("c")],
                    vec![s("d1_2"), s("d1"), s("o")],
                    vec![s("d2_1"), s("d2"), s("n")],
                ],
            ),
        );
        data
    }

    fn selection() -> ContextSelection {
        ContextSelection {
            target_table: "molecule".to_string(),
            target_att: Some("class".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_assemble_selects_all_tables_by_default() {
        let ctx = DbContext::assemble("mutagenesis", &schema(), &selection(), data()).unwrap();
        assert_eq!(ctx.tables().len(), 2);
        assert!(ctx.is_fkey("atom", "molecule_id"));
        assert_eq!(ctx.attribute_columns("molecule"), vec!["logp"]);
        assert_eq!(ctx.attribute_columns("atom"), vec!["element"]);
    }

    #[test]
    fn test_examples_skip_null_class() {
        let ctx = DbContext::assemble("m", &schema(), &selection(), data()).unwrap();
        let examples = ctx.examples();
        assert_eq!(examples, vec![("d1", Some("pos")), ("d2", Some("neg"))]);
        assert_eq!(ctx.class_values(), vec!["pos", "neg"]);
    }

    #[test]
    fn test_traversal_goes_away_from_target() {
        let ctx = DbContext::assemble("m", &schema(), &selection(), data()).unwrap();
        let links = ctx.traversal();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].parent, "molecule");
        assert_eq!(links[0].child, "atom");
        assert_eq!(links[0].kind, LinkKind::OneToMany);
    }

    #[test]
    fn test_walker_children() {
        let ctx = DbContext::assemble("m", &schema(), &selection(), data()).unwrap();
        let walker = RelationWalker::new(&ctx);
        let d1 = walker.target_row("d1").unwrap();
        assert_eq!(walker.children(0, d1), &[0, 1]);
        let d3 = walker.target_row("d3").unwrap();
        assert!(walker.children(0, d3).is_empty());
    }

    #[test]
    fn test_selection_errors() {
        let mut bad = selection();
        bad.target_table = "missing".to_string();
        assert!(DbContext::assemble("m", &schema(), &bad, data()).is_err());

        let mut bad = selection();
        bad.target_att = Some("nope".to_string());
        assert!(DbContext::assemble("m", &schema(), &bad, data()).is_err());

        let mut bad = selection();
        bad.cols.insert("atom".to_string(), vec!["charge".to_string()]);
        assert!(DbContext::assemble("m", &schema(), &bad, data()).is_err());
    }

    #[test]
    fn test_key_columns_always_selected() {
        let mut sel = selection();
        sel.cols.insert("atom".to_string(), vec!["element".to_string()]);
        let ctx = DbContext::assemble("m", &schema(), &sel, data()).unwrap();
        let cols = ctx.cols("atom");
        assert!(cols.contains(&"id".to_string()));
        assert!(cols.contains(&"molecule_id".to_string()));
    }

    #[test]
    fn test_deserialized_context_is_validated() {
        let no_rows = serde_json::json!({
            "target_table": "molecule",
            "target_att": "class",
            "pkeys": {"molecule": "id"},
            "data": {}
        });
        let err = serde_json::from_value::<DbContext>(no_rows).unwrap_err();
        assert!(err.to_string().contains("not selected"), "{}", err);

        let ctx = DbContext::assemble("m", &schema(), &selection(), data()).unwrap();
        let mut json = serde_json::to_value(&ctx).unwrap();
        json["data"].as_object_mut().unwrap().remove("molecule");
        let err = serde_json::from_value::<DbContext>(json).unwrap_err();
        assert!(err.to_string().contains("no data loaded for table 'molecule'"));

        let mut json = serde_json::to_value(&ctx).unwrap();
        json["pkeys"].as_object_mut().unwrap().remove("atom");
        assert!(serde_json::from_value::<DbContext>(json).is_err());
    }

    #[test]
    fn test_context_round_trips_through_json() {
        let ctx = DbContext::assemble("m", &schema(), &selection(), data()).unwrap();
        let json = serde_json::to_value(&ctx).unwrap();
        let back: DbContext = serde_json::from_value(json).unwrap();
        assert_eq!(back, ctx);
    }
}
