//! Proper / 1BC input: a PRD declaration file and an FCT fact file
//!
//! The PRD file declares the individual (the target table), one structural
//! predicate per traversal link and one property per attribute. The FCT file
//! lists the facts of each predicate under a `!name` header as comma-separated
//! arguments.

use super::prolog::{attribute_predicate, predicate_name};
use crate::context::{DbContext, LinkKind, RelationWalker};
use mothra_common::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct PrdFctConverter<'a> {
    walker: RelationWalker<'a>,
}

impl<'a> PrdFctConverter<'a> {
    pub fn new(context: &'a DbContext) -> Self {
        Self {
            walker: RelationWalker::new(context),
        }
    }

    fn context(&self) -> &'a DbContext {
        self.walker.context()
    }

    fn reachable_tables(&self) -> Vec<&str> {
        let mut tables = vec![self.context().target_table()];
        tables.extend(self.walker.links().iter().map(|l| l.child.as_str()));
        tables
    }

    fn structural_name(parent: &str, child: &str) -> String {
        predicate_name(&format!("{}2{}", parent, child))
    }

    pub fn create_prd_file(&self) -> String {
        let context = self.context();
        let target = predicate_name(context.target_table());
        let mut out = String::new();

        out.push_str("--INDIVIDUAL\n");
        out.push_str(&format!("{} 1 {} cwa\n", target, target));

        out.push_str("--STRUCTURAL\n");
        for link in self.walker.links() {
            let parent = predicate_name(&link.parent);
            let child = predicate_name(&link.child);
            let (parent_card, child_card) = match link.kind {
                LinkKind::OneToMany => ("1", "*"),
                LinkKind::ManyToOne => ("*", "1"),
            };
            out.push_str(&format!(
                "{} 2 {}:{} {}:{} 1 li\n",
                Self::structural_name(&link.parent, &link.child),
                parent_card,
                parent,
                child_card,
                child
            ));
        }

        out.push_str("--PROPERTIES\n");
        if context.target_att().is_some() {
            out.push_str(&format!("class 2 {} #class 1 cwa\n", target));
        }
        for table in self.reachable_tables() {
            let table_type = predicate_name(table);
            for column in context.attribute_columns(table) {
                let name = attribute_predicate(table, column);
                out.push_str(&format!("{} 2 {} #{} 1 cwa\n", name, table_type, name));
            }
        }
        out
    }

    pub fn create_fct_file(&self) -> String {
        let context = self.context();
        let mut out = String::new();
        let target = context.target_table();

        let Some(target_data) = context.data(target) else {
            return out;
        };
        let target_pk = context.pkey(target).unwrap_or_default();

        out.push_str(&format!("!{}\n", predicate_name(target)));
        for row in 0..target_data.len() {
            if let Some(id) = target_data.value(row, target_pk) {
                out.push_str(&format!("{}\n", fact_arg(id)));
            }
        }

        for (idx, link) in self.walker.links().iter().enumerate() {
            out.push_str(&format!("!{}\n", Self::structural_name(&link.parent, &link.child)));
            let (Some(parent_data), Some(parent_pk)) =
                (context.data(&link.parent), context.pkey(&link.parent))
            else {
                continue;
            };
            let (Some(child_data), Some(child_pk)) =
                (context.data(&link.child), context.pkey(&link.child))
            else {
                continue;
            };
            for row in 0..parent_data.len() {
                let Some(id) = parent_data.value(row, parent_pk) else {
                    continue;
                };
                for &child_row in self.walker.children(idx, row) {
                    if let Some(child_id) = child_data.value(child_row, child_pk) {
                        out.push_str(&format!("{},{}\n", fact_arg(id), fact_arg(child_id)));
                    }
                }
            }
        }

        if context.target_att().is_some() {
            out.push_str("!class\n");
            for (id, class) in context.examples() {
                if let Some(class) = class {
                    out.push_str(&format!("{},{}\n", fact_arg(id), fact_arg(class)));
                }
            }
        }

        for table in self.reachable_tables() {
            let (Some(data), Some(pk)) = (context.data(table), context.pkey(table)) else {
                continue;
            };
            for column in context.attribute_columns(table) {
                out.push_str(&format!("!{}\n", attribute_predicate(table, column)));
                for row in 0..data.len() {
                    if let (Some(id), Some(value)) = (data.value(row, pk), data.value(row, column)) {
                        out.push_str(&format!("{},{}\n", fact_arg(id), fact_arg(value)));
                    }
                }
            }
        }
        out
    }

    /// Write both files into a fresh directory under `root`.
    ///
    /// The directory is kept so the files stay downloadable.
    pub fn write_files(&self, root: &Path) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("tmp").tempdir_in(root)?.keep();
        let stamp = chrono::Utc::now().timestamp_millis();

        let prd_path = dir.join(format!("prdFctTemp{}.prd", stamp));
        fs::write(&prd_path, self.create_prd_file())?;
        let fct_path = dir.join(format!("prdFctTemp{}.fct", stamp));
        fs::write(&fct_path, self.create_fct_file())?;

        info!(dir = %dir.display(), "PRD/FCT files written");
        Ok((prd_path, fct_path))
    }
}

/// FCT arguments are comma separated, so commas inside values are replaced
fn fact_arg(value: &str) -> String {
    value.replace([',', '\n', '\r'], " ")
}
