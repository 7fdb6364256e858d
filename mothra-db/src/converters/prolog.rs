//! Prolog term rendering and the background knowledge shared by the
//! RSD, Aleph and TreeLiker converters

use crate::context::{DbContext, LinkKind, RelationWalker};
use crate::discretization::DiscretizationIntervals;
use std::collections::BTreeSet;

/// Render a value as a Prolog constant.
///
/// Numbers and lowercase identifiers stay bare, everything else is quoted.
pub fn atom(value: &str) -> String {
    if is_number(value) || is_plain_atom(value) {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

fn is_number(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int) && frac.map_or(true, all_digits)
}

fn is_plain_atom(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Turn a table or column name into a valid predicate name
pub fn predicate_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match cleaned.chars().next() {
        Some(c) if c.is_ascii_lowercase() => cleaned,
        Some(_) => format!("p_{}", cleaned),
        None => "p".to_string(),
    }
}

pub fn attribute_predicate(table: &str, column: &str) -> String {
    predicate_name(&format!("{}_{}", table, column))
}

pub fn link_predicate(child: &str) -> String {
    predicate_name(&format!("has_{}", child))
}

/// One body literal declaration: `pred(+input, output)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDecl {
    /// `*` for one-to-many links, `1` otherwise
    pub recall: &'static str,
    pub predicate: String,
    pub input: String,
    /// Output argument with its `-` (variable) or `#` (constant) marker
    pub output: String,
}

impl ModeDecl {
    pub fn literal(&self) -> String {
        format!("{}(+{}, {})", self.predicate, self.input, self.output)
    }

    pub fn modeb(&self) -> String {
        format!(":- modeb({}, {}).", self.recall, self.literal())
    }

    pub fn determination(&self, head: &str) -> String {
        format!(":- determination({}, {}/2).", head, self.predicate)
    }
}

/// Walks a context along its traversal and emits declarations and facts
pub struct KnowledgeBuilder<'a> {
    walker: RelationWalker<'a>,
    intervals: &'a DiscretizationIntervals,
}

impl<'a> KnowledgeBuilder<'a> {
    pub fn new(context: &'a DbContext, intervals: &'a DiscretizationIntervals) -> Self {
        Self {
            walker: RelationWalker::new(context),
            intervals,
        }
    }

    pub fn context(&self) -> &'a DbContext {
        self.walker.context()
    }

    pub fn walker(&self) -> &RelationWalker<'a> {
        &self.walker
    }

    /// Attribute value with discretization applied
    pub fn value(&self, table: &str, column: &str, raw: &str) -> String {
        self.intervals
            .label(table, column, raw)
            .unwrap_or_else(|| raw.to_string())
    }

    /// Target table followed by every table reached by the traversal
    pub fn reachable_tables(&self) -> Vec<&str> {
        let mut tables = vec![self.context().target_table()];
        tables.extend(self.walker.links().iter().map(|l| l.child.as_str()));
        tables
    }

    /// Type name used for a table's key in mode declarations
    pub fn key_type(&self, table: &str) -> String {
        predicate_name(table)
    }

    pub fn body_modes(&self) -> Vec<ModeDecl> {
        let mut modes = Vec::new();
        for table in self.reachable_tables() {
            for column in self.context().attribute_columns(table) {
                let predicate = attribute_predicate(table, column);
                modes.push(ModeDecl {
                    recall: "1",
                    output: format!("#{}", predicate),
                    predicate,
                    input: self.key_type(table),
                });
            }
            for (_, link) in self.walker.links_from(table) {
                modes.push(ModeDecl {
                    recall: match link.kind {
                        LinkKind::OneToMany => "*",
                        LinkKind::ManyToOne => "1",
                    },
                    predicate: link_predicate(&link.child),
                    input: self.key_type(&link.parent),
                    output: format!("-{}", self.key_type(&link.child)),
                });
            }
        }
        modes
    }

    /// Ground facts for all reachable rows, one per line
    pub fn facts(&self) -> Vec<String> {
        let context = self.context();
        let mut facts = Vec::new();

        for table in self.reachable_tables() {
            let (Some(data), Some(pk)) = (context.data(table), context.pkey(table)) else {
                continue;
            };
            let columns = context.attribute_columns(table);
            let links: Vec<_> = self.walker.links_from(table).collect();

            for row in 0..data.len() {
                let Some(id) = data.value(row, pk) else {
                    continue;
                };
                for column in &columns {
                    if let Some(raw) = data.value(row, column) {
                        facts.push(format!(
                            "{}({}, {}).",
                            attribute_predicate(table, column),
                            atom(id),
                            atom(&self.value(table, column, raw))
                        ));
                    }
                }
                for (idx, link) in &links {
                    facts.extend(self.link_facts(*idx, &link.child, row, id));
                }
            }
        }
        facts
    }

    fn link_facts(&self, link_idx: usize, child: &str, row: usize, id: &str) -> Vec<String> {
        let context = self.context();
        let (Some(child_data), Some(child_pk)) = (context.data(child), context.pkey(child)) else {
            return Vec::new();
        };
        self.walker
            .children(link_idx, row)
            .iter()
            .filter_map(|child_row| child_data.value(*child_row, child_pk))
            .map(|child_id| {
                format!("{}({}, {}).", link_predicate(child), atom(id), atom(child_id))
            })
            .collect()
    }

    /// Literals describing one target example and everything reachable from it
    pub fn example_literals(&self, target_row: usize) -> Vec<String> {
        let mut literals = Vec::new();
        let mut seen = BTreeSet::new();
        self.collect_literals(self.context().target_table(), target_row, &mut literals, &mut seen);
        literals
    }

    fn collect_literals(
        &self,
        table: &str,
        row: usize,
        out: &mut Vec<String>,
        seen: &mut BTreeSet<String>,
    ) {
        let context = self.context();
        let (Some(data), Some(pk)) = (context.data(table), context.pkey(table)) else {
            return;
        };
        let Some(id) = data.value(row, pk) else {
            return;
        };

        let mut push = |literal: String, out: &mut Vec<String>| {
            if seen.insert(literal.clone()) {
                out.push(literal);
            }
        };

        for column in context.attribute_columns(table) {
            if let Some(raw) = data.value(row, column) {
                push(
                    format!(
                        "{}({}, {})",
                        attribute_predicate(table, column),
                        atom(id),
                        atom(&self.value(table, column, raw))
                    ),
                    out,
                );
            }
        }

        let mut descend = Vec::new();
        for (idx, link) in self.walker.links_from(table) {
            let Some(child_data) = context.data(&link.child) else {
                continue;
            };
            let Some(child_pk) = context.pkey(&link.child) else {
                continue;
            };
            for &child_row in self.walker.children(idx, row) {
                if let Some(child_id) = child_data.value(child_row, child_pk) {
                    push(
                        format!("{}({}, {})", link_predicate(&link.child), atom(id), atom(child_id)),
                        out,
                    );
                    descend.push((link.child.clone(), child_row));
                }
            }
        }

        for (child, child_row) in descend {
            self.collect_literals(&child, child_row, out, seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_quoting() {
        assert_eq!(atom("c"), "c");
        assert_eq!(atom("d1_2"), "d1_2");
        assert_eq!(atom("-4.25"), "-4.25");
        assert_eq!(atom("12"), "12");
        assert_eq!(atom("Carbon"), "'Carbon'");
        assert_eq!(atom("o'neil"), "'o\\'neil'");
        assert_eq!(atom("1."), "'1.'");
        assert_eq!(atom(""), "''");
    }

    #[test]
    fn test_predicate_names() {
        assert_eq!(predicate_name("Atom"), "atom");
        assert_eq!(predicate_name("bond-type"), "bond_type");
        assert_eq!(predicate_name("2nd"), "p_2nd");
        assert_eq!(attribute_predicate("atom", "Charge"), "atom_charge");
        assert_eq!(link_predicate("bond"), "has_bond");
    }

    #[test]
    fn test_mode_rendering() {
        let mode = ModeDecl {
            recall: "*",
            predicate: "has_atom".to_string(),
            input: "molecule".to_string(),
            output: "-atom".to_string(),
        };
        assert_eq!(mode.modeb(), ":- modeb(*, has_atom(+molecule, -atom)).");
        assert_eq!(
            mode.determination("target/1"),
            ":- determination(target/1, has_atom/2)."
        );
    }
}
