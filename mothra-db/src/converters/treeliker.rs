//! TreeLiker input: one example per line, `Class literal, literal, ...`

use super::prolog::{atom, KnowledgeBuilder};
use crate::context::DbContext;
use crate::discretization::DiscretizationIntervals;
use mothra_common::Result;

pub struct TreeLikerConverter<'a> {
    bk: KnowledgeBuilder<'a>,
}

impl<'a> TreeLikerConverter<'a> {
    pub fn new(context: &'a DbContext, intervals: &'a DiscretizationIntervals) -> Result<Self> {
        context.require_target_att()?;
        Ok(Self {
            bk: KnowledgeBuilder::new(context, intervals),
        })
    }

    /// Examples sorted by class; examples of one class keep their table order
    pub fn dataset(&self) -> String {
        let mut examples: Vec<(&str, String)> = Vec::new();
        for (id, class) in self.bk.context().examples() {
            let (Some(class), Some(row)) = (class, self.bk.walker().target_row(id)) else {
                continue;
            };
            let literals = self.bk.example_literals(row);
            examples.push((class, format!("{} {}", atom(class), literals.join(", "))));
        }
        examples.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = String::new();
        for (_, line) in examples {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    /// Template covering every body literal of the context
    pub fn default_template(&self) -> String {
        let literals: Vec<String> = self.bk.body_modes().iter().map(|m| m.literal()).collect();
        format!("[{}]", literals.join(", "))
    }
}
