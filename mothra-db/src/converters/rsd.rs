//! RSD input: `target(Class, Pk).` examples and mode-declared background knowledge

use super::prolog::{atom, KnowledgeBuilder};
use crate::context::DbContext;
use crate::discretization::DiscretizationIntervals;
use mothra_common::Result;

pub struct RsdConverter<'a> {
    bk: KnowledgeBuilder<'a>,
    target_att: &'a str,
}

impl<'a> RsdConverter<'a> {
    pub fn new(context: &'a DbContext, intervals: &'a DiscretizationIntervals) -> Result<Self> {
        let target_att = context.require_target_att()?;
        Ok(Self {
            bk: KnowledgeBuilder::new(context, intervals),
            target_att,
        })
    }

    /// Every labelled example, one `target(Class, Pk).` fact per line
    pub fn all_examples(&self) -> String {
        let mut out = String::new();
        for (id, class) in self.bk.context().examples() {
            if let Some(class) = class {
                out.push_str(&format!("target({}, {}).\n", atom(class), atom(id)));
            }
        }
        out
    }

    pub fn background_knowledge(&self) -> String {
        let context = self.bk.context();
        let mut lines = vec![format!(
            ":- modeh(1, target(#{}, +{})).",
            self.bk.key_type(self.target_att),
            self.bk.key_type(context.target_table())
        )];
        lines.extend(self.bk.body_modes().iter().map(|m| m.modeb()));
        lines.push(String::new());
        lines.extend(self.bk.facts());
        lines.join("\n") + "\n"
    }
}
