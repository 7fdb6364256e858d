//! Aleph input: positive and negative `target(Pk).` examples plus background
//! knowledge with mode declarations and determinations

use super::prolog::{atom, KnowledgeBuilder};
use crate::context::DbContext;
use crate::discretization::DiscretizationIntervals;
use mothra_common::{Error, Result};

pub struct AlephConverter<'a> {
    bk: KnowledgeBuilder<'a>,
    target_att_val: String,
}

impl<'a> AlephConverter<'a> {
    /// Fails unless a positive class value is given and the context has a
    /// target attribute
    pub fn new(
        context: &'a DbContext,
        target_att_val: &str,
        intervals: &'a DiscretizationIntervals,
    ) -> Result<Self> {
        if target_att_val.is_empty() {
            return Err(Error::invalid("Please specify a target attribute value."));
        }
        context.require_target_att()?;
        Ok(Self {
            bk: KnowledgeBuilder::new(context, intervals),
            target_att_val: target_att_val.to_string(),
        })
    }

    fn examples(&self, positive: bool) -> String {
        let mut out = String::new();
        for (id, class) in self.bk.context().examples() {
            if (class == Some(self.target_att_val.as_str())) == positive {
                out.push_str(&format!("target({}).\n", atom(id)));
            }
        }
        out
    }

    pub fn positive_examples(&self) -> String {
        self.examples(true)
    }

    pub fn negative_examples(&self) -> String {
        self.examples(false)
    }

    pub fn background_knowledge(&self) -> String {
        let context = self.bk.context();
        let modes = self.bk.body_modes();

        let mut lines = vec![format!(
            ":- modeh(1, target(+{})).",
            self.bk.key_type(context.target_table())
        )];
        lines.extend(modes.iter().map(|m| m.modeb()));
        lines.extend(modes.iter().map(|m| m.determination("target/1")));
        lines.push(String::new());
        lines.extend(self.bk.facts());
        lines.join("\n") + "\n"
    }
}
