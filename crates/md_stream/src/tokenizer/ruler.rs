use std::fmt;

use crate::error::{Error, Result};

/// An ordered chain of named rules.
///
/// Rules run in chain order. Extensions insert their rules relative to a
/// named anchor, so that, for example, math scanning runs before escape
/// handling.
pub struct Ruler<R> {
    rules: Vec<Rule<R>>,
}

struct Rule<R> {
    name: String,
    enabled: bool,
    rule: R,
}

impl<R> Default for Ruler<R> {
    fn default() -> Self {
        Self { rules: vec![] }
    }
}

impl<R> fmt::Debug for Ruler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| {
                if r.enabled {
                    r.name.clone()
                } else {
                    format!("{} (disabled)", r.name)
                }
            }))
            .finish()
    }
}

impl<R> Ruler<R> {
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: vec![] }
    }

    /// Append a rule to the end of the chain.
    pub fn push(&mut self, name: impl Into<String>, rule: R) {
        self.rules.push(Rule {
            name: name.into(),
            enabled: true,
            rule,
        });
    }

    /// Insert a rule before the rule named `anchor`.
    pub fn before(&mut self, anchor: &str, name: impl Into<String>, rule: R) -> Result<()> {
        let idx = self.index_of(anchor)?;
        self.rules.insert(idx, Rule {
            name: name.into(),
            enabled: true,
            rule,
        });

        Ok(())
    }

    /// Insert a rule after the rule named `anchor`.
    pub fn after(&mut self, anchor: &str, name: impl Into<String>, rule: R) -> Result<()> {
        let idx = self.index_of(anchor)?;
        self.rules.insert(idx + 1, Rule {
            name: name.into(),
            enabled: true,
            rule,
        });

        Ok(())
    }

    pub fn enable(&mut self, name: &str) -> Result<()> {
        let idx = self.index_of(name)?;
        self.rules[idx].enabled = true;
        Ok(())
    }

    pub fn disable(&mut self, name: &str) -> Result<()> {
        let idx = self.index_of(name)?;
        self.rules[idx].enabled = false;
        Ok(())
    }

    /// Names of the enabled rules, in chain order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(name, _)| name)
    }

    /// The enabled rules, in chain order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| (r.name.as_str(), &r.rule))
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.rules
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| Error::UnknownRule(name.to_owned()))
    }
}

#[cfg(test)]
#[path = "ruler_tests.rs"]
mod tests;
