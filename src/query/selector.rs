//! PromQL selector construction.
//!
//! Only equality matchers are needed to address a single series by its
//! labels, which is all the correlation queries do.

use std::fmt;

use crate::datamodel::labels::push_escaped;

/// An equality label matcher (`name="value"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    /// Label name to match against.
    pub name: String,

    /// Literal value, escaped when rendered.
    pub value: String,
}

impl LabelMatcher {
    pub fn eq(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut escaped = String::with_capacity(self.value.len());
        push_escaped(&mut escaped, &self.value);
        write!(f, "{}=\"{}\"", self.name, escaped)
    }
}

/// A vector selector: `metric{a="1",b="2"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub metric: String,
    pub matchers: Vec<LabelMatcher>,
}

impl Selector {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            matchers: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.matchers.push(LabelMatcher::eq(name, value));
        self
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.metric)?;
        f.write_str("{")?;
        for (index, matcher) in self.matchers.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", matcher)?;
        }
        f.write_str("}")
    }
}
