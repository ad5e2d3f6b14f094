//! Context predicates attached to policies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ambient facts about the running system that policies may condition on.
pub type ConnectionContext = BTreeMap<String, Value>;

/// A predicate over the [`ConnectionContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ContextRule {
    /// Always holds.
    #[default]
    All,
    Equals { key: String, value: Value },
    Present { key: String },
    And { rules: Vec<ContextRule> },
    Or { rules: Vec<ContextRule> },
    Not { inner: Box<ContextRule> },
}

impl ContextRule {
    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn present(key: impl Into<String>) -> Self {
        Self::Present { key: key.into() }
    }

    pub fn and(self, other: ContextRule) -> Self {
        Self::And {
            rules: vec![self, other],
        }
    }

    pub fn or(self, other: ContextRule) -> Self {
        Self::Or {
            rules: vec![self, other],
        }
    }

    pub fn negate(self) -> Self {
        Self::Not {
            inner: Box::new(self),
        }
    }

    pub fn evaluate(&self, context: &ConnectionContext) -> bool {
        match self {
            Self::All => true,
            Self::Equals { key, value } => context.get(key) == Some(value),
            Self::Present { key } => context.get(key).is_some_and(|v| !v.is_null()),
            Self::And { rules } => rules.iter().all(|r| r.evaluate(context)),
            Self::Or { rules } => rules.iter().any(|r| r.evaluate(context)),
            Self::Not { inner } => !inner.evaluate(context),
        }
    }
}
