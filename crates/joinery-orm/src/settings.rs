//! Execution settings.

use joinery_core::Dialect;
use serde::Deserialize;

/// How an INSERT with a RETURNING list gets its rows back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturningPolicy {
    /// Native RETURNING when the dialect has it, otherwise read back.
    #[default]
    Auto,
    /// Always render RETURNING; fails on dialects without it.
    Native,
    /// Insert, then select the new row by its generated key.
    ReadBack,
}

impl ReturningPolicy {
    /// Whether RETURNING is rendered into the INSERT itself.
    #[must_use]
    pub fn uses_native(self, dialect: &dyn Dialect) -> bool {
        match self {
            Self::Auto => dialect.supports_returning(),
            Self::Native => true,
            Self::ReadBack => false,
        }
    }
}

/// Settings a [`crate::Dsl`] executes with.
///
/// Deserializes from a partial document; missing keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub returning: ReturningPolicy,
    /// Upper bound on the rows of a single multiset. `None` is unbounded.
    pub max_multiset_rows: Option<usize>,
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn returning(mut self, policy: ReturningPolicy) -> Self {
        self.returning = policy;
        self
    }

    #[must_use]
    pub const fn max_multiset_rows(mut self, limit: usize) -> Self {
        self.max_multiset_rows = Some(limit);
        self
    }
}
