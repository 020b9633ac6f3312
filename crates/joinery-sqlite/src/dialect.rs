//! SQLite dialect implementation.

use joinery_core::dialect::Dialect;

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_quote(&self) -> char {
        '"' // SQLite also accepts backticks, but double quotes are standard
    }

    fn supports_returning(&self) -> bool {
        true // SQLite 3.35.0+
    }

    fn requires_limit_for_offset(&self) -> bool {
        true
    }

    fn unbounded_limit(&self) -> &'static str {
        "-1"
    }
}
