//! SQL dialect support.
//!
//! Rendering goes through a `&dyn Dialect`, so the dialect can be chosen at
//! runtime by whatever owns the connection.

mod generic;
mod postgres;

pub use generic::GenericDialect;
pub use postgres::PostgresDialect;

/// Dialect-specific rendering behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// The placeholder for the parameter at `index`, counting from one.
    fn placeholder(&self, index: usize) -> String {
        let _ = index;
        String::from("?")
    }

    /// Whether INSERT ... RETURNING is available.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Whether OFFSET is only valid after a LIMIT.
    fn requires_limit_for_offset(&self) -> bool {
        false
    }

    /// The LIMIT written before an OFFSET when the caller gave none.
    fn unbounded_limit(&self) -> &'static str {
        "ALL"
    }

    /// Quotes an identifier, doubling embedded quote characters.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let escaped = name.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }
}
