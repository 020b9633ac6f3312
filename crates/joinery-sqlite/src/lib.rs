//! # joinery-sqlite
//!
//! SQLite dialect for `joinery-core`.
//!
//! # How SQLite differs from other dialects
//!
//! - **[RETURNING]**: SQLite supports `RETURNING` clauses on
//!   INSERT, UPDATE, and DELETE (since SQLite 3.35.0), so generated
//!   keys come back with the INSERT itself.
//! - **OFFSET needs LIMIT**: SQLite only accepts `OFFSET` after a
//!   `LIMIT`; an offset without a limit renders `LIMIT -1 OFFSET ?`.
//!   See [SELECT].
//! - **Identifier quoting**: SQLite uses double quotes (`"`) as
//!   the standard quoting style, though it also accepts backticks
//!   and square brackets. See [SQLite keywords].
//! - **[Type affinity]**: SQLite uses a type-affinity system rather
//!   than strict column types. Any column can store any value
//!   regardless of declared type, so values read back are decoded by
//!   their storage class.
//!
//! [RETURNING]: https://www.sqlite.org/lang_returning.html
//! [SELECT]: https://www.sqlite.org/lang_select.html#limitoffset
//! [SQLite keywords]: https://www.sqlite.org/lang_keywords.html
//! [Type affinity]: https://www.sqlite.org/datatype3.html
//!
//! ## Example
//!
//! ```rust
//! use joinery_core::Dialect;
//! use joinery_sqlite::SqliteDialect;
//!
//! let dialect = SqliteDialect::new();
//! assert_eq!(dialect.quote_identifier("athlete"), "\"athlete\"");
//! assert!(dialect.supports_returning());
//! ```

mod dialect;

pub use dialect::SqliteDialect;
