//! Schema metadata for type-safe table and column definitions.
//!
//! Table, column and foreign key descriptions are plain `'static` data,
//! normally emitted by `#[derive(Table)]`. A [`Schema`] collects them,
//! validates them once and answers lookups while statements are built.

mod path;
mod registry;

pub use path::{Step, TablePath};
pub use registry::{Schema, SchemaBuilder};

use crate::error::Result;
use crate::types::DataType;
use crate::value::SqlValue;

/// Description of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// The SQL column name.
    pub name: &'static str,
    pub data_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
    /// Value assigned by the database when omitted on insert.
    pub generated: bool,
}

/// Description of a foreign key.
///
/// `name` doubles as the navigation name used by implicit joins. The target
/// is reached through a function so that tables may reference each other,
/// or themselves, without a cycle in constant evaluation.
#[derive(Clone, Copy)]
pub struct ForeignKeyDef {
    pub name: &'static str,
    /// Source columns, in key order.
    pub columns: &'static [&'static str],
    pub target: fn() -> &'static TableDef,
    /// Target columns, in key order. Empty means the target's primary key.
    pub target_columns: &'static [&'static str],
}

impl ForeignKeyDef {
    /// The referenced table.
    #[must_use]
    pub fn target_table(&self) -> &'static TableDef {
        (self.target)()
    }

    /// The referenced columns, defaulting to the target's primary key.
    #[must_use]
    pub fn target_columns(&self) -> &'static [&'static str] {
        if self.target_columns.is_empty() {
            self.target_table().primary_key
        } else {
            self.target_columns
        }
    }
}

impl core::fmt::Debug for ForeignKeyDef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForeignKeyDef")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("target", &self.target_table().name)
            .field("target_columns", &self.target_columns())
            .finish()
    }
}

impl PartialEq for ForeignKeyDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.columns == other.columns
            && self.target_table().name == other.target_table().name
            && self.target_columns() == other.target_columns()
    }
}

/// Description of one table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableDef {
    /// The SQL table name.
    pub name: &'static str,
    /// Columns in declaration order.
    pub columns: &'static [ColumnDef],
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKeyDef],
}

impl TableDef {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    #[must_use]
    pub fn foreign_key(&self, name: &str) -> Option<&'static ForeignKeyDef> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }

    /// Positions of the primary key columns, in key order.
    #[must_use]
    pub fn primary_key_indexes(&self) -> Vec<usize> {
        self.primary_key
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect()
    }
}

/// Trait for typed table handles.
///
/// A handle is a [`TablePath`] plus the static description of the table it
/// points at. Handles are immutable and cheap to clone; navigation methods
/// generated by `#[derive(Table)]` return new handles for the referenced
/// table without touching the original.
pub trait Table: Clone + Send + Sync + 'static {
    /// The row type (the original struct).
    type Row: TableRow;

    const DEF: &'static TableDef;

    /// Wraps a path. The path must end at this table.
    fn from_path(path: TablePath) -> Self;

    fn path(&self) -> &TablePath;

    /// A handle on the table itself, aliased by its own name.
    #[must_use]
    fn root() -> Self {
        Self::from_path(TablePath::root(Self::DEF.name))
    }

    /// A handle on the table under another alias, for self-joins.
    #[must_use]
    fn aliased(alias: &str) -> Self {
        Self::from_path(TablePath::aliased(Self::DEF.name, alias))
    }

    /// Navigates to the table `U` without naming the foreign key.
    ///
    /// Resolution picks the single foreign key from this table to `U` when
    /// the statement is built; several candidates make the build fail with
    /// [`crate::Error::Ambiguous`].
    #[must_use]
    fn navigate_to<U: Table>(&self) -> U {
        U::from_path(self.path().navigate_to(U::DEF.name))
    }
}

/// Conversion between a table's row struct and its column values.
///
/// Values are positional, in [`TableDef::columns`] order.
pub trait TableRow: Sized {
    type Table: Table<Row = Self>;

    /// Builds a row from one value per column.
    ///
    /// # Errors
    ///
    /// Returns a mapping error on wrong arity or incompatible values.
    fn from_values(values: Vec<SqlValue>) -> Result<Self>;

    fn into_values(self) -> Vec<SqlValue>;
}
