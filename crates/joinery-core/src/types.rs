//! SQL data type definitions.

use core::fmt;

/// Column data types understood by joinery.
///
/// Decimal columns are carried as `f64` on the Rust side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Small integer (2 bytes).
    Smallint,
    /// Integer (4 bytes).
    Integer,
    /// Big integer (8 bytes).
    Bigint,
    /// Real (4-byte float).
    Real,
    /// Double precision (8-byte float).
    Double,
    /// Exact decimal.
    Decimal,
    /// Text (variable length, no limit).
    Text,
    /// Binary large object.
    Blob,
    /// Calendar date.
    Date,
    /// Date and time without zone.
    Timestamp,
    /// Boolean.
    Boolean,
}

impl DataType {
    /// Returns the SQL representation of the data type.
    #[must_use]
    pub const fn to_sql(self) -> &'static str {
        match self {
            Self::Smallint => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::Bigint => "BIGINT",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Boolean => "BOOLEAN",
        }
    }

    /// Whether values of this type are whole numbers.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Smallint | Self::Integer | Self::Bigint)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}
