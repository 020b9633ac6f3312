//! SQL values and the conversions between them and Rust types.
//!
//! Every literal that reaches a statement travels as a [`SqlValue`] bound
//! parameter; nothing is ever spliced into the SQL text.

use core::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};
use crate::types::DataType;

/// A SQL value that can be used as a parameter or read from a result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SqlValue {
    /// NULL value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone.
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Returns the SQL representation for inline display (escaped).
    ///
    /// Only used for diagnostics; statements always bind parameters.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Self::Timestamp(t) => format!("'{}'", t.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }

    /// Name of the variant, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOLEAN",
            Self::Int(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Blob(_) => "BLOB",
            Self::Date(_) => "DATE",
            Self::Timestamp(_) => "TIMESTAMP",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value can be stored in a column of `data_type`.
    ///
    /// NULL fits every type; nullability is checked by the caller.
    #[must_use]
    pub const fn fits(&self, data_type: DataType) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(_) => matches!(data_type, DataType::Boolean),
            Self::Int(_) => !matches!(
                data_type,
                DataType::Text | DataType::Blob | DataType::Date | DataType::Timestamp
            ),
            Self::Float(_) => matches!(
                data_type,
                DataType::Real | DataType::Double | DataType::Decimal
            ),
            Self::Text(_) => matches!(
                data_type,
                DataType::Text | DataType::Date | DataType::Timestamp | DataType::Decimal
            ),
            Self::Blob(_) => matches!(data_type, DataType::Blob),
            Self::Date(_) => matches!(data_type, DataType::Date),
            Self::Timestamp(_) => matches!(data_type, DataType::Timestamp),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_inline())
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

/// Trait for types that can be read back from SQL values.
pub trait FromSqlValue: Sized {
    /// Converts a `SqlValue` into `Self`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mapping`] when the value has an incompatible type.
    fn from_sql_value(value: SqlValue) -> Result<Self>;
}

/// A Rust type that maps onto a column data type.
///
/// The type parameter of `Field` and `Expr` is always a `SqlType`; whether
/// the column admits NULL is column metadata, not part of the type.
pub trait SqlType: ToSqlValue + FromSqlValue + Send + Sync + 'static {
    const DATA_TYPE: DataType;
}

/// Marker for types that support arithmetic.
pub trait Numeric: SqlType {}

/// Conversion of a plain Rust value into a value for a column of type `T`.
///
/// Used where only values are meaningful, such as record assignments.
pub trait IntoValue<T> {
    fn into_value(self) -> SqlValue;
}

fn mismatch<T>(value: &SqlValue, target: &str) -> Result<T> {
    if value.is_null() {
        return Err(Error::mapping(format!("unexpected NULL for {target}")));
    }
    Err(Error::mapping(format!(
        "cannot decode {} as {target}",
        value.type_name()
    )))
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        Ok(value)
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            SqlValue::Int(n) => Ok(n != 0),
            other => mismatch(&other, "bool"),
        }
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Int(n) => Ok(n),
            SqlValue::Bool(b) => Ok(Self::from(b)),
            other => mismatch(&other, "i64"),
        }
    }
}

macro_rules! narrow_integer {
    ($($ty:ty),+) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int(i64::from(self))
                }
            }

            impl FromSqlValue for $ty {
                fn from_sql_value(value: SqlValue) -> Result<Self> {
                    let wide = i64::from_sql_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| {
                        Error::mapping(format!(
                            "{wide} is out of range for {}",
                            stringify!($ty)
                        ))
                    })
                }
            }
        )+
    };
}

narrow_integer!(i32, i16);

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl FromSqlValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(n) => Ok(n as Self),
            SqlValue::Text(ref s) => s.parse().or_else(|_| mismatch(&value, "f64")),
            other => mismatch(&other, "f64"),
        }
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl FromSqlValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        f64::from_sql_value(value).map(|f| f as Self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Text(s) => Ok(s),
            SqlValue::Date(d) => Ok(d.format("%Y-%m-%d").to_string()),
            SqlValue::Timestamp(t) => Ok(t.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            other => mismatch(&other, "String"),
        }
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Blob(b) => Ok(b),
            other => mismatch(&other, "bytes"),
        }
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Date(self)
    }
}

impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Date(d) => Ok(d),
            SqlValue::Timestamp(t) => Ok(t.date()),
            SqlValue::Text(ref s) => {
                let day = s.get(..10).unwrap_or(s);
                Self::parse_from_str(day, "%Y-%m-%d").or_else(|_| mismatch(&value, "date"))
            }
            other => mismatch(&other, "date"),
        }
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Timestamp(self)
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Timestamp(t) => Ok(t),
            SqlValue::Date(d) => Ok(d.and_time(chrono::NaiveTime::MIN)),
            SqlValue::Text(ref s) => Self::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| Self::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .or_else(|_| mismatch(&value, "timestamp")),
            other => mismatch(&other, "timestamp"),
        }
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

macro_rules! sql_types {
    ($($ty:ty => $data_type:ident),+ $(,)?) => {
        $(
            impl SqlType for $ty {
                const DATA_TYPE: DataType = DataType::$data_type;
            }

            impl IntoValue<$ty> for $ty {
                fn into_value(self) -> SqlValue {
                    self.to_sql_value()
                }
            }
        )+
    };
}

sql_types! {
    bool => Boolean,
    i16 => Smallint,
    i32 => Integer,
    i64 => Bigint,
    f32 => Real,
    f64 => Double,
    String => Text,
    Vec<u8> => Blob,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
}

impl Numeric for i16 {}
impl Numeric for i32 {}
impl Numeric for i64 {}
impl Numeric for f32 {}
impl Numeric for f64 {}

impl IntoValue<String> for &str {
    fn into_value(self) -> SqlValue {
        self.to_sql_value()
    }
}

impl IntoValue<String> for &String {
    fn into_value(self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl<T: SqlType> IntoValue<T> for Option<T> {
    fn into_value(self) -> SqlValue {
        self.to_sql_value()
    }
}
