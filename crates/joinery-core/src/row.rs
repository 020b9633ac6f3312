//! Result rows: raw driver output and the labelled tree it is shaped into.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::expr::Field;
use crate::value::{FromSqlValue, SqlType, SqlValue};

/// Rows exactly as a driver returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

/// Where a result column came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// SQL alias of the table, e.g. `athlete__club`.
    pub alias: String,
    pub column: &'static str,
}

/// Name and origin of one slot in a result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub origin: Option<Origin>,
}

/// One slot of a materialised row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Sql(SqlValue),
    /// A nested row built with `row(...)`.
    Row(ResultRow),
    /// The rows of a multiset.
    Rows(Vec<ResultRow>),
}

impl Value {
    /// The scalar inside this slot.
    ///
    /// # Errors
    ///
    /// Returns a mapping error for nested rows and multisets.
    pub fn into_sql(self) -> Result<SqlValue> {
        match self {
            Self::Sql(value) => Ok(value),
            Self::Row(_) => Err(Error::mapping("expected a scalar, found a nested row")),
            Self::Rows(_) => Err(Error::mapping("expected a scalar, found a multiset")),
        }
    }

    /// Decodes the scalar inside this slot.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the slot is not a compatible scalar.
    pub fn decode<T: FromSqlValue>(self) -> Result<T> {
        T::from_sql_value(self.into_sql()?)
    }
}

/// A materialised row: labelled values, possibly nested.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    labels: Arc<[Label]>,
    values: Vec<Value>,
}

impl ResultRow {
    /// # Errors
    ///
    /// Returns a mapping error when labels and values differ in length.
    pub fn new(labels: Arc<[Label]>, values: Vec<Value>) -> Result<Self> {
        if labels.len() != values.len() {
            return Err(Error::mapping(format!(
                "row has {} value(s) for {} label(s)",
                values.len(),
                labels.len()
            )));
        }
        Ok(Self { labels, values })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Label and value pairs, in select-list order.
    pub fn iter(&self) -> impl Iterator<Item = (&Label, &Value)> {
        self.labels.iter().zip(&self.values)
    }

    /// The first value labelled `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|label| label.name == name)
            .map(|index| &self.values[index])
    }

    fn position_of<Tb, T>(&self, field: &Field<Tb, T>) -> Result<usize> {
        let alias = field.path().alias();
        let exact = self.labels.iter().position(|label| {
            label
                .origin
                .as_ref()
                .is_some_and(|o| o.alias == alias && o.column == field.name())
        });
        if let Some(index) = exact {
            return Ok(index);
        }
        let mut by_column = self.labels.iter().enumerate().filter(|(_, label)| {
            label
                .origin
                .as_ref()
                .is_some_and(|o| o.column == field.name())
        });
        match (by_column.next(), by_column.next()) {
            (Some((index, _)), None) => Ok(index),
            (None, _) => Err(Error::mapping(format!(
                "column `{alias}.{}` is not part of this row",
                field.name()
            ))),
            (Some(_), Some(_)) => Err(Error::mapping(format!(
                "column `{}` appears more than once; use the table alias",
                field.name()
            ))),
        }
    }

    /// Reads the value of `field` from this row.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the field was not selected, is NULL or
    /// holds an incompatible value.
    pub fn get<Tb, T: SqlType>(&self, field: &Field<Tb, T>) -> Result<T> {
        let index = self.position_of(field)?;
        self.values[index]
            .clone()
            .decode()
            .map_err(|e| e.in_column(field.name()))
    }

    /// Like [`ResultRow::get`], mapping NULL to `None`.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the field was not selected or holds an
    /// incompatible value.
    pub fn get_optional<Tb, T: SqlType>(&self, field: &Field<Tb, T>) -> Result<Option<T>> {
        let index = self.position_of(field)?;
        self.values[index]
            .clone()
            .decode()
            .map_err(|e| e.in_column(field.name()))
    }
}

/// Pulls the next column value out of a positional row and decodes it.
///
/// Used by code generated with `#[derive(Table)]`.
///
/// # Errors
///
/// Returns a mapping error naming the column when the row is short or the
/// value does not decode.
pub fn decode_column<T: FromSqlValue>(
    values: &mut impl Iterator<Item = SqlValue>,
    column: &str,
) -> Result<T> {
    let value = values
        .next()
        .ok_or_else(|| Error::mapping(format!("row ends before column `{column}`")))?;
    T::from_sql_value(value).map_err(|e| e.in_column(column))
}
