//! Records: one table row held in memory with change tracking.
//!
//! A [`Record`] keeps the current value of every column next to the value
//! last read from or written to the database. Setters only touch memory;
//! the statements that persist a record are derived from the difference
//! between the two.

use std::fmt;
use std::marker::PhantomData;

use crate::builder::{
    delete_from, insert_into, select_from, update, Delete, HasFrom, HasSet, InsertReturning,
    Select, Update,
};
use crate::error::{Error, Result};
use crate::expr::{BinaryOp, ColumnRef, Condition, Expr, ExprNode, Field};
use crate::projection::AllColumns;
use crate::schema::{Table, TableDef, TablePath, TableRow};
use crate::value::{IntoValue, SqlType, SqlValue};

/// A row of table `T` with per-column dirty tracking.
///
/// `None` marks a column that was never assigned.
pub struct Record<T> {
    values: Vec<Option<SqlValue>>,
    original: Vec<Option<SqlValue>>,
    persisted: bool,
    _table: PhantomData<fn() -> T>,
}

impl<T: Table> Record<T> {
    /// A new record with every column unset.
    #[must_use]
    pub fn new() -> Self {
        let width = T::DEF.columns.len();
        Self {
            values: vec![None; width],
            original: vec![None; width],
            persisted: false,
            _table: PhantomData,
        }
    }

    /// A persisted record holding one value per column, in column order.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the number of values does not match the
    /// table.
    pub fn loaded(values: Vec<SqlValue>) -> Result<Self> {
        let mut record = Self::new();
        record.load(values)?;
        Ok(record)
    }

    /// A new record assigned from a row struct. Generated columns stay
    /// unset so that the database assigns them on insert.
    #[must_use]
    pub fn from_row(row: T::Row) -> Self {
        let mut record = Self::new();
        for ((slot, column), value) in record
            .values
            .iter_mut()
            .zip(T::DEF.columns)
            .zip(row.into_values())
        {
            if !column.generated {
                *slot = Some(value);
            }
        }
        record
    }

    #[must_use]
    pub const fn def(&self) -> &'static TableDef {
        T::DEF
    }

    /// Replaces every value and marks the record persisted.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the number of values does not match the
    /// table.
    pub fn load(&mut self, values: Vec<SqlValue>) -> Result<()> {
        if values.len() != T::DEF.columns.len() {
            return Err(Error::mapping(format!(
                "`{}` has {} column(s), row has {}",
                T::DEF.name,
                T::DEF.columns.len(),
                values.len()
            )));
        }
        self.values = values.into_iter().map(Some).collect();
        self.original.clone_from(&self.values);
        self.persisted = true;
        Ok(())
    }

    /// Assigns a column. Nothing is written until the record is stored.
    pub fn set<V: SqlType>(&mut self, field: &Field<T, V>, value: impl IntoValue<V>) -> &mut Self {
        if let Some(index) = T::DEF.column_index(field.name()) {
            self.values[index] = Some(value.into_value());
        }
        self
    }

    /// Assigns a column by name, checking the value against the column type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] for an unknown column and
    /// [`Error::TypeMismatch`] when the value does not fit it.
    pub fn set_value(&mut self, column: &str, value: SqlValue) -> Result<&mut Self> {
        let index = T::DEF.column_index(column).ok_or_else(|| {
            Error::metadata(format!("unknown column `{}.{column}`", T::DEF.name))
        })?;
        let def = &T::DEF.columns[index];
        let rejects_null = value.is_null() && !def.nullable && !def.generated;
        if rejects_null || !value.fits(def.data_type) {
            return Err(Error::TypeMismatch {
                column: format!("{}.{}", T::DEF.name, def.name),
                expected: if def.nullable {
                    def.data_type.to_string()
                } else {
                    format!("non-null {}", def.data_type)
                },
                found: value.type_name().to_string(),
            });
        }
        self.values[index] = Some(value);
        Ok(self)
    }

    /// Reads a column; `None` when unset or NULL.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the stored value does not decode as `V`.
    pub fn get<V: SqlType>(&self, field: &Field<T, V>) -> Result<Option<V>> {
        match self.value(field.name()) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(value) => V::from_sql_value(value.clone())
                .map(Some)
                .map_err(|e| e.in_column(field.name())),
        }
    }

    /// The current value of a column, `None` when unset.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        T::DEF
            .column_index(column)
            .and_then(|index| self.values[index].as_ref())
    }

    /// Whether the record has not been stored yet.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        !self.persisted
    }

    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed_indexes().next().is_some()
    }

    /// Columns whose value differs from the last stored or loaded one.
    #[must_use]
    pub fn changed_columns(&self) -> Vec<&'static str> {
        self.changed_indexes()
            .map(|index| T::DEF.columns[index].name)
            .collect()
    }

    fn changed_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.values
            .iter()
            .zip(&self.original)
            .enumerate()
            .filter(|(_, (value, original))| value.is_some() && value != original)
            .map(|(index, _)| index)
    }

    /// Converts into the table's row struct; unset columns read as NULL.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when a value does not fit the row struct.
    pub fn into_row(self) -> Result<T::Row> {
        T::Row::from_values(
            self.values
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
        )
    }

    /// Takes the current values as the stored state.
    pub fn reset_changes(&mut self) {
        self.original.clone_from(&self.values);
        self.persisted = true;
    }

    /// Forgets the stored state; every assigned column counts as changed.
    pub fn mark_new(&mut self) {
        self.original = vec![None; self.values.len()];
        self.persisted = false;
    }

    /// The stored primary key values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] when the table has no primary key or
    /// the record holds no stored key.
    pub fn key(&self) -> Result<Vec<SqlValue>> {
        let indexes = T::DEF.primary_key_indexes();
        if indexes.is_empty() {
            return Err(Error::Unsupported(format!(
                "`{}` has no primary key",
                T::DEF.name
            )));
        }
        indexes
            .into_iter()
            .map(|index| {
                self.original[index]
                    .clone()
                    .filter(|value| !value.is_null())
                    .ok_or_else(|| {
                        Error::Unsupported(format!(
                            "record of `{}` has no stored key",
                            T::DEF.name
                        ))
                    })
            })
            .collect()
    }

    fn key_condition(&self) -> Result<Condition> {
        let path = TablePath::root(T::DEF.name);
        let conditions = T::DEF
            .primary_key_indexes()
            .into_iter()
            .map(|index| &T::DEF.columns[index])
            .zip(self.key()?)
            .map(|(column, value)| {
                ExprNode::binary(
                    ExprNode::Column(ColumnRef {
                        path: path.clone(),
                        column,
                    }),
                    BinaryOp::Eq,
                    ExprNode::Param(value),
                )
            });
        ExprNode::and_all(conditions)
            .map(Expr::from_node)
            .ok_or_else(|| Error::Unsupported(format!("`{}` has no primary key", T::DEF.name)))
    }

    /// INSERT of the assigned columns, returning the whole stored row.
    #[must_use]
    pub fn insert_statement(&self) -> InsertReturning<AllColumns<T>> {
        let table = T::root();
        let mut insert = insert_into(&table);
        for (value, column) in self.values.iter().zip(T::DEF.columns) {
            if let Some(value) = value {
                insert.push_value(column, value.clone());
            }
        }
        insert.returning(AllColumns::of(&table))
    }

    /// UPDATE of the changed columns by stored key; `None` when nothing
    /// changed.
    ///
    /// # Errors
    ///
    /// Same as [`Record::key`].
    pub fn update_statement(&self) -> Result<Option<Update<T, HasSet>>> {
        let table = T::root();
        let mut statement: Option<Update<T, HasSet>> = None;
        for index in self.changed_indexes() {
            let column = &T::DEF.columns[index];
            let value = self.values[index].clone().unwrap_or_default();
            statement = Some(match statement {
                Some(statement) => statement.set_value(column, value),
                None => update(&table).set_value(column, value),
            });
        }
        match statement {
            Some(statement) => Ok(Some(statement.where_clause(self.key_condition()?))),
            None => Ok(None),
        }
    }

    /// DELETE by stored key.
    ///
    /// # Errors
    ///
    /// Same as [`Record::key`].
    pub fn delete_statement(&self) -> Result<Delete<T>> {
        Ok(delete_from(&T::root()).where_clause(self.key_condition()?))
    }

    /// SELECT of the stored row by key.
    ///
    /// # Errors
    ///
    /// Same as [`Record::key`].
    pub fn select_statement(&self) -> Result<Select<AllColumns<T>, HasFrom>> {
        Ok(select_from(&T::root()).where_clause(self.key_condition()?))
    }
}

impl<T: Table> Default for Record<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Record<T> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            original: self.original.clone(),
            persisted: self.persisted,
            _table: PhantomData,
        }
    }
}

impl<T> PartialEq for Record<T> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.persisted == other.persisted
    }
}

impl<T: Table> fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (column, value) in T::DEF.columns.iter().zip(&self.values) {
            if let Some(value) = value {
                map.entry(&column.name, value);
            }
        }
        map.finish()
    }
}
