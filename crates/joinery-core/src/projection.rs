//! Select lists and the shapes their rows decode into.
//!
//! A select list has two halves. The untyped half is a tree of
//! [`ProjectionItem`]s the statement engine flattens into SQL columns. The
//! typed half decodes each materialised [`ResultRow`] back into the Rust
//! value the list promised: a scalar, a tuple, a record, a nested row or a
//! multiset of rows.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::{HasFrom, Select, SelectQuery};
use crate::error::{Error, Result};
use crate::expr::{Expr, ExprNode, Field, Labeled};
use crate::record::Record;
use crate::row::{ResultRow, Value};
use crate::schema::{Table, TablePath};
use crate::value::{SqlType, SqlValue};

/// One entry of a select list, before resolution.
#[derive(Debug, Clone)]
pub enum ProjectionItem {
    Expr {
        node: ExprNode,
        label: Option<String>,
    },
    /// Every column of one table.
    AllColumns { path: TablePath },
    /// Every column of the FROM table and the explicitly joined tables.
    Asterisk,
    Nested {
        label: String,
        items: Vec<ProjectionItem>,
    },
    Multiset {
        label: String,
        query: Box<SelectQuery>,
    },
}

/// A single slot of a select list.
pub trait Selectable: Send + Sync + 'static {
    type Output;

    fn item(&self) -> ProjectionItem;

    /// Decodes the materialised value of this slot.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the value does not have the expected
    /// shape or type.
    fn decode(&self, value: Value) -> Result<Self::Output>;
}

/// A complete select list and the row type it produces.
pub trait SelectList: Send + Sync + 'static {
    type Row;

    fn items(&self) -> Vec<ProjectionItem>;

    /// Decodes one materialised row.
    ///
    /// # Errors
    ///
    /// Returns a mapping error on arity or type mismatch.
    fn decode_row(&self, row: ResultRow) -> Result<Self::Row>;
}

fn check_arity(actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::mapping(format!(
            "expected {expected} value(s) per row, found {actual}"
        )))
    }
}

impl<Tb: Send + Sync + 'static, T: SqlType> Selectable for Field<Tb, T> {
    type Output = T;

    fn item(&self) -> ProjectionItem {
        ProjectionItem::Expr {
            node: self.node(),
            label: None,
        }
    }

    fn decode(&self, value: Value) -> Result<T> {
        value.decode().map_err(|e| e.in_column(self.name()))
    }
}

impl<T: SqlType> Selectable for Expr<T> {
    type Output = T;

    fn item(&self) -> ProjectionItem {
        ProjectionItem::Expr {
            node: self.node().clone(),
            label: None,
        }
    }

    fn decode(&self, value: Value) -> Result<T> {
        value.decode()
    }
}

impl<T: SqlType> Selectable for Labeled<T> {
    type Output = T;

    fn item(&self) -> ProjectionItem {
        ProjectionItem::Expr {
            node: self.expr.node().clone(),
            label: Some(self.label.clone()),
        }
    }

    fn decode(&self, value: Value) -> Result<T> {
        value.decode().map_err(|e| e.in_column(&self.label))
    }
}

/// A scalar slot that may be NULL.
pub struct Optional<T> {
    item: ProjectionItem,
    _type: PhantomData<fn() -> T>,
}

impl<T> Clone for Optional<T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            _type: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Optional<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Optional").field(&self.item).finish()
    }
}

impl<T: SqlType> Selectable for Optional<T> {
    type Output = Option<T>;

    fn item(&self) -> ProjectionItem {
        self.item.clone()
    }

    fn decode(&self, value: Value) -> Result<Option<T>> {
        value.decode()
    }
}

impl<Tb: Send + Sync + 'static, T: SqlType> Field<Tb, T> {
    /// Selects this column as `Option<T>`, for nullable columns and outer
    /// joins.
    #[must_use]
    pub fn optional(&self) -> Optional<T> {
        Optional {
            item: self.item(),
            _type: PhantomData,
        }
    }
}

impl<T: SqlType> Expr<T> {
    /// Selects this expression as `Option<T>`.
    #[must_use]
    pub fn optional(&self) -> Optional<T> {
        Optional {
            item: self.item(),
            _type: PhantomData,
        }
    }
}

impl<T: SqlType> Labeled<T> {
    /// Selects this expression as `Option<T>`.
    #[must_use]
    pub fn optional(&self) -> Optional<T> {
        Optional {
            item: self.item(),
            _type: PhantomData,
        }
    }
}

type Decoder<R> = Arc<dyn Fn(ResultRow) -> Result<R> + Send + Sync>;

/// Several expressions grouped into one nested row.
pub struct Nested<R> {
    label: String,
    items: Vec<ProjectionItem>,
    decoder: Decoder<R>,
}

impl<R> Nested<R> {
    /// Labels the nested row, e.g. for named mapping.
    #[must_use]
    pub fn as_(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl<R> Clone for Nested<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            items: self.items.clone(),
            decoder: Arc::clone(&self.decoder),
        }
    }
}

impl<R> fmt::Debug for Nested<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nested")
            .field("label", &self.label)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl<R: 'static> Selectable for Nested<R> {
    type Output = R;

    fn item(&self) -> ProjectionItem {
        ProjectionItem::Nested {
            label: self.label.clone(),
            items: self.items.clone(),
        }
    }

    fn decode(&self, value: Value) -> Result<R> {
        match value {
            Value::Row(row) => (self.decoder)(row),
            Value::Sql(_) | Value::Rows(_) => Err(Error::mapping(format!(
                "expected nested row `{}`",
                self.label
            ))),
        }
    }
}

/// A row constructor waiting for its mapping.
#[derive(Debug, Clone)]
pub struct RowConstructor<L> {
    list: L,
}

/// Groups a select list into a nested row: `row((c.id(), c.name()))`.
#[must_use]
pub const fn row<L: SelectList>(list: L) -> RowConstructor<L> {
    RowConstructor { list }
}

impl<L: SelectList> RowConstructor<L> {
    /// Maps the nested row through `f`, typically a constructor.
    #[must_use]
    pub fn mapping<R, F>(self, f: F) -> Nested<R>
    where
        F: Fn(L::Row) -> R + Send + Sync + 'static,
    {
        let items = self.list.items();
        let list = self.list;
        Nested {
            label: String::from("nested"),
            items,
            decoder: Arc::new(move |row| list.decode_row(row).map(&f)),
        }
    }

    /// Keeps the nested row as the list's own row type.
    #[must_use]
    pub fn into_nested(self) -> Nested<L::Row> {
        self.mapping(|row| row)
    }
}

/// The rows of a correlated sub-select, carried as one slot.
pub struct Multiset<R> {
    label: String,
    query: SelectQuery,
    decoder: Decoder<R>,
}

impl<R> Multiset<R> {
    /// Labels the multiset, e.g. for named mapping.
    #[must_use]
    pub fn as_(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl<R> Clone for Multiset<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            query: self.query.clone(),
            decoder: Arc::clone(&self.decoder),
        }
    }
}

impl<R> fmt::Debug for Multiset<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiset")
            .field("label", &self.label)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl<R: 'static> Selectable for Multiset<R> {
    type Output = Vec<R>;

    fn item(&self) -> ProjectionItem {
        ProjectionItem::Multiset {
            label: self.label.clone(),
            query: Box::new(self.query.clone()),
        }
    }

    fn decode(&self, value: Value) -> Result<Vec<R>> {
        match value {
            Value::Rows(rows) => rows.into_iter().map(|row| (self.decoder)(row)).collect(),
            Value::Sql(_) | Value::Row(_) => Err(Error::mapping(format!(
                "expected multiset `{}`",
                self.label
            ))),
        }
    }
}

/// A sub-select waiting for its mapping.
#[derive(Debug, Clone)]
pub struct MultisetBuilder<L> {
    select: Select<L, HasFrom>,
}

/// Turns a sub-select into a multiset slot.
///
/// The sub-select may reference tables of the enclosing statement; those
/// references are bound per outer row when the statement runs.
#[must_use]
pub const fn multiset<L: SelectList>(select: Select<L, HasFrom>) -> MultisetBuilder<L> {
    MultisetBuilder { select }
}

impl<L: SelectList> MultisetBuilder<L> {
    /// Maps each sub-row through `f`.
    #[must_use]
    pub fn mapping<R, F>(self, f: F) -> Multiset<R>
    where
        F: Fn(L::Row) -> R + Send + Sync + 'static,
    {
        let (list, query) = self.select.into_parts();
        Multiset {
            label: String::from("multiset"),
            query,
            decoder: Arc::new(move |row| list.decode_row(row).map(&f)),
        }
    }

    /// Keeps each sub-row as the list's own row type.
    #[must_use]
    pub fn into_multiset(self) -> Multiset<L::Row> {
        self.mapping(|row| row)
    }
}

macro_rules! single_select_list {
    ($(impl<$($param:ident),*> for $ty:ty;)+) => {
        $(
            impl<$($param),*> SelectList for $ty
            where
                $ty: Selectable,
            {
                type Row = <$ty as Selectable>::Output;

                fn items(&self) -> Vec<ProjectionItem> {
                    vec![self.item()]
                }

                fn decode_row(&self, row: ResultRow) -> Result<Self::Row> {
                    let mut values = row.into_values();
                    check_arity(values.len(), 1)?;
                    match values.pop() {
                        Some(value) => self.decode(value),
                        None => Err(Error::mapping("empty row")),
                    }
                }
            }
        )+
    };
}

single_select_list! {
    impl<Tb, T> for Field<Tb, T>;
    impl<T> for Expr<T>;
    impl<T> for Labeled<T>;
    impl<T> for Optional<T>;
    impl<R> for Nested<R>;
    impl<R> for Multiset<R>;
}

macro_rules! tuple_select_list {
    ($len:expr; $($name:ident . $idx:tt),+) => {
        impl<$($name: Selectable),+> SelectList for ($($name,)+) {
            type Row = ($(<$name as Selectable>::Output,)+);

            fn items(&self) -> Vec<ProjectionItem> {
                vec![$(self.$idx.item()),+]
            }

            fn decode_row(&self, row: ResultRow) -> Result<Self::Row> {
                let values = row.into_values();
                check_arity(values.len(), $len)?;
                let mut values = values.into_iter();
                Ok(($(
                    self.$idx.decode(
                        values.next().ok_or_else(|| Error::mapping("short row"))?,
                    )?,
                )+))
            }
        }
    };
}

tuple_select_list!(1; A.0);
tuple_select_list!(2; A.0, B.1);
tuple_select_list!(3; A.0, B.1, C.2);
tuple_select_list!(4; A.0, B.1, C.2, D.3);
tuple_select_list!(5; A.0, B.1, C.2, D.3, E.4);
tuple_select_list!(6; A.0, B.1, C.2, D.3, E.4, F.5);
tuple_select_list!(7; A.0, B.1, C.2, D.3, E.4, F.5, G.6);
tuple_select_list!(8; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
tuple_select_list!(9; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8);
tuple_select_list!(10; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9);
tuple_select_list!(11; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10);
tuple_select_list!(12; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10, L.11);

/// Every column of one table, decoded into a persisted [`Record`].
pub struct AllColumns<Tb> {
    path: TablePath,
    _table: PhantomData<fn() -> Tb>,
}

impl<Tb: Table> AllColumns<Tb> {
    #[must_use]
    pub fn of(table: &Tb) -> Self {
        Self {
            path: table.path().clone(),
            _table: PhantomData,
        }
    }
}

impl<Tb> Clone for AllColumns<Tb> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _table: PhantomData,
        }
    }
}

impl<Tb> fmt::Debug for AllColumns<Tb> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AllColumns({})", self.path)
    }
}

fn scalars(row: ResultRow) -> Result<Vec<SqlValue>> {
    row.into_values().into_iter().map(Value::into_sql).collect()
}

impl<Tb: Table> SelectList for AllColumns<Tb> {
    type Row = Record<Tb>;

    fn items(&self) -> Vec<ProjectionItem> {
        vec![ProjectionItem::AllColumns {
            path: self.path.clone(),
        }]
    }

    fn decode_row(&self, row: ResultRow) -> Result<Record<Tb>> {
        Record::loaded(scalars(row)?)
    }
}

/// The primary key columns of one table, as raw values.
pub struct KeyColumns<Tb> {
    path: TablePath,
    _table: PhantomData<fn() -> Tb>,
}

impl<Tb: Table> KeyColumns<Tb> {
    #[must_use]
    pub fn of(table: &Tb) -> Self {
        Self {
            path: table.path().clone(),
            _table: PhantomData,
        }
    }
}

impl<Tb: Table> SelectList for KeyColumns<Tb> {
    type Row = Vec<SqlValue>;

    fn items(&self) -> Vec<ProjectionItem> {
        Tb::DEF
            .primary_key_indexes()
            .into_iter()
            .map(|index| ProjectionItem::Expr {
                node: Field::<Tb, SqlValue>::new(self.path.clone(), &Tb::DEF.columns[index])
                    .node(),
                label: None,
            })
            .collect()
    }

    fn decode_row(&self, row: ResultRow) -> Result<Vec<SqlValue>> {
        scalars(row)
    }
}

/// Every column of the FROM table and the explicitly joined tables.
///
/// Rows stay as [`ResultRow`]s; read them with [`ResultRow::get`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Asterisk;

#[must_use]
pub const fn asterisk() -> Asterisk {
    Asterisk
}

impl SelectList for Asterisk {
    type Row = ResultRow;

    fn items(&self) -> Vec<ProjectionItem> {
        vec![ProjectionItem::Asterisk]
    }

    fn decode_row(&self, row: ResultRow) -> Result<ResultRow> {
        Ok(row)
    }
}
