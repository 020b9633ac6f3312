use std::collections::{HashMap, HashSet};

use super::{ColumnDef, ForeignKeyDef, Table, TableDef};
use crate::error::{Error, Result};

/// A validated set of table descriptions.
///
/// Built once with [`Schema::builder`] and shared read-only afterwards,
/// typically behind an `Arc`.
#[derive(Debug)]
pub struct Schema {
    tables: Vec<&'static TableDef>,
    index: HashMap<&'static str, usize>,
}

/// Collects table descriptions for a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<&'static TableDef>,
}

impl SchemaBuilder {
    /// Registers the table behind a derived handle type.
    #[must_use]
    pub fn table<T: Table>(self) -> Self {
        self.def(T::DEF)
    }

    /// Registers a table description directly.
    #[must_use]
    pub fn def(mut self, def: &'static TableDef) -> Self {
        self.tables.push(def);
        self
    }

    /// Validates the collected tables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] for duplicate tables or columns, unknown
    /// key columns, and foreign keys pointing at unregistered tables or
    /// columns or with mismatched arity.
    pub fn build(self) -> Result<Schema> {
        let mut index = HashMap::new();
        for (position, def) in self.tables.iter().enumerate() {
            if index.insert(def.name, position).is_some() {
                return Err(Error::metadata(format!(
                    "table `{}` is declared twice",
                    def.name
                )));
            }
        }
        let schema = Schema {
            tables: self.tables,
            index,
        };
        for def in &schema.tables {
            schema.validate_table(def)?;
        }
        Ok(schema)
    }
}

impl Schema {
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    fn validate_table(&self, def: &TableDef) -> Result<()> {
        let mut seen = HashSet::new();
        for column in def.columns {
            if !seen.insert(column.name) {
                return Err(Error::metadata(format!(
                    "column `{}.{}` is declared twice",
                    def.name, column.name
                )));
            }
        }
        for key in def.primary_key {
            if def.column(key).is_none() {
                return Err(Error::metadata(format!(
                    "primary key column `{}.{key}` does not exist",
                    def.name
                )));
            }
        }

        let mut names = HashSet::new();
        for fk in def.foreign_keys {
            if !names.insert(fk.name) {
                return Err(Error::metadata(format!(
                    "foreign key `{}` is declared twice on `{}`",
                    fk.name, def.name
                )));
            }
            self.validate_foreign_key(def, fk)?;
        }
        Ok(())
    }

    fn validate_foreign_key(&self, def: &TableDef, fk: &ForeignKeyDef) -> Result<()> {
        let target = fk.target_table();
        if !self.index.contains_key(target.name) {
            return Err(Error::metadata(format!(
                "foreign key `{}.{}` references unregistered table `{}`",
                def.name, fk.name, target.name
            )));
        }
        let target_columns = fk.target_columns();
        if fk.columns.is_empty() || fk.columns.len() != target_columns.len() {
            return Err(Error::metadata(format!(
                "foreign key `{}.{}` has {} column(s) but references {}",
                def.name,
                fk.name,
                fk.columns.len(),
                target_columns.len()
            )));
        }
        for column in fk.columns {
            if def.column(column).is_none() {
                return Err(Error::metadata(format!(
                    "foreign key `{}.{}` uses unknown column `{column}`",
                    def.name, fk.name
                )));
            }
        }
        for column in target_columns {
            if target.column(column).is_none() {
                return Err(Error::metadata(format!(
                    "foreign key `{}.{}` references unknown column `{}.{column}`",
                    def.name, fk.name, target.name
                )));
            }
        }
        Ok(())
    }

    /// All registered tables, in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &'static TableDef> + '_ {
        self.tables.iter().copied()
    }

    /// Looks a table up by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] when no such table is registered.
    pub fn table(&self, name: &str) -> Result<&'static TableDef> {
        self.index
            .get(name)
            .map(|&position| self.tables[position])
            .ok_or_else(|| Error::metadata(format!("unknown table `{name}`")))
    }

    /// Looks a column up by table and column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] for unknown tables or columns.
    pub fn column(&self, table: &str, column: &str) -> Result<&'static ColumnDef> {
        self.table(table)?.column(column).ok_or_else(|| {
            Error::metadata(format!("unknown column `{column}` on table `{table}`"))
        })
    }

    /// Foreign keys declared on a table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] when the table is unknown.
    pub fn foreign_keys(&self, table: &str) -> Result<&'static [ForeignKeyDef]> {
        Ok(self.table(table)?.foreign_keys)
    }

    /// The foreign key reached through a named navigation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] when the table has no such navigation.
    pub fn navigation(&self, table: &str, name: &str) -> Result<&'static ForeignKeyDef> {
        self.table(table)?.foreign_key(name).ok_or_else(|| {
            Error::metadata(format!("table `{table}` has no navigation `{name}`"))
        })
    }

    /// The single foreign key from `table` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] when there is none and
    /// [`Error::Ambiguous`] when there are several.
    pub fn edge_to(&self, table: &str, target: &str) -> Result<&'static ForeignKeyDef> {
        let candidates: Vec<&'static ForeignKeyDef> = self
            .foreign_keys(table)?
            .iter()
            .filter(|fk| fk.target_table().name == target)
            .collect();
        match candidates.as_slice() {
            [] => Err(Error::metadata(format!(
                "no foreign key leads from `{table}` to `{target}`"
            ))),
            [fk] => Ok(*fk),
            many => Err(Error::Ambiguous {
                table: table.to_string(),
                target: target.to_string(),
                candidates: many.iter().map(|fk| fk.name.to_string()).collect(),
            }),
        }
    }

    /// Every foreign key that points at `target`, with its owning table.
    pub fn referencing<'a>(
        &'a self,
        target: &'a str,
    ) -> impl Iterator<Item = (&'static TableDef, &'static ForeignKeyDef)> + 'a {
        self.tables().flat_map(move |def| {
            def.foreign_keys
                .iter()
                .filter(move |fk| fk.target_table().name == target)
                .map(move |fk| (def, fk))
        })
    }
}
