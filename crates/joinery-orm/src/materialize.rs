//! Folds flat driver rows into labelled, nested result rows.
//!
//! Multisets run one correlated sub-select per enclosing row, bound to the
//! hidden outer columns recorded in the layout.

use std::future::Future;
use std::pin::Pin;

use joinery_core::row::{ResultRow, RowSet, Value};
use joinery_core::statement::{labels_of, Slot};
use joinery_core::{Error, Result, SqlValue};
use tracing::debug;

use crate::connection::Connection;
use crate::settings::Settings;

type LocalFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Shapes every row of `rows` according to `slots`.
pub(crate) fn materialize<'a, C: Connection>(
    conn: &'a mut C,
    settings: &'a Settings,
    slots: &'a [Slot],
    rows: RowSet,
) -> LocalFuture<'a, Result<Vec<ResultRow>>> {
    Box::pin(async move {
        let labels = labels_of(slots);
        let mut shaped = Vec::with_capacity(rows.rows.len());
        for row in rows.rows {
            let values = fold(conn, settings, slots, &row).await?;
            shaped.push(ResultRow::new(labels.clone(), values)?);
        }
        Ok(shaped)
    })
}

async fn fold<C: Connection>(
    conn: &mut C,
    settings: &Settings,
    slots: &[Slot],
    row: &[SqlValue],
) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(slots.len());
    for slot in slots {
        let value = match slot {
            Slot::Column { index, .. } => Value::Sql(column(row, *index)?),
            Slot::Nested { slots, .. } => {
                let nested = Box::pin(fold(conn, settings, slots, row)).await?;
                Value::Row(ResultRow::new(labels_of(slots), nested)?)
            }
            Slot::Multiset {
                label,
                query,
                bindings,
            } => {
                let outer = bindings
                    .iter()
                    .map(|index| column(row, *index))
                    .collect::<Result<Vec<_>>>()?;
                let rendered = query.render_correlated(conn.dialect(), &outer)?;
                let children = conn.fetch_rows(&rendered.sql, &rendered.params).await?;
                debug!(multiset = %label, rows = children.rows.len(), "Fetched multiset");
                if let Some(limit) = settings.max_multiset_rows {
                    if children.rows.len() > limit {
                        return Err(Error::Cardinality {
                            expected: format!("at most {limit} in multiset `{label}`"),
                            actual: children.rows.len(),
                        });
                    }
                }
                Value::Rows(materialize(conn, settings, &query.layout().slots, children).await?)
            }
        };
        values.push(value);
    }
    Ok(values)
}

fn column(row: &[SqlValue], index: usize) -> Result<SqlValue> {
    row.get(index).cloned().ok_or_else(|| {
        Error::mapping(format!(
            "row has {} column(s), layout expects column {index}",
            row.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Executed;
    use joinery_core::{Dialect, GenericDialect};

    /// Answers every query with the same canned rows and records the SQL.
    struct Canned {
        rows: Vec<Vec<SqlValue>>,
        seen: Vec<(String, Vec<SqlValue>)>,
    }

    impl Connection for Canned {
        fn dialect(&self) -> &dyn Dialect {
            &GenericDialect
        }

        async fn fetch_rows(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet> {
            self.seen.push((sql.to_owned(), params.to_vec()));
            Ok(RowSet {
                columns: Vec::new(),
                rows: self.rows.clone(),
            })
        }

        async fn execute(&mut self, _sql: &str, _params: &[SqlValue]) -> Result<Executed> {
            Ok(Executed::default())
        }
    }

    fn label(name: &str) -> joinery_core::row::Label {
        joinery_core::row::Label {
            name: name.to_owned(),
            origin: None,
        }
    }

    #[tokio::test]
    async fn test_nested_slots_share_the_flat_row() {
        let slots = vec![
            Slot::Column {
                index: 0,
                label: label("id"),
            },
            Slot::Nested {
                label: "athlete".into(),
                slots: vec![
                    Slot::Column {
                        index: 1,
                        label: label("first_name"),
                    },
                    Slot::Column {
                        index: 2,
                        label: label("last_name"),
                    },
                ],
            },
        ];
        let rows = RowSet {
            columns: Vec::new(),
            rows: vec![vec![
                SqlValue::Int(1000),
                SqlValue::Text("Armand".into()),
                SqlValue::Text("Duplantis".into()),
            ]],
        };
        let mut conn = Canned {
            rows: Vec::new(),
            seen: Vec::new(),
        };

        let shaped = materialize(&mut conn, &Settings::new(), &slots, rows)
            .await
            .unwrap();

        assert_eq!(shaped.len(), 1);
        let Some(Value::Row(athlete)) = shaped[0].value("athlete") else {
            panic!("expected a nested row");
        };
        assert_eq!(
            athlete.value("last_name"),
            Some(&Value::Sql(SqlValue::Text("Duplantis".into())))
        );
        assert!(conn.seen.is_empty());
    }

    #[tokio::test]
    async fn test_short_rows_are_a_mapping_error() {
        let slots = vec![Slot::Column {
            index: 3,
            label: label("id"),
        }];
        let rows = RowSet {
            columns: Vec::new(),
            rows: vec![vec![SqlValue::Int(1)]],
        };
        let mut conn = Canned {
            rows: Vec::new(),
            seen: Vec::new(),
        };

        let err = materialize(&mut conn, &Settings::new(), &slots, rows)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Mapping(_)));
    }
}
