//! [`Connection`] for SQLite through sqlx.

use joinery_core::{Dialect, Error, Result, RowSet, SqlValue};
use joinery_sqlite::SqliteDialect;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Column, Row, Transaction, TypeInfo, ValueRef};
use tracing::{debug, warn};

use crate::connection::{Connection, Executed};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

impl Connection for SqlitePool {
    fn dialect(&self) -> &dyn Dialect {
        &SqliteDialect
    }

    async fn fetch_rows(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet> {
        fetch_with(&*self, sql, params).await
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Executed> {
        execute_with(&*self, sql, params).await
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> &dyn Dialect {
        &SqliteDialect
    }

    async fn fetch_rows(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet> {
        fetch_with(&mut *self, sql, params).await
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Executed> {
        execute_with(&mut *self, sql, params).await
    }
}

impl Connection for Transaction<'_, Sqlite> {
    fn dialect(&self) -> &dyn Dialect {
        &SqliteDialect
    }

    async fn fetch_rows(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet> {
        fetch_with(&mut **self, sql, params).await
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Executed> {
        execute_with(&mut **self, sql, params).await
    }
}

async fn fetch_with<'c, E>(executor: E, sql: &str, params: &[SqlValue]) -> Result<RowSet>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    debug!(sql = %sql, params = params.len(), "Fetching rows");
    let rows = params
        .iter()
        .fold(sqlx::query(sql), bind_value)
        .fetch_all(executor)
        .await
        .map_err(|e| failed(sql, e))?;

    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_owned()).collect())
        .unwrap_or_default();
    let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
    debug!(rows = rows.len(), "Fetched rows");
    Ok(RowSet { columns, rows })
}

async fn execute_with<'c, E>(executor: E, sql: &str, params: &[SqlValue]) -> Result<Executed>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    debug!(sql = %sql, params = params.len(), "Executing SQL");
    let result = params
        .iter()
        .fold(sqlx::query(sql), bind_value)
        .execute(executor)
        .await
        .map_err(|e| failed(sql, e))?;

    let rows_affected = result.rows_affected();
    debug!(rows_affected, "Executed");
    Ok(Executed {
        rows_affected,
        last_insert_id: (rows_affected > 0).then(|| result.last_insert_rowid()),
    })
}

fn failed(sql: &str, error: sqlx::Error) -> Error {
    warn!(sql = %sql, error = %error, "Statement failed");
    Error::execution(sql, error)
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &SqlValue) -> SqliteQuery<'q> {
    match value.clone() {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
        SqlValue::Date(d) => query.bind(d),
        SqlValue::Timestamp(t) => query.bind(t),
    }
}

fn decode_row(row: &SqliteRow) -> Result<Vec<SqlValue>> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

/// Decodes by the storage class of the value, not the declared column type:
/// SQLite lets any column hold any class.
fn decode_value(row: &SqliteRow, index: usize) -> Result<SqlValue> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| Error::mapping(e.to_string()))?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_owned();

    let decoded = match storage.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => row.try_get_unchecked(index).map(SqlValue::Int),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            row.try_get_unchecked(index).map(SqlValue::Float)
        }
        "BLOB" => row.try_get_unchecked(index).map(SqlValue::Blob),
        _ => row.try_get_unchecked(index).map(SqlValue::Text),
    };
    decoded.map_err(|e| {
        Error::mapping(format!("column {index} ({storage}): {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_decodes_by_storage_class() {
        let mut pool = pool().await;
        let rows = pool
            .fetch_rows(
                "SELECT 1, 2.5, 'text', x'0102', NULL, ? AS d",
                &[SqlValue::Date(
                    chrono::NaiveDate::from_ymd_opt(2022, 6, 30).unwrap(),
                )],
            )
            .await
            .unwrap();

        assert_eq!(rows.columns.len(), 6);
        assert_eq!(rows.columns[5], "d");
        assert_eq!(
            rows.rows,
            vec![vec![
                SqlValue::Int(1),
                SqlValue::Float(2.5),
                SqlValue::Text("text".into()),
                SqlValue::Blob(vec![1, 2]),
                SqlValue::Null,
                SqlValue::Text("2022-06-30".into()),
            ]]
        );
    }

    #[tokio::test]
    async fn test_execute_reports_rows_and_last_id() {
        let mut pool = pool().await;
        pool.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, flag BOOLEAN)", &[])
            .await
            .unwrap();

        let done = pool
            .execute("INSERT INTO t (flag) VALUES (?)", &[SqlValue::Bool(true)])
            .await
            .unwrap();
        assert_eq!(done.rows_affected, 1);
        assert_eq!(done.last_insert_id, Some(1));

        let done = pool
            .execute("DELETE FROM t WHERE id = ?", &[SqlValue::Int(9)])
            .await
            .unwrap();
        assert_eq!(done.rows_affected, 0);
        assert_eq!(done.last_insert_id, None);
    }

    #[tokio::test]
    async fn test_driver_errors_keep_the_sql() {
        let mut pool = pool().await;
        let err = pool.fetch_rows("SELECT * FROM missing", &[]).await.unwrap_err();
        match err {
            Error::Execution { sql, .. } => assert_eq!(sql, "SELECT * FROM missing"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
