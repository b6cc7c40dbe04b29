use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::database::pool::DbError;
use crate::query::ListQuery;

/// Typed access to one table plus dynamic list queries built by the
/// query module.
pub struct Repository<T> {
    table_name: String,
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize,
{
    pub fn new(table_name: impl Into<String>, pool: PgPool) -> Self {
        Self {
            table_name: table_name.into(),
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Fetch the filtered page as JSON rows plus the total matching count.
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<Value>, i64), DbError> {
        let rendered = query.to_sql();
        let mut q = sqlx::query(&rendered.sql);
        for p in rendered.params.iter() {
            q = bind_value(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(|row| row.try_get::<Value, _>("row").unwrap_or(Value::Null))
            .collect();

        let counted = query.to_count_sql();
        let mut q = sqlx::query(&counted.sql);
        for p in counted.params.iter() {
            q = bind_value(q, p);
        }
        let count: i64 = q.fetch_one(&self.pool).await?.try_get("count")?;

        Ok((items, count))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, DbError> {
        let sql = format!("SELECT * FROM \"{}\" WHERE id = $1", self.table_name);
        let row = sqlx::query_as::<_, T>(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row)
    }

    /// Fetch by id, converting absence into a NotFound error with the
    /// client-facing message.
    pub async fn find_by_id_404(&self, id: Uuid) -> Result<T, DbError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Resource not found with id {}", id)))
    }

    /// Delete by id; Ok(false) when no row matched.
    pub async fn delete_by_id(&self, id: Uuid) -> Result<bool, DbError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", self.table_name);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Bind a JSON value with the Postgres type its content implies. Strings
/// shaped like UUIDs or RFC3339 timestamps bind as those types so filters on
/// id and timestamp columns compare correctly.
fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres has no u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => {
            if let Ok(id) = Uuid::parse_str(s) {
                q.bind(id)
            } else if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(s) {
                q.bind(ts.with_timezone(&chrono::Utc))
            } else {
                q.bind(s)
            }
        }
        // Arrays are expanded into per-element placeholders before binding
        Value::Array(_) => q,
        Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}
