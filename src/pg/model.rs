//! [`Model`] over one PostgreSQL table.

use crate::error::{ConfigError, ModelError};
use crate::model::{Model, Record, Where};
use crate::pg::builder::{self, QueryBuf};
use crate::pg::params::PgBindValue;
use crate::pg::table::TableDef;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo};

#[derive(Clone, Debug)]
pub struct PgModel {
    pool: PgPool,
    table: TableDef,
}

impl PgModel {
    pub fn new(pool: PgPool, table: TableDef) -> Result<Self, ConfigError> {
        table.validate()?;
        Ok(PgModel { pool, table })
    }

    pub fn table(&self) -> &TableDef {
        &self.table
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Record>, ModelError> {
        let row = bound(q).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, ModelError> {
        Ok(bound(q).execute(&self.pool).await?.rows_affected())
    }
}

fn bound(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    q.params
        .iter()
        .fold(sqlx::query(&q.sql), |query, p| query.bind(PgBindValue::from(p)))
}

#[async_trait]
impl Model for PgModel {
    fn name(&self) -> &str {
        &self.table.table
    }

    fn primary_key(&self) -> &str {
        &self.table.primary_key
    }

    async fn find_by_pk(&self, id: &Value, scope: &Where) -> Result<Option<Record>, ModelError> {
        let q = builder::select_by_pk(&self.table, id, scope)?;
        self.fetch_optional(&q).await
    }

    async fn find_one(&self, filter: &Where) -> Result<Option<Record>, ModelError> {
        let q = builder::select(&self.table, filter, Some(1))?;
        self.fetch_optional(&q).await
    }

    async fn find_all(&self, filter: &Where) -> Result<Vec<Record>, ModelError> {
        let q = builder::select(&self.table, filter, None)?;
        let rows = bound(&q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn create(&self, values: Record) -> Result<Record, ModelError> {
        let q = builder::insert(&self.table, &values)?;
        let row = bound(&q).fetch_one(&self.pool).await?;
        Ok(row_to_record(&row))
    }

    async fn update(&self, values: &Record, filter: &Where) -> Result<u64, ModelError> {
        match builder::update(&self.table, values, filter)? {
            Some(q) => self.execute(&q).await,
            None => Ok(0),
        }
    }

    async fn update_record(&self, record: &Record, values: &Record) -> Result<Record, ModelError> {
        let pk = self.primary_key();
        let id = record
            .get(pk)
            .ok_or_else(|| ModelError::InvalidValues(format!("record has no '{}'", pk)))?;
        let q = builder::update_returning(&self.table, values, id)?;
        self.fetch_optional(&q)
            .await?
            .ok_or_else(|| ModelError::Other(format!("{} {} vanished during update", pk, id)))
    }

    async fn destroy(&self, filter: &Where) -> Result<u64, ModelError> {
        let q = builder::delete(&self.table, filter)?;
        self.execute(&q).await
    }
}

fn row_to_record(row: &PgRow) -> Record {
    row.columns()
        .iter()
        .map(|col| {
            let v = cell_to_value(row, col.ordinal(), col.type_info().name());
            (col.name().to_string(), v)
        })
        .collect()
}

/// Decode by the column's reported type; anything unrecognised is tried as text.
fn cell_to_value(row: &PgRow, i: usize, type_name: &str) -> Value {
    fn get<'r, T>(row: &'r PgRow, i: usize) -> Option<T>
    where
        T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        row.try_get::<Option<T>, _>(i).ok().flatten()
    }

    let v = match type_name {
        "INT2" => get::<i16>(row, i).map(Value::from),
        "INT4" => get::<i32>(row, i).map(Value::from),
        "INT8" => get::<i64>(row, i).map(Value::from),
        "FLOAT4" => get::<f32>(row, i).and_then(|n| serde_json::Number::from_f64(n as f64)).map(Value::Number),
        "FLOAT8" => get::<f64>(row, i).and_then(serde_json::Number::from_f64).map(Value::Number),
        "BOOL" => get::<bool>(row, i).map(Value::Bool),
        "UUID" => get::<uuid::Uuid>(row, i).map(|u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, i).map(|d| Value::String(d.to_rfc3339())),
        "TIMESTAMP" => get::<chrono::NaiveDateTime>(row, i)
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => get::<chrono::NaiveDate>(row, i).map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "JSON" | "JSONB" => get::<Value>(row, i),
        _ => get::<String>(row, i).map(Value::String),
    };
    v.unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pg::table::ColumnDef;
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    /// Pool that never connects; only paths that return before touching the DB are usable.
    fn offline(table: TableDef) -> PgModel {
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(50))
            .connect_lazy("postgres://localhost/crud_handlers_offline")
            .unwrap();
        PgModel::new(pool, table).unwrap()
    }

    fn notes() -> TableDef {
        TableDef::new(
            "notes",
            vec![
                ColumnDef::new("id", Some("int8")).with_default(),
                ColumnDef::new("title", None),
            ],
        )
    }

    fn record(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn update_with_nothing_to_set_touches_no_rows() {
        let m = offline(notes());
        let filter = Where::new().eq("title", json!("a"));
        assert_eq!(m.update(&Record::new(), &filter).await.unwrap(), 0);
        assert_eq!(m.update(&record(json!({"id": 5, "extra": 1})), &filter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejects_bad_input_before_querying() {
        let m = offline(notes());
        assert!(matches!(
            m.find_one(&Where::new().eq("nope", json!(1))).await,
            Err(ModelError::UnknownColumn(_))
        ));
        assert!(matches!(m.destroy(&Where::new()).await, Err(ModelError::InvalidValues(_))));
        assert!(matches!(
            m.update_record(&record(json!({"title": "a"})), &record(json!({"title": "b"}))).await,
            Err(ModelError::InvalidValues(_))
        ));
    }

    #[tokio::test]
    async fn new_validates_table() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/crud_handlers_offline")
            .unwrap();
        let mut t = notes();
        t.primary_key = "uuid".into();
        assert!(matches!(PgModel::new(pool, t), Err(ConfigError::InvalidPrimaryKey { .. })));
    }
}
