//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a table definition.

use crate::error::ModelError;
use crate::model::{Record, Where};
use crate::pg::table::{ColumnDef, TableDef};
use serde_json::Value;

/// Quote identifier for PostgreSQL (names are validated by `TableDef::validate`).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(table: &TableDef) -> String {
    format!("{}.{}", quoted(&table.schema), quoted(&table.table))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    /// Binds `v` and returns its placeholder, cast to the column type when known.
    fn placeholder(&mut self, column: &ColumnDef, v: Value) -> String {
        self.params.push(v);
        let n = self.params.len();
        match column.pg_type.as_deref() {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }

    fn where_clause(&mut self, table: &TableDef, filter: &Where) -> Result<String, ModelError> {
        if filter.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(filter.len());
        for (col, val) in filter.iter() {
            let column = table.require_column(col)?;
            if val.is_null() {
                parts.push(format!("{} IS NULL", quoted(col)));
            } else {
                let ph = self.placeholder(column, val.clone());
                parts.push(format!("{} = {}", quoted(col), ph));
            }
        }
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }

    /// `"col" = $n` for every known non-pk column present in `values`.
    fn set_list(&mut self, table: &TableDef, values: &Record) -> Vec<String> {
        let mut sets = Vec::new();
        for c in &table.columns {
            if c.name == table.primary_key {
                continue;
            }
            let Some(v) = values.get(&c.name) else { continue };
            let ph = self.placeholder(c, v.clone());
            sets.push(format!("{} = {}", quoted(&c.name), ph));
        }
        sets
    }
}

/// SELECT list: custom enums (schema.typename) and numeric come back as text so rows decode to JSON.
fn select_column_list(table: &TableDef) -> String {
    table
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            match c.pg_type.as_deref() {
                Some(t) if t.contains('.') || t.starts_with("numeric") => format!("{}::text AS {}", q, q),
                _ => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT rows matching `filter`, ordered by primary key.
pub fn select(table: &TableDef, filter: &Where, limit: Option<u32>) -> Result<QueryBuf, ModelError> {
    let mut q = QueryBuf::default();
    let where_clause = q.where_clause(table, filter)?;
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}",
        select_column_list(table),
        qualified_table(table),
        where_clause,
        quoted(&table.primary_key),
        limit_clause
    );
    Ok(q)
}

/// SELECT one row by primary key within `scope`.
pub fn select_by_pk(table: &TableDef, id: &Value, scope: &Where) -> Result<QueryBuf, ModelError> {
    let filter = Where::new().eq(table.primary_key.as_str(), id.clone()).and(scope);
    select(table, &filter, Some(1))
}

/// INSERT the known columns present in `values`; others are ignored and the DB fills defaults.
pub fn insert(table: &TableDef, values: &Record) -> Result<QueryBuf, ModelError> {
    let mut q = QueryBuf::default();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &table.columns {
        let Some(v) = values.get(&c.name) else { continue };
        if v.is_null() && (c.has_default || c.name == table.primary_key) {
            continue;
        }
        cols.push(quoted(&c.name));
        placeholders.push(q.placeholder(c, v.clone()));
    }
    let returning = select_column_list(table);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", qualified_table(table), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(table),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    Ok(q)
}

/// UPDATE rows matching `filter`: SET only known non-pk columns present in `values`.
/// `None` when there is nothing to set.
pub fn update(table: &TableDef, values: &Record, filter: &Where) -> Result<Option<QueryBuf>, ModelError> {
    let mut q = QueryBuf::default();
    let sets = q.set_list(table, values);
    if sets.is_empty() {
        return Ok(None);
    }
    let where_clause = q.where_clause(table, filter)?;
    q.sql = format!("UPDATE {} SET {}{}", qualified_table(table), sets.join(", "), where_clause);
    Ok(Some(q))
}

/// UPDATE the row with primary key `id` and return it as stored.
/// With nothing to set this is a plain SELECT of that row.
pub fn update_returning(table: &TableDef, values: &Record, id: &Value) -> Result<QueryBuf, ModelError> {
    let mut q = QueryBuf::default();
    let sets = q.set_list(table, values);
    if sets.is_empty() {
        return select_by_pk(table, id, &Where::new());
    }
    let filter = Where::new().eq(table.primary_key.as_str(), id.clone());
    let where_clause = q.where_clause(table, &filter)?;
    q.sql = format!(
        "UPDATE {} SET {}{} RETURNING {}",
        qualified_table(table),
        sets.join(", "),
        where_clause,
        select_column_list(table)
    );
    Ok(q)
}

/// DELETE rows matching `filter`. An empty filter is refused.
pub fn delete(table: &TableDef, filter: &Where) -> Result<QueryBuf, ModelError> {
    if filter.is_empty() {
        return Err(ModelError::InvalidValues("delete requires at least one condition".into()));
    }
    let mut q = QueryBuf::default();
    let where_clause = q.where_clause(table, filter)?;
    q.sql = format!("DELETE FROM {}{}", qualified_table(table), where_clause);
    Ok(q)
}
