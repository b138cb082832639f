//! Query interface the handlers drive. Any ORM, SQL table or in-memory store can sit behind it.

use crate::error::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// One row as a JSON object.
pub type Record = Map<String, Value>;

/// Conjunction of column equality conditions, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Where(Vec<(String, Value)>);

impl Where {
    pub fn new() -> Self {
        Where(Vec::new())
    }

    /// Adds `column = value`, replacing an earlier condition on the same column.
    pub fn eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Combined with `other`; conditions in `other` win on the same column.
    pub fn and(mut self, other: &Where) -> Self {
        for (c, v) in other.iter() {
            self.push(c, v.clone());
        }
        self
    }

    /// True when `record` satisfies every condition. Path parameters arrive as strings,
    /// so a string condition matches a number or bool with the same text.
    pub fn matches(&self, record: &Record) -> bool {
        self.iter()
            .all(|(c, v)| record.get(c).map(|r| loose_eq(r, v)).unwrap_or(v.is_null()))
    }
}

impl From<Record> for Where {
    fn from(map: Record) -> Self {
        Where(map.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for Where {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Record>::deserialize(deserializer)? {
            Some(map) => Ok(Where::from(map)),
            None => Ok(Where::new()),
        }
    }
}

impl Serialize for Where {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: Record = self.0.iter().cloned().collect();
        map.serialize(serializer)
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => numbers_eq(n, m),
        (Value::String(s), Value::Number(_) | Value::Bool(_)) => *s == b.to_string(),
        (Value::Number(_) | Value::Bool(_), Value::String(s)) => *s == a.to_string(),
        _ => a == b,
    }
}

/// Integers compare exactly; floats only when either side is one.
fn numbers_eq(n: &Number, m: &Number) -> bool {
    if n.is_f64() || m.is_f64() {
        return n.as_f64() == m.as_f64();
    }
    match (n.as_i64(), m.as_i64()) {
        (Some(a), Some(b)) => a == b,
        _ => n.as_u64() == m.as_u64(),
    }
}

#[async_trait]
pub trait Model: Send + Sync + 'static {
    /// Name used in logs and cache keys.
    fn name(&self) -> &str;

    fn primary_key(&self) -> &str {
        "id"
    }

    /// Row whose primary key equals `id` and that also satisfies `scope`.
    async fn find_by_pk(&self, id: &Value, scope: &Where) -> Result<Option<Record>, ModelError>;

    async fn find_one(&self, filter: &Where) -> Result<Option<Record>, ModelError>;

    async fn find_all(&self, filter: &Where) -> Result<Vec<Record>, ModelError>;

    async fn create(&self, values: Record) -> Result<Record, ModelError>;

    /// Updates every row matching `filter`; returns the affected count.
    /// When `values` has nothing to set (empty, only the primary key, or only columns the
    /// model does not store) no row is touched and the count is 0.
    async fn update(&self, values: &Record, filter: &Where) -> Result<u64, ModelError>;

    /// Updates the row `record` was loaded from and returns it as stored afterwards.
    /// The primary key is never changed.
    async fn update_record(&self, record: &Record, values: &Record) -> Result<Record, ModelError> {
        let pk = self.primary_key();
        let id = record
            .get(pk)
            .cloned()
            .ok_or_else(|| ModelError::InvalidValues(format!("record has no '{}'", pk)))?;
        self.update(values, &Where::new().eq(pk, id.clone())).await?;
        self.find_by_pk(&id, &Where::new())
            .await?
            .ok_or_else(|| ModelError::Other(format!("{} {} vanished during update", pk, id)))
    }

    async fn destroy(&self, filter: &Where) -> Result<u64, ModelError>;
}
