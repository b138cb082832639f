//! In-memory model: rows kept in a vector, integer ids assigned on insert.

use crate::error::ModelError;
use crate::model::{Model, Record, Where};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct MemoryModel {
    name: String,
    primary_key: String,
    rows: RwLock<Vec<Record>>,
}

impl MemoryModel {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryModel {
            name: name.into(),
            primary_key: "id".to_string(),
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Preload rows as-is (no id assignment).
    pub fn with_rows(self, rows: Vec<Record>) -> Self {
        MemoryModel {
            rows: RwLock::new(rows),
            ..self
        }
    }

    pub async fn snapshot(&self) -> Vec<Record> {
        self.rows.read().await.clone()
    }

    fn next_id(rows: &[Record], pk: &str) -> i64 {
        rows.iter()
            .filter_map(|r| r.get(pk).and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[async_trait]
impl Model for MemoryModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    async fn find_by_pk(&self, id: &Value, scope: &Where) -> Result<Option<Record>, ModelError> {
        let filter = Where::new().eq(self.primary_key.as_str(), id.clone()).and(scope);
        self.find_one(&filter).await
    }

    async fn find_one(&self, filter: &Where) -> Result<Option<Record>, ModelError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| filter.matches(r)).cloned())
    }

    async fn find_all(&self, filter: &Where) -> Result<Vec<Record>, ModelError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn create(&self, mut values: Record) -> Result<Record, ModelError> {
        let mut rows = self.rows.write().await;
        let pk = self.primary_key.as_str();
        match values.get(pk) {
            None | Some(Value::Null) => {
                let id = Self::next_id(&rows, pk);
                values.insert(pk.to_string(), Value::from(id));
            }
            Some(id) => {
                let id = id.clone();
                if rows.iter().any(|r| Where::new().eq(pk, id.clone()).matches(r)) {
                    return Err(ModelError::InvalidValues(format!("duplicate {} {}", pk, id)));
                }
            }
        }
        rows.push(values.clone());
        Ok(values)
    }

    async fn update(&self, values: &Record, filter: &Where) -> Result<u64, ModelError> {
        let sets: Vec<_> = values.iter().filter(|(k, _)| **k != self.primary_key).collect();
        if sets.is_empty() {
            return Ok(0);
        }
        let mut rows = self.rows.write().await;
        let mut affected = 0;
        for row in rows.iter_mut().filter(|r| filter.matches(r)) {
            for (k, v) in &sets {
                row.insert((*k).clone(), (*v).clone());
            }
            affected += 1;
        }
        Ok(affected)
    }

    async fn destroy(&self, filter: &Where) -> Result<u64, ModelError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let m = MemoryModel::new("notes");
        let a = m.create(record(json!({"title": "a"}))).await.unwrap();
        let b = m.create(record(json!({"title": "b"}))).await.unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_id() {
        let m = MemoryModel::new("notes");
        m.create(record(json!({"id": 4}))).await.unwrap();
        assert!(matches!(
            m.create(record(json!({"id": 4}))).await,
            Err(ModelError::InvalidValues(_))
        ));
    }

    #[tokio::test]
    async fn find_by_pk_honours_scope() {
        let m = MemoryModel::new("notes");
        m.create(record(json!({"owner_id": 1}))).await.unwrap();
        let id = json!("1");
        assert!(m.find_by_pk(&id, &Where::new()).await.unwrap().is_some());
        let mine = Where::new().eq("owner_id", json!(1));
        assert!(m.find_by_pk(&id, &mine).await.unwrap().is_some());
        let theirs = Where::new().eq("owner_id", json!(2));
        assert!(m.find_by_pk(&id, &theirs).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_keeps_primary_key_and_counts() {
        let m = MemoryModel::new("notes");
        m.create(record(json!({"done": false}))).await.unwrap();
        m.create(record(json!({"done": false}))).await.unwrap();
        let n = m
            .update(&record(json!({"id": 99, "done": true})), &Where::new())
            .await
            .unwrap();
        assert_eq!(n, 2);
        let rows = m.snapshot().await;
        assert_eq!(rows[0]["id"], json!(1));
        assert_eq!(rows[1]["done"], json!(true));
    }

    #[tokio::test]
    async fn update_with_nothing_to_set_counts_zero() {
        let m = MemoryModel::new("notes");
        m.create(record(json!({"done": false}))).await.unwrap();
        assert_eq!(m.update(&Record::new(), &Where::new()).await.unwrap(), 0);
        assert_eq!(m.update(&record(json!({"id": 7})), &Where::new()).await.unwrap(), 0);
        assert_eq!(m.snapshot().await[0], record(json!({"id": 1, "done": false})));
    }

    #[tokio::test]
    async fn update_record_returns_stored_row() {
        let m = MemoryModel::new("notes");
        let row = m.create(record(json!({"title": "a"}))).await.unwrap();
        let updated = m
            .update_record(&row, &record(json!({"id": 99, "done": true})))
            .await
            .unwrap();
        assert_eq!(updated, record(json!({"id": 1, "title": "a", "done": true})));
        let unchanged = m.update_record(&updated, &record(json!({"id": 5}))).await.unwrap();
        assert_eq!(unchanged, updated);
    }

    #[tokio::test]
    async fn update_record_merges() {
        let m = MemoryModel::new("notes");
        let row = m.create(record(json!({"title": "a", "done": false}))).await.unwrap();
        let merged = m.update_record(&row, &record(json!({"done": true}))).await.unwrap();
        assert_eq!(merged, record(json!({"id": 1, "title": "a", "done": true})));
        assert_eq!(m.snapshot().await[0], merged);
    }

    #[tokio::test]
    async fn destroy_counts_removed() {
        let m = MemoryModel::new("notes").with_rows(vec![
            record(json!({"id": 1, "owner_id": 1})),
            record(json!({"id": 2, "owner_id": 2})),
        ]);
        assert_eq!(m.destroy(&Where::new().eq("owner_id", json!(1))).await.unwrap(), 1);
        assert_eq!(m.destroy(&Where::new().eq("owner_id", json!(1))).await.unwrap(), 0);
        assert_eq!(m.snapshot().await.len(), 1);
    }
}
