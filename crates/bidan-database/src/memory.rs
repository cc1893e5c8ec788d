//! 内存文档存储
//!
//! 用于开发环境与测试。整个存储由一把读写锁保护，事务在快照上执行，
//! 成功后整体替换，因此失败的事务不会留下任何可见修改。

use async_trait::async_trait;
use bidan_core::{collections, BidanError, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::filter::Filter;
use crate::store::{ensure_document_id, unique_value, Document, DocumentStore, WriteOp};

#[derive(Debug, Default, Clone)]
struct Collections {
    documents: HashMap<String, Vec<Document>>,
}

impl Collections {
    fn insert(&mut self, collection: &str, mut document: Document) -> String {
        let id = ensure_document_id(&mut document);
        self.documents
            .entry(collection.to_string())
            .or_default()
            .push(document);
        id
    }

    fn delete(&mut self, collection: &str, filter: &Filter, limit: Option<usize>) -> u64 {
        let Some(documents) = self.documents.get_mut(collection) else {
            return 0;
        };
        let mut removed = 0usize;
        documents.retain(|doc| {
            let within_limit = limit.map_or(true, |max| removed < max);
            if within_limit && filter.matches(doc) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed as u64
    }

    fn apply(&mut self, op: WriteOp) -> u64 {
        match op {
            WriteOp::Insert {
                collection,
                document,
            } => {
                self.insert(&collection, document);
                1
            }
            WriteOp::DeleteOne { collection, filter } => self.delete(&collection, &filter, Some(1)),
            WriteOp::DeleteMany { collection, filter } => self.delete(&collection, &filter, None),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    collections: Collections,
    /// 故障注入: 对这些集合的写操作将失败
    failing: HashSet<String>,
}

impl State {
    fn check_writable(&self, collection: &str) -> Result<()> {
        if self.failing.contains(collection) {
            warn!("Injected write failure on collection {}", collection);
            return Err(BidanError::Storage(format!(
                "write to collection {} failed",
                collection
            )));
        }
        Ok(())
    }
}

/// 内存文档存储
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让之后对 `collection` 的所有写操作失败 (用于测试故障注入)
    pub async fn fail_writes_to(&self, collection: &str) {
        self.state.write().await.failing.insert(collection.to_string());
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failing.clear();
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_one(&self, collection: &str, document: Document) -> Result<String> {
        let mut state = self.state.write().await;
        state.check_writable(collection)?;
        let id = state.collections.insert(collection, document);
        debug!("Inserted document {} into {}", id, collection);
        Ok(id)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .documents
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .documents
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn update_one(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64> {
        let mut state = self.state.write().await;
        state.check_writable(collection)?;
        let target = state
            .collections
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d)));
        match target {
            Some(document) => {
                for (key, value) in set {
                    document.insert(key, value);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let mut state = self.state.write().await;
        state.check_writable(collection)?;
        Ok(state.collections.delete(collection, filter, Some(1)))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let mut state = self.state.write().await;
        state.check_writable(collection)?;
        Ok(state.collections.delete(collection, filter, None))
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        Ok(self.find(collection, filter).await?.len() as u64)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<Option<String>> {
        let value = unique_value(&document, key)?;
        let mut state = self.state.write().await;
        state.check_writable(collection)?;

        let taken = Filter::Eq(key.to_string(), value);
        let exists = state
            .collections
            .documents
            .get(collection)
            .is_some_and(|docs| docs.iter().any(|d| taken.matches(d)));
        if exists {
            return Ok(None);
        }
        Ok(Some(state.collections.insert(collection, document)))
    }

    async fn next_sequence(&self, counter: &str) -> Result<u64> {
        let mut state = self.state.write().await;
        state.check_writable(collections::ID_COUNTERS)?;
        let counters = state
            .collections
            .documents
            .entry(collections::ID_COUNTERS.to_string())
            .or_default();

        let name = Value::String(counter.to_string());
        let position = counters.iter().position(|doc| doc.get("name") == Some(&name));
        let document = match position {
            Some(index) => &mut counters[index],
            None => {
                let mut fresh = Document::new();
                fresh.insert("name".to_string(), name);
                fresh.insert("seq_value".to_string(), Value::from(0u64));
                counters.push(fresh);
                counters.last_mut().ok_or_else(|| {
                    BidanError::Allocation(format!("counter {} could not be created", counter))
                })?
            }
        };

        let current = document
            .get("seq_value")
            .and_then(Value::as_u64)
            .ok_or_else(|| BidanError::Allocation(format!("counter {} is not an integer", counter)))?;
        let next = current + 1;
        document.insert("seq_value".to_string(), Value::from(next));
        Ok(next)
    }

    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<Vec<u64>> {
        let mut state = self.state.write().await;
        let mut snapshot = state.collections.clone();
        let mut affected = Vec::with_capacity(ops.len());
        for op in ops {
            state.check_writable(op.collection())?;
            affected.push(snapshot.apply(op));
        }
        state.collections = snapshot;
        debug!("Committed transaction with {} operations", affected.len());
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_preserves_order() {
        let store = InMemoryStore::new();
        let first = store.insert_one("c", doc(json!({"n": 1}))).await.unwrap();
        store.insert_one("c", doc(json!({"n": 2}))).await.unwrap();

        let all = store.find("c", &Filter::All).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["_id"], json!(first));
        assert_eq!(all[1]["n"], json!(2));
    }

    #[tokio::test]
    async fn test_update_one_sets_top_level_keys() {
        let store = InMemoryStore::new();
        store
            .insert_one("c", doc(json!({"id_pasien": 1, "a": 1, "b": {"x": 1}})))
            .await
            .unwrap();

        let matched = store
            .update_one("c", &Filter::eq("id_pasien", 1u64), doc(json!({"b": {"y": 2}})))
            .await
            .unwrap();
        assert_eq!(matched, 1);

        let updated = store.find_one("c", &Filter::All).await.unwrap().unwrap();
        assert_eq!(updated["a"], json!(1));
        assert_eq!(updated["b"], json!({"y": 2}));

        let missing = store
            .update_one("c", &Filter::eq("id_pasien", 9u64), Document::new())
            .await
            .unwrap();
        assert_eq!(missing, 0);
    }

    #[tokio::test]
    async fn test_sequence_concurrent_callers_get_distinct_values() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.next_sequence("patient_id").await.unwrap()
            }));
        }

        let mut values = BTreeSet::new();
        for handle in handles {
            values.insert(handle.await.unwrap());
        }
        assert_eq!(values.len(), 50);
        assert_eq!(values.into_iter().collect::<Vec<_>>(), (1..=50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_no_changes() {
        let store = InMemoryStore::new();
        store.insert_one("a", doc(json!({"k": 1}))).await.unwrap();
        store.insert_one("b", doc(json!({"k": 1}))).await.unwrap();
        store.fail_writes_to("b").await;

        let result = store
            .transaction(vec![
                WriteOp::delete_one("a", Filter::eq("k", 1u64)),
                WriteOp::delete_many("b", Filter::eq("k", 1u64)),
            ])
            .await;
        assert!(result.is_err());
        assert_eq!(store.count("a", &Filter::All).await.unwrap(), 1);
        assert_eq!(store.count("b", &Filter::All).await.unwrap(), 1);

        store.clear_failures().await;
        let affected = store
            .transaction(vec![
                WriteOp::delete_one("a", Filter::eq("k", 1u64)),
                WriteOp::delete_many("b", Filter::eq("k", 1u64)),
            ])
            .await
            .unwrap();
        assert_eq!(affected, vec![1, 1]);
        assert_eq!(store.count("a", &Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_unique_rejects_taken_key() {
        let store = Arc::new(InMemoryStore::new());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .insert_unique("m", "username", doc(json!({"username": "yuni", "n": i})))
                    .await
                    .unwrap()
            }));
        }

        let mut inserted = 0;
        for task in tasks {
            if task.await.unwrap().is_some() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.count("m", &Filter::All).await.unwrap(), 1);

        let missing = store.insert_unique("m", "username", doc(json!({"n": 1}))).await;
        assert!(missing.is_err());
    }
}
