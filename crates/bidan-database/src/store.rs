//! 存储协作方接口

use async_trait::async_trait;
use bidan_core::{BidanError, Result};
use serde_json::{Map, Value};

use crate::filter::Filter;

/// 存储文档 (JSON 对象)
pub type Document = Map<String, Value>;

/// 事务中的写操作
#[derive(Debug, Clone)]
pub enum WriteOp {
    Insert {
        collection: String,
        document: Document,
    },
    DeleteOne {
        collection: String,
        filter: Filter,
    },
    DeleteMany {
        collection: String,
        filter: Filter,
    },
}

impl WriteOp {
    pub fn insert(collection: &str, document: Document) -> Self {
        WriteOp::Insert {
            collection: collection.to_string(),
            document,
        }
    }

    pub fn delete_one(collection: &str, filter: Filter) -> Self {
        WriteOp::DeleteOne {
            collection: collection.to_string(),
            filter,
        }
    }

    pub fn delete_many(collection: &str, filter: Filter) -> Self {
        WriteOp::DeleteMany {
            collection: collection.to_string(),
            filter,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Insert { collection, .. }
            | WriteOp::DeleteOne { collection, .. }
            | WriteOp::DeleteMany { collection, .. } => collection,
        }
    }
}

/// 文档数据库操作接口
///
/// 插入时若文档没有 `_id`，由存储分配一个 UUID 字符串。
/// `find` 按插入顺序返回。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 插入文档，返回其 `_id`
    async fn insert_one(&self, collection: &str, document: Document) -> Result<String>;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>>;

    /// 对第一个匹配文档的顶层键执行 `$set`，返回匹配数量
    async fn update_one(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64>;

    /// 仅当集合中没有 `key` 取值相同的文档时插入; 已存在时返回 `None`
    ///
    /// 检查与插入是一个原子操作。
    async fn insert_unique(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<Option<String>>;

    /// 原子地递增并返回计数器的新值 (首次调用返回 1)
    async fn next_sequence(&self, counter: &str) -> Result<u64>;

    /// 全部提交或全部回滚；返回每个操作影响的文档数
    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<Vec<u64>>;
}

/// 唯一键在文档中的取值
pub(crate) fn unique_value(document: &Document, key: &str) -> Result<Value> {
    match crate::filter::resolve(document, key) {
        Some(Value::Null) | None => Err(BidanError::required(key)),
        Some(value) => Ok(value.clone()),
    }
}

/// 为缺少 `_id` 的文档分配一个
pub(crate) fn ensure_document_id(document: &mut Document) -> String {
    match document.get(bidan_core::fields::DOCUMENT_ID) {
        Some(Value::String(id)) => id.clone(),
        _ => {
            let id = uuid::Uuid::new_v4().to_string();
            document.insert(
                bidan_core::fields::DOCUMENT_ID.to_string(),
                Value::String(id.clone()),
            );
            id
        }
    }
}
