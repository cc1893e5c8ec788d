//! PostgreSQL 文档存储
//!
//! 所有集合共用 `documents` 表，文档以 JSONB 保存；过滤条件编译为 JSONB 路径表达式。

use async_trait::async_trait;
use bidan_core::{BidanError, Result};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::connection::DatabasePool;
use crate::filter::Filter;
use crate::models::{DbCounter, DbDocument};
use crate::store::{ensure_document_id, unique_value, Document, DocumentStore, WriteOp};

/// 基于 PostgreSQL JSONB 的文档存储
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: DatabasePool,
}

impl PgDocumentStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq BIGSERIAL PRIMARY KEY,
                collection VARCHAR(64) NOT NULL,
                id VARCHAR(64) NOT NULL,
                body JSONB NOT NULL,
                UNIQUE (collection, id)
            )
        "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS id_counters (
                name VARCHAR(64) PRIMARY KEY,
                seq_value BIGINT NOT NULL
            )
        "#,
        )
        .execute(pool)
        .await?;

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)",
            "CREATE INDEX IF NOT EXISTS idx_documents_id_pasien ON documents(collection, (body->'id_pasien'))",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_midwives_username ON documents((body->>'username')) WHERE collection = 'midwives'",
        ];
        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        info!("Database tables created successfully");
        Ok(())
    }
}

fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// 转义 ILIKE 通配符
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// 将过滤条件追加为 SQL 布尔表达式
fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {
            qb.push("TRUE");
        }
        Filter::Eq(path, value) => {
            qb.push("(body #> ");
            qb.push_bind(path_segments(path));
            qb.push(") = ");
            qb.push_bind(Json(value.clone()));
        }
        Filter::Ne(path, value) => {
            qb.push("(body #> ");
            qb.push_bind(path_segments(path));
            qb.push(") IS DISTINCT FROM ");
            qb.push_bind(Json(value.clone()));
        }
        Filter::Exists(path) => {
            qb.push("(body #> ");
            qb.push_bind(path_segments(path));
            qb.push(") IS NOT NULL");
        }
        Filter::In(path, values) => {
            if values.is_empty() {
                qb.push("FALSE");
                return;
            }
            qb.push("(");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_filter(qb, &Filter::Eq(path.clone(), value.clone()));
            }
            qb.push(")");
        }
        Filter::ContainsText(path, needle) => {
            qb.push("(body #>> ");
            qb.push_bind(path_segments(path));
            qb.push(") ILIKE ");
            qb.push_bind(like_pattern(needle));
        }
        Filter::TextRange { path, from, until } => {
            qb.push("(jsonb_typeof(body #> ");
            qb.push_bind(path_segments(path));
            qb.push(") = 'string'");
            if let Some(from) = from {
                qb.push(" AND (body #>> ");
                qb.push_bind(path_segments(path));
                qb.push(") COLLATE \"C\" >= ");
                qb.push_bind(from.clone());
            }
            if let Some(until) = until {
                qb.push(" AND (body #>> ");
                qb.push_bind(path_segments(path));
                qb.push(") COLLATE \"C\" < ");
                qb.push_bind(until.clone());
            }
            qb.push(")");
        }
        Filter::And(filters) => {
            if filters.is_empty() {
                qb.push("TRUE");
                return;
            }
            qb.push("(");
            for (i, inner) in filters.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_filter(qb, inner);
            }
            qb.push(")");
        }
    }
}

fn select_where(prefix: &str, collection: &str, filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(prefix);
    qb.push(" WHERE collection = ");
    qb.push_bind(collection.to_string());
    qb.push(" AND ");
    push_filter(&mut qb, filter);
    qb
}

fn insert_query(collection: &str, mut document: Document) -> (String, QueryBuilder<'static, Postgres>) {
    let id = ensure_document_id(&mut document);
    let mut qb = QueryBuilder::new("INSERT INTO documents (collection, id, body) VALUES (");
    qb.push_bind(collection.to_string());
    qb.push(", ");
    qb.push_bind(id.clone());
    qb.push(", ");
    qb.push_bind(Json(Value::Object(document)));
    qb.push(")");
    (id, qb)
}

/// 不存在相同唯一键时才插入的 INSERT .. SELECT
fn insert_unique_query(
    collection: &str,
    key: &str,
    value: Value,
    mut document: Document,
) -> (String, QueryBuilder<'static, Postgres>) {
    let id = ensure_document_id(&mut document);
    let mut qb = QueryBuilder::new("INSERT INTO documents (collection, id, body) SELECT ");
    qb.push_bind(collection.to_string());
    qb.push(", ");
    qb.push_bind(id.clone());
    qb.push(", ");
    qb.push_bind(Json(Value::Object(document)));
    qb.push(" WHERE NOT EXISTS (SELECT 1 FROM documents WHERE collection = ");
    qb.push_bind(collection.to_string());
    qb.push(" AND ");
    push_filter(&mut qb, &Filter::Eq(key.to_string(), value));
    qb.push(")");
    (id, qb)
}

fn delete_query(collection: &str, filter: &Filter, only_first: bool) -> QueryBuilder<'static, Postgres> {
    if only_first {
        let mut qb = select_where("DELETE FROM documents WHERE seq = (SELECT seq FROM documents", collection, filter);
        qb.push(" ORDER BY seq LIMIT 1)");
        qb
    } else {
        select_where("DELETE FROM documents", collection, filter)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert_one(&self, collection: &str, document: Document) -> Result<String> {
        let (id, mut qb) = insert_query(collection, document);
        qb.build().execute(self.pool.pool()).await?;
        debug!("Inserted document {} into {}", id, collection);
        Ok(id)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let mut qb = select_where("SELECT id, body FROM documents", collection, filter);
        qb.push(" ORDER BY seq");
        let rows = qb
            .build_query_as::<DbDocument>()
            .fetch_all(self.pool.pool())
            .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let mut qb = select_where("SELECT id, body FROM documents", collection, filter);
        qb.push(" ORDER BY seq LIMIT 1");
        let row = qb
            .build_query_as::<DbDocument>()
            .fetch_optional(self.pool.pool())
            .await?;
        Ok(row.map(Document::from))
    }

    async fn update_one(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64> {
        let mut qb = QueryBuilder::new("UPDATE documents SET body = body || ");
        qb.push_bind(Json(Value::Object(set)));
        qb.push(" WHERE seq = (SELECT seq FROM documents WHERE collection = ");
        qb.push_bind(collection.to_string());
        qb.push(" AND ");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY seq LIMIT 1)");
        let result = qb.build().execute(self.pool.pool()).await?;
        Ok(result.rows_affected())
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let result = delete_query(collection, filter, true)
            .build()
            .execute(self.pool.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let result = delete_query(collection, filter, false)
            .build()
            .execute(self.pool.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let count: i64 = select_where("SELECT COUNT(*) FROM documents", collection, filter)
            .build_query_scalar()
            .fetch_one(self.pool.pool())
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<Option<String>> {
        let value = unique_value(&document, key)?;
        let (id, mut qb) = insert_unique_query(collection, key, value, document);

        match qb.build().execute(self.pool.pool()).await {
            Ok(result) if result.rows_affected() == 0 => Ok(None),
            Ok(_) => {
                debug!("Inserted document {} into {}", id, collection);
                Ok(Some(id))
            }
            // 并发插入由唯一索引拦下
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!("Unique {} already taken in {}", key, collection);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn next_sequence(&self, counter: &str) -> Result<u64> {
        let row = sqlx::query_as::<_, DbCounter>(
            r#"
            INSERT INTO id_counters (name, seq_value) VALUES ($1, 1)
            ON CONFLICT (name) DO UPDATE SET seq_value = id_counters.seq_value + 1
            RETURNING name, seq_value
        "#,
        )
        .bind(counter)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| BidanError::Allocation(format!("counter {}: {}", counter, e)))?;

        u64::try_from(row.seq_value).map_err(|_| {
            BidanError::Allocation(format!(
                "counter {} holds negative value {}",
                row.name, row.seq_value
            ))
        })
    }

    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<Vec<u64>> {
        let mut tx = self.pool.pool().begin().await?;
        let mut affected = Vec::with_capacity(ops.len());

        for op in ops {
            let mut qb = match op {
                WriteOp::Insert {
                    collection,
                    document,
                } => insert_query(&collection, document).1,
                WriteOp::DeleteOne { collection, filter } => delete_query(&collection, &filter, true),
                WriteOp::DeleteMany { collection, filter } => delete_query(&collection, &filter, false),
            };
            // 出错时 tx 被丢弃，sqlx 自动回滚
            let result = qb.build().execute(&mut *tx).await?;
            affected.push(result.rows_affected());
        }

        tx.commit().await?;
        debug!("Committed transaction with {} operations", affected.len());
        Ok(affected)
    }
}
