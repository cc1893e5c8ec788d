//! 数据库行模型

use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::store::Document;

/// `documents` 表的一行
#[derive(Debug, FromRow)]
pub struct DbDocument {
    pub id: String,
    pub body: Json<Value>,
}

impl From<DbDocument> for Document {
    fn from(row: DbDocument) -> Self {
        match row.body.0 {
            Value::Object(map) => map,
            // 表结构保证 body 为对象; 其他情况保留 id 以便排查
            _ => {
                let mut map = Document::new();
                map.insert(bidan_core::fields::DOCUMENT_ID.to_string(), Value::String(row.id));
                map
            }
        }
    }
}

/// `id_counters` 表的一行
#[derive(Debug, FromRow)]
pub struct DbCounter {
    pub name: String,
    pub seq_value: i64,
}
