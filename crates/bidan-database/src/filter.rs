//! 过滤条件
//!
//! 与存储无关的最小查询语言。路径为点分隔形式，例如 `data_family_planning.status_jkn`。

use bidan_core::path;
use serde_json::Value;

use crate::store::Document;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// 匹配全部文档
    All,
    Eq(String, Value),
    /// 路径不存在的文档也视为不相等
    Ne(String, Value),
    Exists(String),
    In(String, Vec<Value>),
    /// 不区分大小写的子串匹配，仅匹配字符串值
    ContainsText(String, String),
    /// 字符串字典序范围: `from` 包含, `until` 不包含
    TextRange {
        path: String,
        from: Option<String>,
        until: Option<String>,
    },
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(path.to_string(), value.into())
    }

    pub fn ne(path: &str, value: impl Into<Value>) -> Self {
        Filter::Ne(path.to_string(), value.into())
    }

    pub fn exists(path: &str) -> Self {
        Filter::Exists(path.to_string())
    }

    pub fn is_in(path: &str, values: Vec<Value>) -> Self {
        Filter::In(path.to_string(), values)
    }

    pub fn contains_text(path: &str, needle: &str) -> Self {
        Filter::ContainsText(path.to_string(), needle.to_string())
    }

    pub fn text_range(path: &str, from: Option<String>, until: Option<String>) -> Self {
        Filter::TextRange {
            path: path.to_string(),
            from,
            until,
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// 在内存中对文档求值
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(path, expected) => resolve(document, path)
                .map(|actual| json_eq(actual, expected))
                .unwrap_or(false),
            Filter::Ne(path, expected) => resolve(document, path)
                .map(|actual| !json_eq(actual, expected))
                .unwrap_or(true),
            Filter::Exists(path) => resolve(document, path).is_some(),
            Filter::In(path, candidates) => resolve(document, path)
                .map(|actual| candidates.iter().any(|c| json_eq(actual, c)))
                .unwrap_or(false),
            Filter::ContainsText(path, needle) => resolve(document, path)
                .and_then(Value::as_str)
                .map(|text| text.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            Filter::TextRange { path, from, until } => {
                let Some(text) = resolve(document, path).and_then(Value::as_str) else {
                    return false;
                };
                from.as_deref().map_or(true, |lower| text >= lower)
                    && until.as_deref().map_or(true, |upper| text < upper)
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }
}

/// 按路径从文档中取值
pub fn resolve<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        Some((head, rest)) => document.get(head).and_then(|value| path::get(value, rest)),
        None => document.get(path),
    }
}

/// 数字按数值比较 (42 与 42.0 相等)，其余按结构比较
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_u64(), y.as_u64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}
