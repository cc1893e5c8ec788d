//! 点分隔路径 (`generalInformation.noHP`) 的 JSON 读写

use serde_json::{Map, Value};

/// 路径查找结果
#[derive(Debug, PartialEq)]
pub enum PathLookup<'a> {
    Found(&'a Value),
    Missing,
    /// 中间段存在但不是对象, 携带出错的前缀
    NotTraversable(String),
}

/// 按点分隔路径读取值; 中间段为 null 视为缺失
pub fn lookup<'a>(root: &'a Value, path: &str) -> PathLookup<'a> {
    let mut current = root;
    let mut walked = String::new();
    for segment in path.split('.') {
        match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => current = next,
                None => return PathLookup::Missing,
            },
            Value::Null => return PathLookup::Missing,
            _ => return PathLookup::NotTraversable(walked),
        }
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);
    }
    PathLookup::Found(current)
}

/// `lookup` 的简化版本, 仅关心值是否存在
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    match lookup(root, path) {
        PathLookup::Found(value) => Some(value),
        _ => None,
    }
}

/// 从文档 (顶层对象) 按路径读取值
pub fn get_in<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        Some((head, rest)) => root.get(head).and_then(|next| get(next, rest)),
        None => root.get(path),
    }
}

/// 按路径写入值, 自动创建中间对象; 非对象的中间值会被替换
pub fn set(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(map) = entry else {
            return;
        };
        current = map;
    }
}
