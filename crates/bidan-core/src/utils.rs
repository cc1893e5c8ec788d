//! 通用工具函数

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{BidanError, Result};

/// 解析 ISO 日期或日期时间字符串的日期部分 (`YYYY-MM-DD...`)
pub fn parse_date_prefix(raw: &str) -> Result<NaiveDate> {
    let prefix = raw
        .get(..10)
        .ok_or_else(|| BidanError::DateFormat(format!("{:?} is too short for YYYY-MM-DD", raw)))?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .map_err(|e| BidanError::DateFormat(format!("{:?}: {}", raw, e)))
}

/// 解析文本形式的患者编号
pub fn parse_patient_id_text(raw: &str, field: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| BidanError::validation(field, format!("must be a positive integer (got {:?})", raw)))
}

/// 解析 JSON 中的患者编号, 兼容数字与数字字符串
pub fn parse_patient_id(value: Option<&Value>, field: &str) -> Result<u64> {
    match value {
        None | Some(Value::Null) => Err(BidanError::required(field)),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| BidanError::validation(field, format!("must be a positive integer (got {})", n))),
        Some(Value::String(s)) => parse_patient_id_text(s, field),
        Some(_) => Err(BidanError::validation(field, "must be a number or numeric string")),
    }
}
