//! 错误定义模块

use thiserror::Error;

/// 系统统一错误类型
#[derive(Error, Debug)]
pub enum BidanError {
    /// 请求字段缺失或类型错误
    #[error("{field} {reason}")]
    Validation { field: String, reason: String },

    #[error("{0} not found")]
    NotFound(String),

    /// 序号分配失败，调用方不得退回到非原子方案
    #[error("failed to allocate identifier: {0}")]
    Allocation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid date: {0}")]
    DateFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BidanError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BidanError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn required(field: impl Into<String>) -> Self {
        Self::validation(field, "is required")
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for BidanError {
    fn from(err: sqlx::Error) -> Self {
        BidanError::Storage(err.to_string())
    }
}

/// 系统统一结果类型
pub type Result<T> = std::result::Result<T, BidanError>;
