//! 响应信封与错误转换
//!
//! 成功与失败都返回 `{message, data?}`, 状态码只由 HTTP 状态表达。

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use bidan_core::BidanError;
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

/// 成功响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip)]
    pub status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }
}

impl ApiResponse<()> {
    /// 只有消息的响应
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// 处理器错误
#[derive(Debug)]
pub struct ApiError(pub BidanError);

pub type ApiResult<T> = std::result::Result<ApiResponse<T>, ApiError>;

impl From<BidanError> for ApiError {
    fn from(err: BidanError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(BidanError::validation("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(BidanError::validation("query", rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BidanError::Validation { .. } => StatusCode::BAD_REQUEST,
            BidanError::NotFound(_) => StatusCode::NOT_FOUND,
            BidanError::Allocation(_)
            | BidanError::Storage(_)
            | BidanError::DateFormat(_)
            | BidanError::Config(_)
            | BidanError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 面向客户端的消息; 存储层原始错误只写日志
    pub fn public_message(&self) -> String {
        match &self.0 {
            BidanError::Validation { .. } | BidanError::NotFound(_) | BidanError::DateFormat(_) => {
                self.0.to_string()
            }
            BidanError::Allocation(_) => "failed to allocate identifier".to_string(),
            BidanError::Storage(_) => "storage operation failed".to_string(),
            BidanError::Config(_) | BidanError::Serialization(_) => {
                "internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        let body = Json(json!({ "message": self.public_message() }));
        (status, body).into_response()
    }
}
