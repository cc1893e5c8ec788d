//! # Web服务模块
//!
//! 基于 axum 的 JSON HTTP 接口。

pub mod handlers;
pub mod params;
pub mod reports;
pub mod response;
pub mod server;
pub mod staff;

// 重新导出主要类型
pub use response::{ApiError, ApiResponse, ApiResult};
pub use server::{create_app, AppState, WebServer};
