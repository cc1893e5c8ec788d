//! # 系统管理模块
//!
//! 配置加载与校验、日志初始化。

pub mod config;
pub mod logging;

// 重新导出主要类型
pub use self::config::{
    load_config, BidanConfig, ConfigValidator, DatabaseConfig, LoggingConfig, ServerConfig,
    StorageBackend,
};
pub use logging::init_logging;
