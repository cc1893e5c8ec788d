//! # BidanMandiri Core
//!
//! 助产士诊所系统的核心模块，提供服务类型、基础数据结构、错误定义和通用工具。

pub mod error;
pub mod models;
pub mod path;
pub mod utils;

pub use error::{BidanError, Result};
pub use models::*;
