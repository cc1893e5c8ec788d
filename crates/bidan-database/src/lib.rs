//! # 文档存储模块
//!
//! 定义存储协作方接口 (`DocumentStore`)、过滤条件语言和序号分配器，
//! 并提供内存实现与基于 PostgreSQL JSONB 的实现。

pub mod allocator;
pub mod connection;
pub mod filter;
pub mod memory;
pub mod models;
pub mod queries;
pub mod store;

// 重新导出主要类型
pub use allocator::{Counter, IdentityAllocator};
pub use connection::DatabasePool;
pub use filter::Filter;
pub use memory::InMemoryStore;
pub use queries::PgDocumentStore;
pub use store::{Document, DocumentStore, WriteOp};
