//! # 病历记录模块
//!
//! 字段映射注册表、记录映射器，以及患者、就诊、助产士与预约的写入路径服务。

pub mod mapper;
pub mod midwives;
pub mod password;
pub mod patients;
pub mod registry;
pub mod reservations;
pub mod visits;

// 重新导出主要类型
pub use mapper::RecordMapper;
pub use midwives::{MidwifeLogin, MidwifeRegistration, MidwifeService};
pub use patients::{PatientService, Registration};
pub use registry::{FieldKind, FieldRule, SchemaRegistry};
pub use reservations::ReservationService;
pub use visits::VisitService;

use bidan_core::{BidanError, Result};
use bidan_database::Document;
use serde::Serialize;
use serde_json::Value;

/// 将可序列化的模型转换为存储文档
pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(BidanError::Storage(format!(
            "expected a JSON object document, got {}",
            other
        ))),
    }
}
