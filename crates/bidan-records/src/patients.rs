//! 患者服务
//!
//! 注册、查看、编辑、检索与级联删除患者记录。

use bidan_core::{collections, fields, BidanError, Result, ServiceType};
use bidan_database::{Counter, Document, DocumentStore, Filter, IdentityAllocator, WriteOp};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::mapper::RecordMapper;

/// 注册结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub id_pasien: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_bayi: Option<u64>,
}

/// 患者服务
#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn DocumentStore>,
    allocator: IdentityAllocator,
}

fn patient_filter(patient_id: u64) -> Filter {
    Filter::eq(fields::PATIENT_ID, patient_id)
}

fn not_found(patient_id: u64) -> BidanError {
    BidanError::NotFound(format!("patient {}", patient_id))
}

impl PatientService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let allocator = IdentityAllocator::new(store.clone());
        Self { store, allocator }
    }

    /// 注册新患者
    ///
    /// 先校验载荷再分配编号, 校验失败不会消耗序号。免疫服务另外分配婴儿编号。
    pub async fn register(&self, service: ServiceType, payload: &Value) -> Result<Registration> {
        let mut document = RecordMapper::for_service(service).to_storage(payload)?;

        let patient_id = self.allocator.next_id(Counter::PatientId).await?;
        document.insert(fields::PATIENT_ID.to_string(), Value::from(patient_id));

        let baby_number = if service == ServiceType::Immunization {
            let number = self.allocator.next_id(Counter::BabyNumber).await?;
            document.insert(fields::BABY_NUMBER.to_string(), Value::from(number));
            Some(number)
        } else {
            None
        };

        self.store.insert_one(collections::PATIENTS, document).await?;
        info!("Registered {} patient {}", service.label(), patient_id);

        Ok(Registration {
            id_pasien: patient_id,
            no_bayi: baby_number,
        })
    }

    /// 原始存储文档
    pub async fn get(&self, patient_id: u64) -> Result<Document> {
        self.store
            .find_one(collections::PATIENTS, &patient_filter(patient_id))
            .await?
            .ok_or_else(|| not_found(patient_id))
    }

    /// 以外部格式查看患者的某项服务记录
    pub async fn view(&self, patient_id: u64, service: ServiceType) -> Result<Value> {
        let document = self.get(patient_id).await?;
        if !document.contains_key(service.section()) {
            return Err(BidanError::NotFound(format!(
                "{} data for patient {}",
                service.label(),
                patient_id
            )));
        }
        Ok(RecordMapper::for_service(service).to_external(&document))
    }

    /// 编辑患者记录; 只允许编辑患者已登记的服务
    pub async fn edit(&self, patient_id: u64, service: ServiceType, payload: &Value) -> Result<()> {
        let update = RecordMapper::for_service(service).to_storage(payload)?;

        let existing = self.get(patient_id).await?;
        if !existing.contains_key(service.section()) {
            return Err(BidanError::validation(
                "id_layanan",
                format!(
                    "patient {} is not registered for {}",
                    patient_id,
                    service.label()
                ),
            ));
        }

        let filter = Filter::and(vec![
            patient_filter(patient_id),
            Filter::exists(service.section()),
        ]);
        let matched = self
            .store
            .update_one(collections::PATIENTS, &filter, update)
            .await?;
        if matched == 0 {
            return Err(not_found(patient_id));
        }

        info!("Updated {} data of patient {}", service.label(), patient_id);
        Ok(())
    }

    /// 按姓名检索登记了某项服务的患者编号 (不区分大小写)
    pub async fn search(&self, service: ServiceType, keyword: &str) -> Result<Vec<u64>> {
        let filter = Filter::and(vec![
            Filter::exists(service.section()),
            Filter::contains_text(fields::PATIENT_NAME, keyword.trim()),
        ]);
        let documents = self.store.find(collections::PATIENTS, &filter).await?;

        let mut ids = Vec::with_capacity(documents.len());
        for document in &documents {
            match document.get(fields::PATIENT_ID).and_then(Value::as_u64) {
                Some(id) => ids.push(id),
                None => warn!("Skipping patient document without numeric id_pasien"),
            }
        }
        Ok(ids)
    }

    /// 级联删除患者及其在三个就诊集合中的全部记录, 全部成功或全部不生效
    pub async fn delete(&self, patient_id: u64) -> Result<()> {
        let filter = patient_filter(patient_id);
        if self.store.count(collections::PATIENTS, &filter).await? == 0 {
            return Err(not_found(patient_id));
        }

        let mut ops = vec![WriteOp::delete_one(collections::PATIENTS, filter.clone())];
        for service in ServiceType::ALL {
            ops.push(WriteOp::delete_many(service.visit_collection(), filter.clone()));
        }

        let affected = self.store.transaction(ops).await?;
        let visits: u64 = affected.iter().skip(1).sum();
        info!("Deleted patient {} and {} visit records", patient_id, visits);
        Ok(())
    }
}
