//! 就诊记录 (SOAP)
//!
//! 就诊记录通过 `id_pasien` 弱引用患者, 创建后不再修改, 只随患者级联删除。

use bidan_core::{collections, fields, path, utils, BidanError, Result, ServiceType};
use bidan_database::{DocumentStore, Filter};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// 孕期就诊的日期位于 ANC 记录中
const PREGNANCY_DATE_PATH: &str = "soapAnc.tanggal";

#[derive(Clone)]
pub struct VisitService {
    store: Arc<dyn DocumentStore>,
}

impl VisitService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 提交一次就诊记录, 返回文档 `_id`
    pub async fn submit(&self, service: ServiceType, payload: &Value) -> Result<String> {
        let Value::Object(body) = payload else {
            return Err(BidanError::validation("data", "must be an object"));
        };

        let patient_id = utils::parse_patient_id(body.get(fields::PATIENT_ID), "data.id_pasien")?;

        let date_path = match service {
            ServiceType::Pregnancy => PREGNANCY_DATE_PATH,
            _ => fields::VISIT_DATE,
        };
        let visit_date = path::get(payload, date_path)
            .and_then(Value::as_str)
            .ok_or_else(|| BidanError::required(date_path))?
            .to_string();
        utils::parse_date_prefix(&visit_date)
            .map_err(|_| BidanError::validation(date_path, "must be an ISO date (YYYY-MM-DD)"))?;

        let patients = self
            .store
            .count(collections::PATIENTS, &Filter::eq(fields::PATIENT_ID, patient_id))
            .await?;
        if patients == 0 {
            return Err(BidanError::NotFound(format!("patient {}", patient_id)));
        }

        let mut document = body.clone();
        document.insert(fields::PATIENT_ID.to_string(), Value::from(patient_id));
        document.insert(fields::VISIT_DATE.to_string(), Value::String(visit_date));

        let id = self
            .store
            .insert_one(service.visit_collection(), document)
            .await?;
        info!(
            "Recorded {} visit {} for patient {}",
            service.label(),
            id,
            patient_id
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidan_database::InMemoryStore;
    use serde_json::json;

    async fn store_with_patient(patient_id: u64) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let patient = json!({"id_pasien": patient_id, "nama_pasien": "Siti"});
        store
            .insert_one(collections::PATIENTS, patient.as_object().cloned().unwrap())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_submit_family_planning_visit() {
        let store = store_with_patient(5).await;
        let visits = VisitService::new(store.clone());

        let payload = json!({"id_pasien": "5", "tglDatang": "2024-03-10T09:00:00Z", "subjective": "pusing"});
        visits.submit(ServiceType::FamilyPlanning, &payload).await.unwrap();

        let stored = store
            .find(collections::VISITS_FAMILY_PLANNING, &Filter::All)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["id_pasien"], json!(5));
        assert_eq!(stored[0]["subjective"], json!("pusing"));
    }

    #[tokio::test]
    async fn test_pregnancy_visit_date_comes_from_anc() {
        let store = store_with_patient(8).await;
        let visits = VisitService::new(store.clone());

        let payload = json!({"id_pasien": 8, "soapAnc": {"tanggal": "2024-05-01", "td": "110/70"}});
        visits.submit(ServiceType::Pregnancy, &payload).await.unwrap();

        let stored = store
            .find_one(collections::VISITS_PREGNANCY, &Filter::eq("id_pasien", 8u64))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["tglDatang"], json!("2024-05-01"));
    }

    #[tokio::test]
    async fn test_visit_for_unknown_patient_is_not_found() {
        let store = store_with_patient(1).await;
        let visits = VisitService::new(store);
        let payload = json!({"id_pasien": 2, "tglDatang": "2024-03-10"});
        let err = visits
            .submit(ServiceType::Immunization, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, BidanError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_visit_date_is_validated() {
        let store = store_with_patient(1).await;
        let visits = VisitService::new(store);

        let missing = json!({"id_pasien": 1});
        let err = visits
            .submit(ServiceType::Pregnancy, &missing)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "soapAnc.tanggal is required");

        let garbage = json!({"id_pasien": 1, "tglDatang": "kemarin"});
        let err = visits
            .submit(ServiceType::FamilyPlanning, &garbage)
            .await
            .unwrap_err();
        assert!(matches!(err, BidanError::Validation { .. }));
    }
}
