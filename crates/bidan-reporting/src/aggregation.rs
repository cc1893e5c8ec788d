//! 跨集合聚合引擎
//!
//! 将多个服务的就诊集合合并为统一的记录流, 并按月份或患者分组。

use bidan_core::{fields, utils, BidanError, DateRange, Result, ServiceType};
use bidan_database::filter::resolve;
use bidan_database::{Document, DocumentStore, Filter};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 统一形态的就诊记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitSummary {
    pub patient_id: u64,
    pub service_type: ServiceType,
    pub visit_date: NaiveDate,
    /// 原始日期字符串 (可能带时间)
    pub visited_at: String,
    #[serde(skip)]
    pub document: Document,
}

#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn DocumentStore>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 合并所选服务的就诊记录, 按就诊日期升序
    pub async fn union_by_service(
        &self,
        services: &[ServiceType],
        date_field: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<VisitSummary>> {
        let filter = match range {
            Some(range) => Filter::text_range(
                date_field,
                Some(range.lower_bound()),
                Some(range.upper_bound_exclusive()),
            ),
            None => Filter::All,
        };
        self.collect(services, date_field, &filter).await
    }

    /// 只合并指定患者的就诊记录
    pub async fn union_for_patients(
        &self,
        services: &[ServiceType],
        date_field: &str,
        patient_ids: &[u64],
    ) -> Result<Vec<VisitSummary>> {
        let ids = patient_ids.iter().map(|id| Value::from(*id)).collect();
        let filter = Filter::is_in(fields::PATIENT_ID, ids);
        self.collect(services, date_field, &filter).await
    }

    async fn collect(
        &self,
        services: &[ServiceType],
        date_field: &str,
        filter: &Filter,
    ) -> Result<Vec<VisitSummary>> {
        let mut seen = Vec::with_capacity(services.len());
        let mut stream = Vec::new();

        for &service in services {
            if seen.contains(&service) {
                continue;
            }
            seen.push(service);

            let documents = self.store.find(service.visit_collection(), filter).await?;
            debug!(
                "Read {} {} visits for aggregation",
                documents.len(),
                service.label()
            );

            for document in documents {
                let visited_at = resolve(&document, date_field)
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        BidanError::DateFormat(format!(
                            "{} visit has no {} date",
                            service.label(),
                            date_field
                        ))
                    })?
                    .to_string();
                let visit_date = utils::parse_date_prefix(&visited_at)?;

                let Some(patient_id) = document.get(fields::PATIENT_ID).and_then(|v| {
                    utils::parse_patient_id(Some(v), fields::PATIENT_ID).ok()
                }) else {
                    warn!(
                        "Skipping {} visit without a valid id_pasien",
                        service.label()
                    );
                    continue;
                };

                stream.push(VisitSummary {
                    patient_id,
                    service_type: service,
                    visit_date,
                    visited_at,
                    document,
                });
            }
        }

        // 同日记录按完整时间排序; 时间相同保持读取顺序
        stream.sort_by(|a, b| {
            a.visit_date
                .cmp(&b.visit_date)
                .then_with(|| a.visited_at.cmp(&b.visited_at))
        });
        Ok(stream)
    }

    /// 按月份计数, 12 个月份全部预置为 0
    pub fn group_by_month(stream: &[VisitSummary]) -> BTreeMap<u32, u64> {
        let mut months: BTreeMap<u32, u64> = (1..=12).map(|month| (month, 0)).collect();
        for visit in stream {
            *months.entry(visit.visit_date.month()).or_insert(0) += 1;
        }
        months
    }

    /// 按患者分组, 组内按就诊日期升序, 同日保持原有顺序
    pub fn group_by_patient(stream: Vec<VisitSummary>) -> BTreeMap<u64, Vec<VisitSummary>> {
        let mut groups: BTreeMap<u64, Vec<VisitSummary>> = BTreeMap::new();
        for visit in stream {
            groups.entry(visit.patient_id).or_default().push(visit);
        }
        for visits in groups.values_mut() {
            visits.sort_by_key(|visit| visit.visit_date);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidan_core::collections;
    use bidan_database::InMemoryStore;
    use serde_json::json;

    fn visit(patient_id: u64, date: &str) -> Document {
        json!({"id_pasien": patient_id, "tglDatang": date})
            .as_object()
            .cloned()
            .unwrap()
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let rows = [
            (collections::VISITS_FAMILY_PLANNING, 1, "2024-03-15T10:00:00Z"),
            (collections::VISITS_FAMILY_PLANNING, 2, "2024-01-20"),
            (collections::VISITS_PREGNANCY, 3, "2024-02-01"),
            (collections::VISITS_PREGNANCY, 1, "2023-12-31"),
            (collections::VISITS_IMMUNIZATION, 4, "2024-01-05"),
        ];
        for (collection, id, date) in rows {
            store.insert_one(collection, visit(id, date)).await.unwrap();
        }
        store
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_union_selected_services_sorted_and_tagged() {
        let engine = AggregationEngine::new(seeded_store().await);
        let range = DateRange::new(date("2024-01-01"), date("2024-12-31")).unwrap();

        let stream = engine
            .union_by_service(
                &[ServiceType::FamilyPlanning, ServiceType::Pregnancy],
                "tglDatang",
                Some(range),
            )
            .await
            .unwrap();

        let summary: Vec<_> = stream
            .iter()
            .map(|v| (v.patient_id, v.service_type, v.visit_date))
            .collect();
        assert_eq!(
            summary,
            vec![
                (2, ServiceType::FamilyPlanning, date("2024-01-20")),
                (3, ServiceType::Pregnancy, date("2024-02-01")),
                (1, ServiceType::FamilyPlanning, date("2024-03-15")),
            ]
        );
    }

    #[tokio::test]
    async fn test_union_without_range_reads_everything() {
        let engine = AggregationEngine::new(seeded_store().await);
        let stream = engine
            .union_by_service(&ServiceType::ALL, "tglDatang", None)
            .await
            .unwrap();
        assert_eq!(stream.len(), 5);
        assert_eq!(stream[0].visit_date, date("2023-12-31"));
    }

    #[tokio::test]
    async fn test_union_range_end_is_inclusive_for_datetimes() {
        let engine = AggregationEngine::new(seeded_store().await);
        let range = DateRange::new(date("2024-03-15"), date("2024-03-15")).unwrap();
        let stream = engine
            .union_by_service(&[ServiceType::FamilyPlanning], "tglDatang", Some(range))
            .await
            .unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].visited_at, "2024-03-15T10:00:00Z");
    }

    #[tokio::test]
    async fn test_unparseable_visit_date_is_a_date_error() {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert_one(collections::VISITS_IMMUNIZATION, visit(1, "besok"))
            .await
            .unwrap();
        let engine = AggregationEngine::new(store);

        let err = engine
            .union_by_service(&[ServiceType::Immunization], "tglDatang", None)
            .await
            .unwrap_err();
        assert!(matches!(err, BidanError::DateFormat(_)));
    }

    #[tokio::test]
    async fn test_union_for_patients() {
        let engine = AggregationEngine::new(seeded_store().await);
        let stream = engine
            .union_for_patients(&ServiceType::ALL, "tglDatang", &[1])
            .await
            .unwrap();
        let services: Vec<_> = stream.iter().map(|v| v.service_type).collect();
        assert_eq!(
            services,
            vec![ServiceType::Pregnancy, ServiceType::FamilyPlanning]
        );
    }

    #[tokio::test]
    async fn test_same_day_visits_ordered_by_time_across_services() {
        let store = Arc::new(InMemoryStore::new());
        let rows = [
            (collections::VISITS_FAMILY_PLANNING, 1, "2024-03-15T10:00:00Z"),
            (collections::VISITS_PREGNANCY, 2, "2024-03-15T08:30:00Z"),
            (collections::VISITS_IMMUNIZATION, 3, "2024-03-15T09:15:00Z"),
        ];
        for (collection, id, date) in rows {
            store.insert_one(collection, visit(id, date)).await.unwrap();
        }
        let engine = AggregationEngine::new(store);

        let stream = engine
            .union_by_service(&ServiceType::ALL, "tglDatang", None)
            .await
            .unwrap();
        let patients: Vec<_> = stream.iter().map(|v| v.patient_id).collect();
        assert_eq!(patients, vec![2, 3, 1]);
    }

    #[test]
    fn test_group_by_month_empty_input() {
        let months = AggregationEngine::group_by_month(&[]);
        assert_eq!(months.len(), 12);
        assert!(months.values().all(|count| *count == 0));
        assert_eq!(months.keys().copied().collect::<Vec<_>>(), (1..=12).collect::<Vec<_>>());
    }

    fn summary(patient_id: u64, raw_date: &str, marker: u64) -> VisitSummary {
        let mut document = Document::new();
        document.insert("marker".to_string(), json!(marker));
        VisitSummary {
            patient_id,
            service_type: ServiceType::FamilyPlanning,
            visit_date: date(raw_date),
            visited_at: raw_date.to_string(),
            document,
        }
    }

    #[test]
    fn test_group_by_month_counts() {
        let stream = vec![
            summary(1, "2024-01-02", 0),
            summary(2, "2024-01-30", 0),
            summary(3, "2024-12-01", 0),
        ];
        let months = AggregationEngine::group_by_month(&stream);
        assert_eq!(months[&1], 2);
        assert_eq!(months[&12], 1);
        assert_eq!(months[&6], 0);
    }

    #[test]
    fn test_group_by_patient_orders_and_keeps_ties_stable() {
        let stream = vec![
            summary(7, "2024-05-01", 1),
            summary(9, "2024-01-01", 2),
            summary(7, "2024-02-01", 3),
            summary(7, "2024-05-01", 4),
        ];
        let groups = AggregationEngine::group_by_patient(stream);
        let markers: Vec<_> = groups[&7]
            .iter()
            .map(|v| v.document["marker"].as_u64().unwrap())
            .collect();
        assert_eq!(markers, vec![3, 1, 4]);
        assert_eq!(groups[&9].len(), 1);
    }
}
