//! 报表服务
//!
//! 图表、当月计数、就诊日志、病史表与导出, 全部建立在聚合引擎之上。

use bidan_core::{collections, fields, path, BidanError, DateRange, Result, ServiceType};
use bidan_database::{Document, DocumentStore, Filter};
use bidan_records::{RecordMapper, SchemaRegistry};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::aggregation::{AggregationEngine, VisitSummary};
use crate::dates::{format_day_month_year, localized_date, short_month_name};

/// 图表中的一个月
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub month: &'static str,
    /// 前端图表组件沿用的键名, 值为就诊次数
    pub revenue: u64,
}

/// 当月就诊计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitCount {
    pub jumlah: u64,
    #[serde(rename = "lastUpdate")]
    pub last_update: String,
}

/// 就诊日志条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitLogEntry {
    pub id_pasien: u64,
    /// 本地化日期
    pub tanggal: String,
    pub id_layanan: ServiceType,
    pub layanan: &'static str,
    pub datetime: String,
    #[serde(rename = "namaPasien")]
    pub nama_pasien: Value,
    #[serde(rename = "noHP")]
    pub no_hp: Value,
}

/// 病史表中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientHistory {
    pub id_pasien: u64,
    pub name: Value,
    /// 最近一次就诊的本地化日期, 无就诊时为 null
    #[serde(rename = "tglDatang")]
    pub last_visit: Option<String>,
    #[serde(rename = "subRows")]
    pub sub_rows: Vec<Document>,
    /// 服务相关的附加列
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn DocumentStore>,
    engine: AggregationEngine,
}

fn scope(service: Option<ServiceType>) -> Vec<ServiceType> {
    match service {
        Some(service) => vec![service],
        None => ServiceType::ALL.to_vec(),
    }
}

fn patient_field(patient: &Document, field_path: &str) -> Value {
    path::get_in(patient, field_path).cloned().unwrap_or(Value::Null)
}

impl ReportService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let engine = AggregationEngine::new(store.clone());
        Self { store, engine }
    }

    async fn patients_by_id(&self, ids: &[u64]) -> Result<HashMap<u64, Document>> {
        let filter = Filter::is_in(fields::PATIENT_ID, ids.iter().map(|id| Value::from(*id)).collect());
        let documents = self.store.find(collections::PATIENTS, &filter).await?;
        Ok(documents
            .into_iter()
            .filter_map(|doc| {
                let id = doc.get(fields::PATIENT_ID).and_then(Value::as_u64)?;
                Some((id, doc))
            })
            .collect())
    }

    /// 某年 12 个月的就诊次数; 未指定服务时统计全部服务
    pub async fn monthly_chart(
        &self,
        service: Option<ServiceType>,
        year: i32,
    ) -> Result<Vec<MonthlyCount>> {
        let stream = self
            .engine
            .union_by_service(&scope(service), fields::VISIT_DATE, Some(DateRange::year(year)?))
            .await?;

        let months = AggregationEngine::group_by_month(&stream);
        months
            .into_iter()
            .map(|(month, count)| {
                short_month_name(month)
                    .map(|name| MonthlyCount {
                        month: name,
                        revenue: count,
                    })
                    .ok_or_else(|| BidanError::DateFormat(format!("month {} out of range", month)))
            })
            .collect()
    }

    /// `today` 所在月份的就诊次数, 以及最近一次就诊时间
    pub async fn monthly_count(
        &self,
        service: Option<ServiceType>,
        today: NaiveDate,
    ) -> Result<VisitCount> {
        let month = DateRange::month_of(today);
        let stream = self
            .engine
            .union_by_service(&scope(service), fields::VISIT_DATE, Some(month))
            .await?;

        let last_update = stream
            .iter()
            .max_by(|a, b| a.visited_at.cmp(&b.visited_at))
            .map(|visit| visit.visited_at.clone())
            .unwrap_or_else(|| format!("{}T00:00:00Z", month.lower_bound()));

        Ok(VisitCount {
            jumlah: stream.len() as u64,
            last_update,
        })
    }

    /// 全部服务的就诊日志, 附带患者姓名与电话; 找不到患者的记录被跳过
    pub async fn visit_log(&self, range: Option<DateRange>) -> Result<Vec<VisitLogEntry>> {
        let stream = self
            .engine
            .union_by_service(&ServiceType::ALL, fields::VISIT_DATE, range)
            .await?;

        let mut ids: Vec<u64> = stream.iter().map(|visit| visit.patient_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let patients = self.patients_by_id(&ids).await?;

        let mut entries = Vec::with_capacity(stream.len());
        for visit in stream {
            let Some(patient) = patients.get(&visit.patient_id) else {
                warn!(
                    "Visit log skips orphaned {} visit of patient {}",
                    visit.service_type.label(),
                    visit.patient_id
                );
                continue;
            };
            entries.push(VisitLogEntry {
                id_pasien: visit.patient_id,
                tanggal: localized_date(visit.visit_date),
                id_layanan: visit.service_type,
                layanan: visit.service_type.label(),
                datetime: visit.visited_at,
                nama_pasien: patient_field(patient, fields::PATIENT_NAME),
                no_hp: patient_field(patient, fields::PHONE),
            });
        }

        debug!("Visit log contains {} entries", entries.len());
        Ok(entries)
    }

    /// 指定患者在某项服务下的病史表
    pub async fn patient_table(
        &self,
        patient_ids: &[u64],
        service: ServiceType,
    ) -> Result<Vec<PatientHistory>> {
        let patients = self.patients_by_id(patient_ids).await?;
        let stream = self
            .engine
            .union_for_patients(&[service], fields::VISIT_DATE, patient_ids)
            .await?;
        let mut groups = AggregationEngine::group_by_patient(stream);

        let mut rows = Vec::with_capacity(patient_ids.len());
        for &patient_id in patient_ids {
            let patient = patients
                .get(&patient_id)
                .ok_or_else(|| BidanError::NotFound(format!("patient {}", patient_id)))?;
            let visits = groups.remove(&patient_id).unwrap_or_default();

            rows.push(PatientHistory {
                id_pasien: patient_id,
                name: patient_field(patient, fields::PATIENT_NAME),
                last_visit: visits.last().map(|visit| localized_date(visit.visit_date)),
                sub_rows: visits.into_iter().map(history_row).collect(),
                extras: service_extras(service, patient),
            });
        }

        info!(
            "Built {} history rows for {}",
            rows.len(),
            service.label()
        );
        Ok(rows)
    }

    /// 注册日期落在区间内且登记了该服务的患者, 以外部格式输出
    pub async fn export(&self, service: ServiceType, range: DateRange) -> Result<Vec<Value>> {
        let filter = Filter::and(vec![
            Filter::exists(service.section()),
            Filter::text_range(
                fields::REGISTERED_AT,
                Some(range.lower_bound()),
                Some(range.upper_bound_exclusive()),
            ),
        ]);
        let documents = self.store.find(collections::PATIENTS, &filter).await?;

        let mapper = RecordMapper::for_service(service);
        let exported: Vec<Value> = documents
            .iter()
            .map(|document| {
                let mut external = mapper.to_external(document);
                if let (Value::Object(map), Some(id)) =
                    (&mut external, document.get(fields::PATIENT_ID))
                {
                    map.insert(fields::PATIENT_ID.to_string(), id.clone());
                }
                external
            })
            .collect();

        info!(
            "Exported {} {} patients registered {}..{}",
            exported.len(),
            service.label(),
            range.from,
            range.to
        );
        Ok(exported)
    }
}

/// 病史子行: 原始就诊文档, 日期改为 `dd-mm-yyyy`
fn history_row(visit: VisitSummary) -> Document {
    let mut row = visit.document;
    row.insert(
        fields::VISIT_DATE.to_string(),
        Value::String(format_day_month_year(visit.visit_date)),
    );
    row
}

/// 病史表附加列: (列名, 外部字段, 分组内的子字段)
type ExtraColumn = (&'static str, &'static str, Option<&'static str>);

fn extra_columns(service: ServiceType) -> &'static [ExtraColumn] {
    match service {
        ServiceType::FamilyPlanning => &[("metodeKontrasepsi", "otherInformation", Some("caraKBTerakhir"))],
        ServiceType::Pregnancy => &[("namaSuami", "generalInformation.namaSuami", None)],
        ServiceType::Immunization => &[
            ("namaAyah", "generalInformation.namaAyah", None),
            ("namaIbu", "generalInformation.namaIbu", None),
        ],
    }
}

/// 附加列的存储路径由注册表解析
fn service_extras(service: ServiceType, patient: &Document) -> Map<String, Value> {
    extra_columns(service)
        .iter()
        .map(|&(column, external, nested)| {
            let value = SchemaRegistry::by_external(service, external)
                .map(|rule| match nested {
                    Some(field) => patient_field(patient, &format!("{}.{}", rule.internal, field)),
                    None => patient_field(patient, rule.internal),
                })
                .unwrap_or(Value::Null);
            (column.to_string(), value)
        })
        .collect()
}
