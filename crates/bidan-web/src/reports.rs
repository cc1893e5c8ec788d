//! 报表处理器

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Query, State,
};
use axum::response::Json;
use bidan_core::{DateRange, ServiceType};
use bidan_reporting::{MonthlyCount, PatientHistory, VisitCount, VisitLogEntry};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::params;
use crate::response::{ApiResponse, ApiResult};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartParams {
    pub id_layanan: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CountParams {
    pub id_layanan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TableParams {
    pub id_pasien: Option<String>,
    pub id_layanan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub id_layanan: ServiceType,
    pub date: ExportRange,
}

/// 全部服务的就诊日志
pub async fn visit_log(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RangeParams>, QueryRejection>,
) -> ApiResult<Vec<VisitLogEntry>> {
    let Query(params) = query?;
    let range = params::optional_range(&params.from, &params.to)?;
    let entries = state.reports.visit_log(range).await?;
    Ok(ApiResponse::ok("success", entries))
}

/// 12 个月的就诊图表
pub async fn monthly_chart(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ChartParams>, QueryRejection>,
) -> ApiResult<Vec<MonthlyCount>> {
    let Query(params) = query?;
    let service = params::optional_service(&params.id_layanan)?;
    let year = match params.year.as_deref().map(str::trim).filter(|y| !y.is_empty()) {
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|_| bidan_core::BidanError::validation("year", "must be an integer"))?,
        None => Utc::now().year(),
    };

    let chart = state.reports.monthly_chart(service, year).await?;
    Ok(ApiResponse::ok("success", chart))
}

/// 当月就诊计数
pub async fn monthly_count(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CountParams>, QueryRejection>,
) -> ApiResult<VisitCount> {
    let Query(params) = query?;
    let service = params::optional_service(&params.id_layanan)?;
    let count = state
        .reports
        .monthly_count(service, Utc::now().date_naive())
        .await?;
    Ok(ApiResponse::ok("success", count))
}

/// 患者病史表
pub async fn patient_table(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TableParams>, QueryRejection>,
) -> ApiResult<Vec<PatientHistory>> {
    let Query(params) = query?;
    let ids = params::patient_id_list(&params.id_pasien)?;
    let service = params::service(&params.id_layanan)?;

    let rows = state.reports.patient_table(&ids, service).await?;
    Ok(ApiResponse::ok("success", rows))
}

/// 按注册日期导出患者
pub async fn export_patients(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> ApiResult<Vec<Value>> {
    let Json(request) = payload?;
    let from = params::date(&request.date.from, "date.from")?;
    let to = params::date(&request.date.to, "date.to")?;
    let range = DateRange::new(from, to)?;

    let rows = state.reports.export(request.id_layanan, range).await?;
    Ok(ApiResponse::ok("success", rows))
}
