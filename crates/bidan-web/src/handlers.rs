//! 患者与就诊处理器

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::{IntoResponse, Json},
};
use bidan_core::{utils, ServiceType};
use bidan_database::Document;
use bidan_records::Registration;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::params;
use crate::response::{ApiResponse, ApiResult};
use crate::server::AppState;

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 带服务类型的记录载荷
#[derive(Debug, Deserialize)]
pub struct ServicePayload {
    pub id_layanan: ServiceType,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub id_pasien: Value,
    pub id_layanan: ServiceType,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct PatientParams {
    pub id_pasien: Option<String>,
    pub id_layanan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub id_layanan: Option<String>,
}

/// 注册患者
pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ServicePayload>, JsonRejection>,
) -> ApiResult<Registration> {
    let Json(request) = payload?;
    let registration = state
        .patients
        .register(request.id_layanan, &request.data)
        .await?;
    Ok(ApiResponse::created("patient registered", registration))
}

/// 以外部格式查看患者
pub async fn view_patient(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PatientParams>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(params) = query?;
    let patient_id = params::patient_id(&params.id_pasien)?;
    let service = params::service(&params.id_layanan)?;

    let view = state.patients.view(patient_id, service).await?;
    Ok(ApiResponse::ok("success", view))
}

/// 编辑患者
pub async fn edit_patient(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> ApiResult<()> {
    let Json(request) = payload?;
    let patient_id = utils::parse_patient_id(Some(&request.id_pasien), "id_pasien")?;

    state
        .patients
        .edit(patient_id, request.id_layanan, &request.data)
        .await?;
    Ok(ApiResponse::message("patient updated"))
}

/// 原始患者文档
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PatientParams>, QueryRejection>,
) -> ApiResult<Document> {
    let Query(params) = query?;
    let patient_id = params::patient_id(&params.id_pasien)?;
    let document = state.patients.get(patient_id).await?;
    Ok(ApiResponse::ok("success", document))
}

/// 按姓名检索患者编号
pub async fn find_patients(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<u64>> {
    let Query(params) = query?;
    let service = params::service(&params.id_layanan)?;
    let keyword = params.keyword.unwrap_or_default();

    let ids = state.patients.search(service, &keyword).await?;
    Ok(ApiResponse::ok("success", ids))
}

/// 级联删除患者
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PatientParams>, QueryRejection>,
) -> ApiResult<()> {
    let Query(params) = query?;
    let patient_id = params::patient_id(&params.id_pasien)?;
    state.patients.delete(patient_id).await?;
    info!("Patient {} deleted via API", patient_id);
    Ok(ApiResponse::message("patient deleted"))
}

/// 提交就诊记录
pub async fn submit_visit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ServicePayload>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let id = state.visits.submit(request.id_layanan, &request.data).await?;
    Ok(ApiResponse::created("visit recorded", json!({ "_id": id })))
}
