//! 助产士账户与预约处理器

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Query, State,
};
use axum::response::Json;
use bidan_core::{MidwifeProfile, Reminder, Reservation};
use bidan_records::{MidwifeLogin, MidwifeRegistration};
use serde::Deserialize;
use std::sync::Arc;

use crate::params;
use crate::response::{ApiResponse, ApiResult};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ReservationParams {
    pub tanggal: Option<String>,
    pub id_layanan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MidwifeSearch {
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MidwifeId {
    pub id_bidan: Option<String>,
}

/// 创建预约 (同时生成提醒)
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Reservation>, JsonRejection>,
) -> ApiResult<Reminder> {
    let Json(reservation) = payload?;
    let reminder = state.reservations.create(reservation).await?;
    Ok(ApiResponse::created("reservation created", reminder))
}

pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReservationParams>, QueryRejection>,
) -> ApiResult<Vec<Reservation>> {
    let Query(params) = query?;
    let day = params::required(&params.tanggal, "tanggal")?;
    let service = params::service(&params.id_layanan)?;

    let reservations = state.reservations.list(day, service).await?;
    Ok(ApiResponse::ok("success", reservations))
}

pub async fn register_midwife(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MidwifeRegistration>, JsonRejection>,
) -> ApiResult<MidwifeProfile> {
    let Json(request) = payload?;
    let profile = state.midwives.register(request).await?;
    Ok(ApiResponse::created("user registered successfully", profile))
}

pub async fn login_midwife(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MidwifeLogin>, JsonRejection>,
) -> ApiResult<MidwifeProfile> {
    let Json(request) = payload?;
    let profile = state.midwives.login(request).await?;
    Ok(ApiResponse::ok("login successful", profile))
}

pub async fn list_midwives(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MidwifeSearch>, QueryRejection>,
) -> ApiResult<Vec<MidwifeProfile>> {
    let Query(params) = query?;
    let midwives = state.midwives.list(params.keyword.as_deref()).await?;
    Ok(ApiResponse::ok("success", midwives))
}

pub async fn delete_midwife(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MidwifeId>, QueryRejection>,
) -> ApiResult<()> {
    let Query(params) = query?;
    let id = params::required(&params.id_bidan, "id_bidan")?;
    state.midwives.delete(id).await?;
    Ok(ApiResponse::message("midwife deleted"))
}
