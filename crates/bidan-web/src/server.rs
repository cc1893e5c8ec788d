//! Web服务器

use axum::{
    routing::{delete, get, post},
    Router,
};
use bidan_database::DocumentStore;
use bidan_records::{MidwifeService, PatientService, ReservationService, VisitService};
use bidan_reporting::ReportService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{
    delete_patient, edit_patient, find_patients, get_patient, health, register_patient,
    submit_visit, view_patient,
};
use crate::reports::{export_patients, monthly_chart, monthly_count, patient_table, visit_log};
use crate::staff::{
    create_reservation, delete_midwife, list_midwives, list_reservations, login_midwife,
    register_midwife,
};

/// 处理器共享状态
pub struct AppState {
    pub patients: PatientService,
    pub visits: VisitService,
    pub midwives: MidwifeService,
    pub reservations: ReservationService,
    pub reports: ReportService,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            patients: PatientService::new(store.clone()),
            visits: VisitService::new(store.clone()),
            midwives: MidwifeService::new(store.clone()),
            reservations: ReservationService::new(store.clone()),
            reports: ReportService::new(store),
        }
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health))
        .nest("/api", api_routes())
        .with_state(state)
        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // 患者
        .route("/input", post(register_patient))
        .route("/edit", get(view_patient).post(edit_patient))
        .route("/getpasien", get(get_patient))
        .route("/findpasien", get(find_patients))
        .route("/delete", delete(delete_patient))
        // 就诊
        .route("/soap", post(submit_visit))
        // 报表
        .route("/allsoap", get(visit_log))
        .route("/chart", get(monthly_chart))
        .route("/count", get(monthly_count))
        .route("/table", get(patient_table))
        .route("/export", post(export_patients))
        // 预约
        .route("/reservasi", post(create_reservation))
        .route("/getreservasi", get(list_reservations))
        // 助产士
        .route("/registbidan", post(register_midwife))
        .route("/bidanlogin", post(login_midwife))
        .route("/getbidan", get(list_midwives))
        .route("/deletebidan", delete(delete_midwife))
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, store: Arc<dyn DocumentStore>) -> Self {
        let app = create_app(Arc::new(AppState::new(store)));
        Self { addr, app }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start web server: {}", e))?;

        Ok(())
    }
}
