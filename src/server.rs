use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::GroupingConfig;
use crate::error::GroupingError;
use crate::excel::resolve_roster_path;
use crate::runner::{build_roster_report, run_roster_iteration};

/// Estado compartido: configuración y un candado para que dos peticiones no
/// ejecuten iteraciones al mismo tiempo.
pub struct AppState {
    pub config: GroupingConfig,
    iteration_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: GroupingConfig) -> Self {
        AppState { config, iteration_lock: Arc::new(Mutex::new(())) }
    }
}

#[derive(Debug, Deserialize)]
pub struct NextIterationRequest {
    pub roster: String,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub dry_run: bool,
}

fn error_response(e: &GroupingError) -> HttpResponse {
    let body = json!({"error": e.to_string(), "kind": e.kind()});
    if e.is_input_error() {
        HttpResponse::UnprocessableEntity().json(body)
    } else if matches!(e, GroupingError::Spreadsheet(_)) {
        HttpResponse::BadRequest().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

/// POST /iterations/next
/// Ejecuta (o simula con `dry_run`) la iteración pendiente del roster indicado.
async fn next_iteration_handler(state: web::Data<AppState>, body: web::Json<NextIterationRequest>) -> impl Responder {
    let req = body.into_inner();
    let path = match resolve_roster_path(&state.config.roster_dir, &req.roster) {
        Ok(p) => p,
        Err(e) => return HttpResponse::BadRequest().json(json!({"error": e.to_string(), "kind": e.kind()})),
    };

    let config = state.config.clone();
    let lock = Arc::clone(&state.iteration_lock);
    let blocking_handle = tokio::task::spawn_blocking(move || {
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        run_roster_iteration(&config, &path, req.seed, req.dry_run)
    });

    match blocking_handle.await {
        Ok(Ok(outcome)) => HttpResponse::Ok().json(outcome),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "iteración rechazada");
            error_response(&e)
        }
        Err(e) => HttpResponse::InternalServerError().json(json!({"error": format!("task join error: {}", e)})),
    }
}

/// GET /report?roster=curso.xlsx
async fn report_handler(state: web::Data<AppState>, query: web::Query<HashMap<String, String>>) -> impl Responder {
    let qm = query.into_inner();
    let roster = match qm.get("roster").filter(|s| !s.trim().is_empty()) {
        Some(r) => r.clone(),
        None => return HttpResponse::BadRequest().json(json!({"error": "roster query parameter is required"})),
    };
    let path = match resolve_roster_path(&state.config.roster_dir, &roster) {
        Ok(p) => p,
        Err(e) => return HttpResponse::BadRequest().json(json!({"error": e.to_string(), "kind": e.kind()})),
    };

    let config = state.config.clone();
    match tokio::task::spawn_blocking(move || build_roster_report(&config, &path)).await {
        Ok(Ok(report)) => HttpResponse::Ok().json(report),
        Ok(Err(e)) => error_response(&e),
        Err(e) => HttpResponse::InternalServerError().json(json!({"error": format!("task join error: {}", e)})),
    }
}

async fn help_handler(state: web::Data<AppState>) -> impl Responder {
    let help = json!({
        "description": "API para asignar grupos de 3 (o 4) minimizando parejas repetidas entre iteraciones.",
        "post_example": {"roster": "curso.xlsx", "seed": 7, "dry_run": false},
        "endpoints": {
            "POST /iterations/next": "ejecuta la iteración pendiente del roster (columna 'Iteration N' sin grupos)",
            "GET /report?roster=curso.xlsx": "matriz de frecuencia de emparejamientos",
            "GET /help": "esta ayuda"
        },
        "absent_marker": state.config.absent_marker,
        "group_labels": state.config.labels.names(),
        "note": "Los estudiantes ausentes se marcan en la columna de la iteración antes de ejecutarla."
    });
    HttpResponse::Ok().json(help)
}

/// Rutas de la API (separadas para poder montarlas en pruebas).
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/iterations/next", web::post().to(next_iteration_handler))
        .route("/report", web::get().to(report_handler))
        .route("/help", web::get().to(help_handler));
}

pub async fn run_server(bind_addr: &str, config: GroupingConfig) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(config));
    tracing::info!(bind = bind_addr, "servidor iniciado");
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(bind_addr)?
        .run()
        .await
}
