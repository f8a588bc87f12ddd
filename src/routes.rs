use actix_web::{web, HttpResponse, Responder};

use crate::domain::benchmark::run_benchmark;
use crate::domain::solver::{SolveRequest, Solver};
use crate::domain::solver_factory::{create_solver, SolverType};
use crate::domain::upload::UploadError;
use crate::domain::validate::{validate_solvers, validate_time_limit};
use crate::error::ApiError;
use crate::models::{BenchmarkRequest, SolverInfo, SolversResponse, UploadResponse};
use crate::report::{html_page, text_table, BenchmarkReport};
use crate::state::AppState;

// ---------- Route handlers ----------

/// POST /models/{filename}
pub async fn upload_model(
    state: web::Data<AppState>,
    file_name: web::Path<String>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let limit = state.config.model_size_limit;
    // Read the body here so an oversize upload gets the JSON error body
    let body = payload
        .to_bytes_limited(limit)
        .await
        .map_err(|_| UploadError::TooLarge { limit })?
        .map_err(|e| ApiError::Payload(e.to_string()))?;
    let model = state.store.store(&file_name, &body)?;
    Ok(HttpResponse::Created().json(UploadResponse { model }))
}

/// POST /benchmark
pub async fn benchmark(
    state: web::Data<AppState>,
    req: web::Json<BenchmarkRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();
    let time_limit = validate_time_limit(req.time_limit)?;
    let selected = validate_solvers(req.solvers.as_deref())?;
    let model = state.store.get(&req.model)?;

    let run_id = state.next_run_id();
    let config = state.config.clone();
    let request = SolveRequest::new(model.path.clone(), time_limit);

    // Solvers block for up to the time limit each; keep them off the executor.
    let entries = web::block(move || {
        let solvers: Vec<(SolverType, Box<dyn Solver>)> = selected
            .into_iter()
            .map(|solver_type| (solver_type, create_solver(solver_type, &config)))
            .collect();
        run_benchmark(
            &request,
            solvers.iter().map(|(solver_type, solver)| (*solver_type, solver.as_ref())),
        )
    })
    .await
    .map_err(|e| ApiError::Worker(e.to_string()))?;

    let report = BenchmarkReport::new(run_id, model.name, time_limit, entries);
    log::info!("run {} on {}:\n{}", run_id, report.model, text_table(&report.results));
    let report = state.remember(report);

    Ok(HttpResponse::Ok().json(report.as_ref()))
}

/// GET /runs/{id}
pub async fn get_run(state: web::Data<AppState>, run_id: web::Path<u64>) -> Result<HttpResponse, ApiError> {
    let run_id = run_id.into_inner();
    let report = state.run(run_id).ok_or(ApiError::RunNotFound(run_id))?;
    Ok(HttpResponse::Ok().json(report.as_ref()))
}

/// GET /runs/{id}/report
pub async fn get_run_report(state: web::Data<AppState>, run_id: web::Path<u64>) -> Result<HttpResponse, ApiError> {
    let run_id = run_id.into_inner();
    let report = state.run(run_id).ok_or(ApiError::RunNotFound(run_id))?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html_page(&report)))
}

/// GET /solvers
pub async fn list_solvers() -> impl Responder {
    HttpResponse::Ok().json(SolversResponse {
        solvers: SolverType::all().into_iter().map(SolverInfo::from).collect(),
    })
}

/// GET /health
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

/// GET /docs
pub async fn docs() -> impl Responder {
    let docs_html = include_str!("../static/docs.html");
    HttpResponse::Ok()
        .content_type("text/html")
        .body(docs_html)
}

/// GET / - Redirect to docs
pub async fn root_redirect() -> impl Responder {
    HttpResponse::Found()
        .append_header(("Location", "/docs"))
        .finish()
}

/// Register state, the JSON extractor config and every route
pub fn configure(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let json_limit = state.config.json_limit;

        cfg.app_data(state)
            .app_data(
                web::JsonConfig::default()
                    .limit(json_limit)
                    .error_handler(|err, _| {
                        let err_string = err.to_string();
                        actix_web::error::InternalError::from_response(
                            err,
                            HttpResponse::BadRequest()
                                .json(serde_json::json!({ "error": err_string })),
                        )
                        .into()
                    }),
            )
            .route("/", web::get().to(root_redirect))
            .route("/health", web::get().to(health_check))
            .route("/docs", web::get().to(docs))
            .route("/solvers", web::get().to(list_solvers))
            .route("/models/{filename}", web::post().to(upload_model))
            .route("/benchmark", web::post().to(benchmark))
            .route("/runs/{id}", web::get().to(get_run))
            .route("/runs/{id}/report", web::get().to(get_run_report));
    }
}
