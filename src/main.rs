use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use solver_bench::config::Config;
use solver_bench::domain::solver_factory::SolverType;
use solver_bench::routes;
use solver_bench::state::AppState;

// ---------- Server bootstrap ----------
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    // Errors and panics go to Sentry only when a DSN is configured
    let _sentry = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let port = config.port;
    let solvers: Vec<&str> = SolverType::all().iter().map(|s| s.name()).collect();
    log::info!(
        "Starting server on http://127.0.0.1:{} (solvers: {}, uploads in {})",
        port,
        solvers.join(", "),
        config.upload_dir.display()
    );

    let state = web::Data::new(AppState::new(config));
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(sentry_actix::Sentry::new())
            .configure(routes::configure(state.clone()))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
