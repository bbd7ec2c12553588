use std::path::Path;

use actix_web::{App, HttpServer, web};
use log::{error, info, warn};
use log4rs;

use bucket_ledger::app_state::AppState;
use bucket_ledger::config::AppConfig;
use bucket_ledger::service::configure_routes;

fn init_logging(config_file: &str) {
    if Path::new(config_file).exists() {
        match log4rs::init_file(config_file, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Failed to load log config {}: {}", config_file, e),
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    warn!("Log config {} not usable, logging to stderr", config_file);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::load().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    init_logging(&config.logging.config_file);

    let server_config = config.server.clone();
    let app_state = AppState::from_config(config).map_err(|e| {
        error!("Failed to initialize application state: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    let app_state = web::Data::new(app_state);

    let payload_limit = server_config.max_payload_size;
    info!("Starting server on {}:{}", server_config.host, server_config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::PayloadConfig::default().limit(payload_limit))
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .workers(server_config.workers)
    .bind((server_config.host.as_str(), server_config.port))?
    .run()
    .await
}
