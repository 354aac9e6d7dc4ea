//! Guarded file downloads behind a uniform JSON response envelope.
//!
//! Files are served from a configured root directory that requested paths
//! cannot escape. Every outcome, whether success, validation failure, or
//! download failure, is rendered through one `{code, msg, data}` envelope.
use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

pub mod domain;
pub mod forms;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;

use crate::models::config::ServerConfig;
use crate::services::download::{DownloadRoot, DownloadService};

/// Configures the download root and serves requests until shutdown.
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let root = DownloadRoot::new();
    root.set(&config.download_root)
        .map_err(std::io::Error::other)?;
    let service = DownloadService::new(root);

    log::info!(
        "serving downloads from {:?} on {}:{}",
        service.root().current(),
        config.address,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .wrap(Cors::permissive())
            .service(routes::main::download_file)
            .service(routes::main::health)
    })
    .bind((config.address, config.port))?
    .run()
    .await
}
