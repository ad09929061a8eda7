mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;
mod utils;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use db::Gateway;
use dotenv::dotenv;
use log::info;
use std::io;

fn startup_error(err: errors::AppError) -> io::Error {
    io::Error::other(err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;

    // Connect before serving so the unique index exists for the first request
    let mut gateway = Gateway::new(config.store.clone());
    gateway.connect().await.map_err(startup_error)?;
    let store = web::Data::from(gateway.employees().map_err(startup_error)?);

    info!("Starting server at {}", config.bind_addr);

    let server = match HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(store.clone())
            .configure(handlers::configure)
    })
    .bind(config.bind_addr.as_str())
    {
        Ok(server) => server,
        Err(err) => {
            gateway.disconnect().await;
            return Err(err);
        }
    };

    let result = server.run().await;
    gateway.disconnect().await;
    result
}
