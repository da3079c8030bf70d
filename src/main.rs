use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};

use apartment_booking_api::config::AppConfig;
use apartment_booking_api::db;
use apartment_booking_api::routes;
use apartment_booking_api::services::catalog::{ApartmentCatalog, MongoCatalog};
use apartment_booking_api::services::payment::StripePayments;
use apartment_booking_api::services::reservation::Reservations;

#[actix_web::main]
async fn main() -> io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    info!("Attempting to bind to {}:{}", config.host, config.port);

    let store = db::mongo::connect(&config.mongodb_uri, &config.database_name)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    if let Err(e) = store.ensure_indexes().await {
        warn!("Failed to ensure MongoDB indexes: {}", e);
    }

    let reservations = web::Data::new(Reservations::new(store.availability_engine()));
    let catalog: Arc<dyn ApartmentCatalog> = Arc::new(MongoCatalog::new(store.apartments()));
    let catalog = web::Data::from(catalog);
    let payments = match &config.stripe_secret_key {
        Some(key) => Some(web::Data::new(StripePayments::new(key.clone()))),
        None => {
            warn!("STRIPE_SECRET_KEY not set; payment intents are disabled");
            None
        }
    };

    let bind = (config.host.clone(), config.port);
    let config = web::Data::new(config);
    let store = web::Data::new(store);

    info!("Starting HTTP server...");
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.cors_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        let mut app = App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(config.clone())
            .app_data(store.clone())
            .app_data(catalog.clone())
            .app_data(reservations.clone());
        if let Some(payments) = &payments {
            app = app.app_data(payments.clone());
        }
        app.configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await
}
