use std::collections::HashMap;

use actix_web::{web, HttpResponse, Responder};
use log::warn;
use serde::Serialize;

use crate::db::mongo::Store;
use crate::services::payment::StripePayments;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(
    store: web::Data<Store>,
    payments: Option<web::Data<StripePayments>>,
) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let mongo_result = check_mongodb(&store).await;
    health.services.insert("mongodb".to_string(), mongo_result.clone());

    // Payments are optional; a missing key only disables the payment endpoint.
    let stripe_result = ServiceStatus {
        status: if payments.is_some() { "ok" } else { "disabled" }.to_string(),
        details: None,
    };
    health.services.insert("stripe".to_string(), stripe_result);

    if mongo_result.status != "ok" {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

async fn check_mongodb(store: &Store) -> ServiceStatus {
    match store.ping().await {
        Ok(_) => ServiceStatus {
            status: "ok".to_string(),
            details: Some("Connected successfully to MongoDB".to_string()),
        },
        Err(e) => {
            warn!("MongoDB health check failed: {}", e);
            ServiceStatus {
                status: "error".to_string(),
                details: Some(format!("Failed to connect: {}", e)),
            }
        }
    }
}
