use actix_web::web;
use mongodb::bson::oid::ObjectId;

use crate::error::ApiError;

pub mod admin;
pub mod apartments;
pub mod availability;
pub mod blocked_dates;
pub mod bookings;
pub mod health;
pub mod payments;
pub mod users;

/// Registers every endpoint. Handlers expect `web::Data` for `AppConfig`,
/// `Store` and `Reservations`, plus optionally `StripePayments`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check)).service(
        web::scope("/api")
            .configure(users::config)
            .configure(apartments::config)
            .configure(bookings::config)
            .configure(availability::config)
            .configure(blocked_dates::config)
            .configure(payments::config)
            .configure(admin::config),
    );
}

pub(crate) fn parse_object_id(value: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value.trim()).map_err(|_| ApiError::invalid_id(what))
}
