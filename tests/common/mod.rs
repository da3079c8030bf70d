#![allow(dead_code)]

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App};
use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;

use apartment_booking_api::config::AppConfig;
use apartment_booking_api::db::mongo::{create_mongo_client, Store};
use apartment_booking_api::models::apartment::Apartment;
use apartment_booking_api::models::availability::{AvailabilityBlock, BlockReason};
use apartment_booking_api::models::blocked_date::BlockedDate;
use apartment_booking_api::models::booking::{Booking, BookingStatus, PaymentMethod, PaymentStatus};
use apartment_booking_api::models::user::UserRole;
use apartment_booking_api::routes;
use apartment_booking_api::services::account_service::issue_token;
use apartment_booking_api::services::availability::memory::MemorySource;
use apartment_booking_api::services::availability::{AvailabilityEngine, DateRange};
use apartment_booking_api::services::catalog::{ApartmentCatalog, MemoryCatalog};
use apartment_booking_api::services::reservation::Reservations;

pub const TEST_SECRET: &str = "integration-test-secret";

/// App wired to in-memory occupancy sources and listings. The MongoDB client
/// never connects unless a handler reaches the database.
pub struct TestApp {
    pub config: web::Data<AppConfig>,
    pub store: web::Data<Store>,
    pub reservations: web::Data<Reservations>,
    pub apartments: Arc<MemoryCatalog>,
    pub bookings: Arc<MemorySource<Booking>>,
    pub blocks: Arc<MemorySource<AvailabilityBlock>>,
    pub blocked_dates: Arc<MemorySource<BlockedDate>>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mongo_uri = std::env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let client = create_mongo_client(&mongo_uri)
            .await
            .expect("mongodb client options");

        let bookings: Arc<MemorySource<Booking>> = Arc::new(MemorySource::default());
        let blocks: Arc<MemorySource<AvailabilityBlock>> = Arc::new(MemorySource::default());
        let blocked_dates: Arc<MemorySource<BlockedDate>> = Arc::new(MemorySource::default());
        let engine = AvailabilityEngine::new(bookings.clone(), blocks.clone(), blocked_dates.clone());
        let apartments: Arc<MemoryCatalog> = Arc::new(MemoryCatalog::default());

        Self {
            config: web::Data::new(AppConfig::local(TEST_SECRET)),
            store: web::Data::new(Store::new(&client, "apartment_booking_test")),
            reservations: web::Data::new(Reservations::new(engine)),
            apartments,
            bookings,
            blocks,
            blocked_dates,
        }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(self.config.clone())
            .app_data(self.store.clone())
            .app_data(web::Data::from(self.apartments.clone() as Arc<dyn ApartmentCatalog>))
            .app_data(self.reservations.clone())
            .configure(routes::configure)
    }

    pub fn token_for(&self, user_id: ObjectId, role: UserRole) -> String {
        issue_token(&self.config, "test@example.com", user_id, role).expect("token")
    }

    pub fn bearer(&self, user_id: ObjectId, role: UserRole) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token_for(user_id, role)))
    }
}

pub fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("test date")
}

pub fn range(start: &str, end: &str) -> DateRange {
    DateRange::new(day(start), day(end)).expect("test range")
}

pub fn listing(owner: ObjectId) -> Apartment {
    Apartment {
        id: Some(ObjectId::new()),
        owner,
        title: "Harbour flat".to_string(),
        location: "Split".to_string(),
        price_per_night: 100.0,
        description: None,
        created_at: bson::DateTime::now(),
        updated_at: bson::DateTime::now(),
    }
}

pub fn booking(apartment: ObjectId, start: &str, end: &str, status: BookingStatus) -> Booking {
    let stay = range(start, end);
    Booking {
        id: Some(ObjectId::new()),
        apartment,
        user: ObjectId::new(),
        start_date: stay.start_bson(),
        end_date: stay.end_bson(),
        total_price: 100.0 * stay.nights() as f64,
        status,
        payment_method: PaymentMethod::CreditCard,
        payment_status: PaymentStatus::Pending,
        payment_id: None,
        payment_date: None,
        confirmed_at: None,
        cancelled_at: None,
        cancellation_reason: None,
        notes: None,
        created_at: bson::DateTime::now(),
        updated_at: bson::DateTime::now(),
    }
}

pub fn block(apartment: ObjectId, start: &str, end: &str, reason: BlockReason) -> AvailabilityBlock {
    let period = range(start, end);
    AvailabilityBlock {
        id: Some(ObjectId::new()),
        apartment,
        start_date: period.start_bson(),
        end_date: period.end_bson(),
        is_available: false,
        reason,
        notes: None,
        created_by: ObjectId::new(),
        created_at: bson::DateTime::now(),
        updated_at: bson::DateTime::now(),
    }
}

pub fn blocked(apartment: Option<ObjectId>, start: &str, end: &str) -> BlockedDate {
    let period = range(start, end);
    BlockedDate {
        id: Some(ObjectId::new()),
        start_date: period.start_bson(),
        end_date: period.end_bson(),
        reason: "Holidays".to_string(),
        apartment,
        created_by: ObjectId::new(),
        created_at: bson::DateTime::now(),
    }
}
