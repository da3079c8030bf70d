use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::apartment::ApartmentSummary;
use super::{Populated, Related};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    PaymentPending,
    PaymentCompleted,
}

impl BookingStatus {
    /// Statuses that reserve calendar days.
    pub const OCCUPYING: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::PaymentCompleted,
    ];

    pub fn occupies(&self) -> bool {
        Self::OCCUPYING.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::PaymentPending => "PAYMENT_PENDING",
            BookingStatus::PaymentCompleted => "PAYMENT_COMPLETED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    Stripe,
    BankTransfer,
    Cash,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub apartment: ObjectId,
    pub user: ObjectId,
    pub start_date: bson::DateTime,
    pub end_date: bson::DateTime,
    pub total_price: f64,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub payment_date: Option<bson::DateTime>,
    pub confirmed_at: Option<bson::DateTime>,
    pub cancelled_at: Option<bson::DateTime>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub apartment_id: String,
    pub start_date: String,
    pub end_date: String,
    pub total_price: Option<f64>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(rename = "_id")]
    pub id: String,
    pub apartment: Populated<ApartmentSummary>,
    pub user: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: f64,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookingView {
    pub fn new(booking: &Booking, related: &Related) -> Self {
        BookingView {
            id: booking.id.map(|id| id.to_hex()).unwrap_or_default(),
            apartment: related.apartment(&booking.apartment),
            user: booking.user.to_hex(),
            start_date: booking.start_date.to_chrono(),
            end_date: booking.end_date.to_chrono(),
            total_price: booking.total_price,
            status: booking.status,
            payment_method: booking.payment_method,
            payment_status: booking.payment_status,
            payment_id: booking.payment_id.clone(),
            confirmed_at: booking.confirmed_at.map(|at| at.to_chrono()),
            cancelled_at: booking.cancelled_at.map(|at| at.to_chrono()),
            cancellation_reason: booking.cancellation_reason.clone(),
            notes: booking.notes.clone(),
            created_at: booking.created_at.to_chrono(),
        }
    }
}
