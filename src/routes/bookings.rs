use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use log::info;
use mongodb::bson::doc;
use serde_json::json;

use crate::db::mongo::Store;
use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::booking::{
    Booking, BookingStatus, BookingView, CancelBookingRequest, CreateBookingRequest, PaymentStatus,
};
use crate::models::{Related, WithMessage};
use crate::routes::apartments::find_apartment;
use crate::routes::parse_object_id;
use crate::services::availability::{DateRange, OccupancyScope, SourceKind};
use crate::services::catalog::ApartmentCatalog;
use crate::services::reservation::{persist_failed, Reservations};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::get().to(my_bookings))
            .route("/my", web::get().to(my_bookings))
            .route("", web::post().to(create_booking))
            .route("/{id}/confirm", web::put().to(confirm_booking))
            .route("/{id}/cancel", web::put().to(cancel_booking))
            .route("/{id}", web::delete().to(delete_booking)),
    );
}

async fn find_booking(store: &Store, id: &str) -> Result<Booking, ApiError> {
    let id = parse_object_id(id, "booking")?;
    store
        .bookings()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))
}

pub async fn my_bookings(
    store: web::Data<Store>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let cursor = store
        .bookings()
        .find(doc! { "user": user.id })
        .sort(doc! { "startDate": 1 })
        .await?;
    let bookings: Vec<Booking> = cursor.try_collect().await?;
    let related = store
        .related(bookings.iter().map(|booking| booking.apartment), [])
        .await?;
    let views: Vec<BookingView> = bookings.iter().map(|booking| BookingView::new(booking, &related)).collect();
    Ok(HttpResponse::Ok().json(views))
}

pub async fn create_booking(
    store: web::Data<Store>,
    catalog: web::Data<dyn ApartmentCatalog>,
    reservations: web::Data<Reservations>,
    user: AuthenticatedUser,
    request: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    let apartment_id = parse_object_id(&request.apartment_id, "apartment")?;
    let stay = DateRange::parse(&request.start_date, &request.end_date)?;
    let apartment = find_apartment(catalog.get_ref(), &apartment_id).await?;

    let now = bson::DateTime::now();
    let paid = request.payment_status == PaymentStatus::Completed;
    let mut booking = Booking {
        id: None,
        apartment: apartment_id,
        user: user.id,
        start_date: stay.start_bson(),
        end_date: stay.end_bson(),
        total_price: request
            .total_price
            .unwrap_or_else(|| apartment.price_per_night * stay.nights() as f64),
        status: if paid {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        },
        payment_method: request.payment_method,
        payment_status: request.payment_status,
        payment_id: request.payment_id,
        payment_date: paid.then_some(now),
        confirmed_at: paid.then_some(now),
        cancelled_at: None,
        cancellation_reason: None,
        notes: request.notes,
        created_at: now,
        updated_at: now,
    };

    let collection = store.bookings();
    let inserted = reservations
        .reserve(OccupancyScope::Apartment(apartment_id), &stay, None, || async {
            collection
                .insert_one(&booking)
                .await
                .map_err(|err| persist_failed(SourceKind::Booking, err))
        })
        .await
        .map_err(|err| {
            ApiError::from_write(
                err,
                "This apartment is already booked for the selected dates",
                "conflictingBooking",
            )
        })?;

    booking.id = inserted.inserted_id.as_object_id();
    info!("Booking {:?} created for apartment {} ({})", booking.id, apartment_id, stay);

    let message = if paid {
        "Booking confirmed successfully"
    } else {
        "Booking created successfully. Please complete the payment."
    };
    let mut related = Related::default();
    related.add_apartment(&apartment);
    Ok(HttpResponse::Created().json(WithMessage {
        record: BookingView::new(&booking, &related),
        message,
    }))
}

pub async fn delete_booking(
    store: web::Data<Store>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let booking = find_booking(&store, &path.into_inner()).await?;
    if booking.user != user.id {
        return Err(ApiError::Forbidden("Not allowed".to_string()));
    }

    store.bookings().delete_one(doc! { "_id": booking.id }).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Deleted" })))
}

pub async fn confirm_booking(
    store: web::Data<Store>,
    catalog: web::Data<dyn ApartmentCatalog>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let mut booking = find_booking(&store, &path.into_inner()).await?;
    let apartment = find_apartment(catalog.get_ref(), &booking.apartment).await?;
    if !apartment.is_owned_by(&user.id) && !user.is_admin() {
        return Err(ApiError::Forbidden("Not authorized to confirm this booking".to_string()));
    }
    // A cancelled booking released its days; confirming it would skip the conflict check.
    if !booking.status.occupies() {
        return Err(ApiError::BadRequest(format!(
            "A {} booking cannot be confirmed",
            booking.status.as_str()
        )));
    }

    let now = bson::DateTime::now();
    booking.status = BookingStatus::Confirmed;
    booking.confirmed_at = Some(now);
    booking.updated_at = now;
    store
        .bookings()
        .update_one(
            doc! { "_id": booking.id },
            doc! { "$set": { "status": booking.status.as_str(), "confirmedAt": now, "updatedAt": now } },
        )
        .await?;

    let mut related = Related::default();
    related.add_apartment(&apartment);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Booking confirmed",
        "booking": BookingView::new(&booking, &related),
    })))
}

pub async fn cancel_booking(
    store: web::Data<Store>,
    catalog: web::Data<dyn ApartmentCatalog>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    request: Option<web::Json<CancelBookingRequest>>,
) -> Result<HttpResponse, ApiError> {
    let mut booking = find_booking(&store, &path.into_inner()).await?;
    // The listing may be gone; the guest can still cancel their own booking.
    let apartment = catalog.find(&booking.apartment).await?;
    let owns_listing = apartment.as_ref().is_some_and(|listing| listing.is_owned_by(&user.id));
    if booking.user != user.id && !user.is_admin() && !owns_listing {
        return Err(ApiError::Forbidden("Not authorized to cancel this booking".to_string()));
    }
    if booking.status == BookingStatus::Cancelled {
        return Err(ApiError::BadRequest("Booking is already cancelled".to_string()));
    }

    let reason = request.and_then(|body| body.into_inner().reason);
    let now = bson::DateTime::now();
    booking.status = BookingStatus::Cancelled;
    booking.cancelled_at = Some(now);
    booking.cancellation_reason = reason.clone();
    booking.updated_at = now;
    store
        .bookings()
        .update_one(
            doc! { "_id": booking.id },
            doc! { "$set": {
                "status": booking.status.as_str(),
                "cancelledAt": now,
                "cancellationReason": reason,
                "updatedAt": now,
            } },
        )
        .await?;
    info!("Booking {:?} cancelled by {}", booking.id, user.id);

    let mut related = Related::default();
    if let Some(listing) = &apartment {
        related.add_apartment(listing);
    }
    Ok(HttpResponse::Ok().json(json!({
        "message": "Booking cancelled",
        "booking": BookingView::new(&booking, &related),
    })))
}
