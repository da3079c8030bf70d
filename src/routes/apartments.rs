use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use log::info;
use mongodb::bson::{doc, oid::ObjectId, Document};

use crate::db::mongo::Store;
use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::apartment::{Apartment, ApartmentInput, ApartmentUpdate, ApartmentView, UnavailableDates};
use crate::models::availability::WindowQuery;
use crate::routes::parse_object_id;
use crate::services::availability::DateRange;
use crate::services::catalog::ApartmentCatalog;
use crate::services::reservation::Reservations;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/apartments")
            .route("", web::get().to(list_apartments))
            .route("", web::post().to(create_apartment))
            .route("/{id}/unavailable-dates", web::get().to(unavailable_dates))
            .route("/{id}", web::get().to(get_apartment))
            .route("/{id}", web::put().to(update_apartment))
            .route("/{id}", web::delete().to(delete_apartment)),
    );
}

pub(crate) async fn find_apartment(catalog: &dyn ApartmentCatalog, id: &ObjectId) -> Result<Apartment, ApiError> {
    catalog
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Apartment not found".to_string()))
}

fn require_owner_or_admin(apartment: &Apartment, user: &AuthenticatedUser) -> Result<(), ApiError> {
    if apartment.is_owned_by(&user.id) || user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not allowed".to_string()))
    }
}

fn validate_listing(title: &str, location: &str, price_per_night: f64) -> Result<(), ApiError> {
    if title.trim().is_empty() || location.trim().is_empty() {
        return Err(ApiError::BadRequest("Title and location are required".to_string()));
    }
    if !price_per_night.is_finite() || price_per_night < 0.0 {
        return Err(ApiError::BadRequest("Price per night must be a positive number".to_string()));
    }
    Ok(())
}

pub async fn list_apartments(store: web::Data<Store>) -> Result<HttpResponse, ApiError> {
    let cursor = store.apartments().find(doc! {}).sort(doc! { "createdAt": -1 }).await?;
    let apartments: Vec<Apartment> = cursor.try_collect().await?;
    let views: Vec<ApartmentView> = apartments.iter().map(ApartmentView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

pub async fn get_apartment(
    catalog: web::Data<dyn ApartmentCatalog>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id(&path.into_inner(), "apartment")?;
    let apartment = find_apartment(catalog.get_ref(), &id).await?;
    Ok(HttpResponse::Ok().json(ApartmentView::from(&apartment)))
}

pub async fn create_apartment(
    store: web::Data<Store>,
    user: AuthenticatedUser,
    input: web::Json<ApartmentInput>,
) -> Result<HttpResponse, ApiError> {
    let input = input.into_inner();
    validate_listing(&input.title, &input.location, input.price_per_night)?;

    let now = bson::DateTime::now();
    let mut apartment = Apartment {
        id: None,
        owner: user.id,
        title: input.title.trim().to_string(),
        location: input.location.trim().to_string(),
        price_per_night: input.price_per_night,
        description: input.description,
        created_at: now,
        updated_at: now,
    };

    let result = store.apartments().insert_one(&apartment).await?;
    apartment.id = result.inserted_id.as_object_id();
    info!("Apartment {:?} listed by {}", apartment.id, user.id);

    Ok(HttpResponse::Created().json(ApartmentView::from(&apartment)))
}

pub async fn update_apartment(
    store: web::Data<Store>,
    catalog: web::Data<dyn ApartmentCatalog>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    input: web::Json<ApartmentUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id(&path.into_inner(), "apartment")?;
    let mut apartment = find_apartment(catalog.get_ref(), &id).await?;
    require_owner_or_admin(&apartment, &user)?;

    let update = input.into_inner();
    if let Some(title) = update.title {
        apartment.title = title.trim().to_string();
    }
    if let Some(location) = update.location {
        apartment.location = location.trim().to_string();
    }
    if let Some(price) = update.price_per_night {
        apartment.price_per_night = price;
    }
    if update.description.is_some() {
        apartment.description = update.description;
    }
    validate_listing(&apartment.title, &apartment.location, apartment.price_per_night)?;
    apartment.updated_at = bson::DateTime::now();

    let mut set = Document::new();
    set.insert("title", apartment.title.clone());
    set.insert("location", apartment.location.clone());
    set.insert("pricePerNight", apartment.price_per_night);
    set.insert("description", apartment.description.clone());
    set.insert("updatedAt", apartment.updated_at);

    store
        .apartments()
        .update_one(doc! { "_id": apartment.id }, doc! { "$set": set })
        .await?;

    Ok(HttpResponse::Ok().json(ApartmentView::from(&apartment)))
}

pub async fn delete_apartment(
    store: web::Data<Store>,
    catalog: web::Data<dyn ApartmentCatalog>,
    reservations: web::Data<Reservations>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id(&path.into_inner(), "apartment")?;
    let apartment = find_apartment(catalog.get_ref(), &id).await?;
    require_owner_or_admin(&apartment, &user)?;

    store.apartments().delete_one(doc! { "_id": id }).await?;
    // Blocks scoped to a deleted apartment can never apply again; bookings stay as history.
    store.availabilities().delete_many(doc! { "apartment": id }).await?;
    store.blocked_dates().delete_many(doc! { "apartment": id }).await?;
    reservations.forget_apartment(&id);
    info!("Apartment {} deleted by {}", id, user.id);

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Deleted" })))
}

pub async fn unavailable_dates(
    reservations: web::Data<Reservations>,
    path: web::Path<String>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse, ApiError> {
    let apartment_id = parse_object_id(&path.into_inner(), "apartment")?;
    let engine = reservations.engine();

    let days = match (&query.start_date, &query.end_date) {
        (Some(start), Some(end)) => {
            let window = DateRange::parse(start, end)?;
            engine.unavailable_days_within(apartment_id, &window).await?
        }
        (None, None) => engine.unavailable_days(apartment_id).await?,
        _ => {
            return Err(ApiError::BadRequest(
                "Both startDate and endDate are required to filter".to_string(),
            ))
        }
    };

    Ok(HttpResponse::Ok().json(UnavailableDates {
        apartment_id: apartment_id.to_hex(),
        unavailable_dates: days.iter().map(|day| day.format("%Y-%m-%d").to_string()).collect(),
    }))
}
