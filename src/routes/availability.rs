use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use log::info;
use mongodb::bson::{doc, Document};
use serde_json::json;

use crate::db::mongo::Store;
use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::availability::{
    AvailabilityBlock, AvailabilityCheck, AvailabilityView, BlockRequest, UpdateBlockRequest, WindowQuery,
};
use crate::models::{Related, WithMessage};
use crate::routes::apartments::find_apartment;
use crate::routes::parse_object_id;
use crate::services::availability::interval::parse_day;
use crate::services::availability::{DateRange, OccupancyScope, SourceKind};
use crate::services::catalog::ApartmentCatalog;
use crate::services::reservation::{persist_failed, Reservations};

const OVERLAP_MESSAGE: &str = "Dates overlap with existing availability period";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/availability")
            .route("/apartment/{id}", web::get().to(apartment_blocks))
            .route("/check/{id}", web::get().to(check_availability))
            .route("/block", web::post().to(block_dates))
            .route("/admin/all", web::get().to(all_blocks))
            .route("/{id}", web::put().to(update_block))
            .route("/{id}", web::delete().to(unblock_dates)),
    );
}

async fn find_block(store: &Store, id: &str) -> Result<AvailabilityBlock, ApiError> {
    let id = parse_object_id(id, "availability")?;
    store
        .availabilities()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Availability period not found".to_string()))
}

/// Owner, admin, or whoever created the block may edit it.
async fn require_block_manager(
    catalog: &dyn ApartmentCatalog,
    block: &AvailabilityBlock,
    user: &AuthenticatedUser,
    action: &str,
) -> Result<(), ApiError> {
    if user.is_admin() || block.created_by == user.id {
        return Ok(());
    }
    match catalog.find(&block.apartment).await? {
        Some(apartment) if apartment.is_owned_by(&user.id) => Ok(()),
        _ => Err(ApiError::Forbidden(format!("Not authorized to {}", action))),
    }
}

pub async fn apartment_blocks(
    store: web::Data<Store>,
    path: web::Path<String>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse, ApiError> {
    let apartment_id = parse_object_id(&path.into_inner(), "apartment")?;

    let mut filter = doc! { "apartment": apartment_id, "isAvailable": false };
    if let (Some(start), Some(end)) = (&query.start_date, &query.end_date) {
        let window = DateRange::parse(start, end)?;
        filter.insert("startDate", doc! { "$lt": window.end_bson() });
        filter.insert("endDate", doc! { "$gt": window.start_bson() });
    }

    let cursor = store.availabilities().find(filter).sort(doc! { "startDate": 1 }).await?;
    let blocks: Vec<AvailabilityBlock> = cursor.try_collect().await?;
    let related = store.related([], blocks.iter().map(|block| block.created_by)).await?;
    let views: Vec<AvailabilityView> = blocks.iter().map(|block| AvailabilityView::new(block, &related)).collect();
    Ok(HttpResponse::Ok().json(views))
}

pub async fn check_availability(
    reservations: web::Data<Reservations>,
    path: web::Path<String>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse, ApiError> {
    let apartment_id = parse_object_id(&path.into_inner(), "apartment")?;
    let (start, end) = match (&query.start_date, &query.end_date) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(ApiError::BadRequest(
                "Start date and end date are required".to_string(),
            ))
        }
    };

    let available = reservations.engine().check(apartment_id, start, end).await?;

    Ok(HttpResponse::Ok().json(AvailabilityCheck {
        available,
        apartment_id: apartment_id.to_hex(),
        start_date: start.clone(),
        end_date: end.clone(),
    }))
}

pub async fn block_dates(
    store: web::Data<Store>,
    catalog: web::Data<dyn ApartmentCatalog>,
    reservations: web::Data<Reservations>,
    user: AuthenticatedUser,
    request: web::Json<BlockRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    let apartment_id = parse_object_id(&request.apartment_id, "apartment")?;
    let range = DateRange::parse(&request.start_date, &request.end_date)?;

    let apartment = find_apartment(catalog.get_ref(), &apartment_id).await?;
    if !apartment.is_owned_by(&user.id) && !user.is_admin() {
        return Err(ApiError::Forbidden(
            "Not authorized to block dates for this apartment".to_string(),
        ));
    }

    let now = bson::DateTime::now();
    let mut block = AvailabilityBlock {
        id: None,
        apartment: apartment_id,
        start_date: range.start_bson(),
        end_date: range.end_bson(),
        is_available: false,
        reason: request.reason,
        notes: request.notes,
        created_by: user.id,
        created_at: now,
        updated_at: now,
    };

    let collection = store.availabilities();
    let inserted = reservations
        .reserve(OccupancyScope::Apartment(apartment_id), &range, None, || async {
            collection
                .insert_one(&block)
                .await
                .map_err(|err| persist_failed(SourceKind::AvailabilityBlock, err))
        })
        .await
        .map_err(|err| ApiError::from_write(err, OVERLAP_MESSAGE, "conflictingPeriod"))?;

    block.id = inserted.inserted_id.as_object_id();
    info!("Apartment {} blocked for {} by {}", apartment_id, range, user.id);

    let mut related = store.related([], [user.id]).await?;
    related.add_apartment(&apartment);
    Ok(HttpResponse::Created().json(WithMessage {
        record: AvailabilityView::new(&block, &related),
        message: "Dates blocked successfully",
    }))
}

pub async fn update_block(
    store: web::Data<Store>,
    catalog: web::Data<dyn ApartmentCatalog>,
    reservations: web::Data<Reservations>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    request: web::Json<UpdateBlockRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut block = find_block(&store, &path.into_inner()).await?;
    require_block_manager(catalog.get_ref(), &block, &user, "update this availability period").await?;

    let request = request.into_inner();
    let current = DateRange::from_bson(block.start_date, block.end_date)?;
    let start = match &request.start_date {
        Some(value) => parse_day("startDate", value)?,
        None => current.start(),
    };
    let end = match &request.end_date {
        Some(value) => parse_day("endDate", value)?,
        None => current.end(),
    };
    let range = DateRange::new(start, end)?;

    if let Some(reason) = request.reason {
        block.reason = reason;
    }
    if request.notes.is_some() {
        block.notes = request.notes;
    }
    block.start_date = range.start_bson();
    block.end_date = range.end_bson();
    block.updated_at = bson::DateTime::now();

    let mut set = Document::new();
    set.insert("startDate", block.start_date);
    set.insert("endDate", block.end_date);
    set.insert("reason", bson::to_bson(&block.reason).map_err(|err| ApiError::Internal(err.to_string()))?);
    set.insert("notes", block.notes.clone());
    set.insert("updatedAt", block.updated_at);

    let collection = store.availabilities();
    reservations
        .reserve(OccupancyScope::Apartment(block.apartment), &range, block.id, || async {
            collection
                .update_one(doc! { "_id": block.id }, doc! { "$set": set })
                .await
                .map_err(|err| persist_failed(SourceKind::AvailabilityBlock, err))
        })
        .await
        .map_err(|err| ApiError::from_write(err, OVERLAP_MESSAGE, "conflictingPeriod"))?;

    let related = store.related([block.apartment], [block.created_by]).await?;
    Ok(HttpResponse::Ok().json(WithMessage {
        record: AvailabilityView::new(&block, &related),
        message: "Availability period updated successfully",
    }))
}

pub async fn unblock_dates(
    store: web::Data<Store>,
    catalog: web::Data<dyn ApartmentCatalog>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let block = find_block(&store, &path.into_inner()).await?;
    require_block_manager(catalog.get_ref(), &block, &user, "unblock these dates").await?;

    store.availabilities().delete_one(doc! { "_id": block.id }).await?;
    info!("Availability block {:?} removed by {}", block.id, user.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Dates unblocked successfully" })))
}

pub async fn all_blocks(
    store: web::Data<Store>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;

    let cursor = store
        .availabilities()
        .find(doc! { "isAvailable": false })
        .sort(doc! { "startDate": 1 })
        .await?;
    let blocks: Vec<AvailabilityBlock> = cursor.try_collect().await?;
    let related = store
        .related(
            blocks.iter().map(|block| block.apartment),
            blocks.iter().map(|block| block.created_by),
        )
        .await?;
    let views: Vec<AvailabilityView> = blocks.iter().map(|block| AvailabilityView::new(block, &related)).collect();
    Ok(HttpResponse::Ok().json(views))
}
