use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use log::info;
use mongodb::bson::doc;
use serde_json::json;

use crate::db::mongo::Store;
use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::availability::WindowQuery;
use crate::models::blocked_date::{BlockedCheck, BlockedDate, BlockedDateView, CreateBlockedDateRequest};
use crate::models::Related;
use crate::routes::apartments::find_apartment;
use crate::routes::parse_object_id;
use crate::services::availability::engine::first_conflict;
use crate::services::availability::mongo::MongoRecord;
use crate::services::availability::source::OccupancyRecord;
use crate::services::availability::{DateRange, Occupancy, OccupancyScope, SourceKind};
use crate::services::catalog::ApartmentCatalog;
use crate::services::reservation::{persist_failed, Reservations};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/blocked-dates")
            .route("", web::get().to(list_blocked_dates))
            .route("", web::post().to(create_blocked_date))
            .route("/check/{id}", web::get().to(check_blocked))
            .route("/{id}", web::delete().to(delete_blocked_date)),
    );
}

pub async fn list_blocked_dates(
    store: web::Data<Store>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;

    let cursor = store.blocked_dates().find(doc! {}).sort(doc! { "startDate": 1 }).await?;
    let blocked: Vec<BlockedDate> = cursor.try_collect().await?;
    let related = store
        .related(
            blocked.iter().filter_map(|block| block.apartment),
            blocked.iter().map(|block| block.created_by),
        )
        .await?;
    let views: Vec<BlockedDateView> = blocked.iter().map(|block| BlockedDateView::new(block, &related)).collect();
    Ok(HttpResponse::Ok().json(views))
}

pub async fn create_blocked_date(
    store: web::Data<Store>,
    catalog: web::Data<dyn ApartmentCatalog>,
    reservations: web::Data<Reservations>,
    user: AuthenticatedUser,
    request: web::Json<CreateBlockedDateRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;

    let request = request.into_inner();
    let (start, end, reason) = match (&request.start_date, &request.end_date, &request.reason) {
        (Some(start), Some(end), Some(reason)) if !reason.trim().is_empty() => (start, end, reason),
        _ => {
            return Err(ApiError::BadRequest(
                "startDate, endDate and reason are required".to_string(),
            ))
        }
    };
    let apartment_id = match request.apartment_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Some(parse_object_id(id, "apartment")?),
        _ => None,
    };
    let range = DateRange::parse(start, end)?;

    let apartment = match apartment_id {
        Some(id) => Some(find_apartment(catalog.get_ref(), &id).await?),
        None => None,
    };

    let mut blocked = BlockedDate {
        id: None,
        start_date: range.start_bson(),
        end_date: range.end_bson(),
        reason: reason.trim().to_string(),
        apartment: apartment_id,
        created_by: user.id,
        created_at: bson::DateTime::now(),
    };

    let collection = store.blocked_dates();
    let inserted = reservations
        .reserve(OccupancyScope::for_apartment(apartment_id), &range, None, || async {
            collection
                .insert_one(&blocked)
                .await
                .map_err(|err| persist_failed(SourceKind::BlockedDate, err))
        })
        .await
        .map_err(|err| {
            ApiError::from_write(
                err,
                "These dates are already blocked or booked",
                "conflictingBlock",
            )
        })?;

    blocked.id = inserted.inserted_id.as_object_id();
    match apartment_id {
        Some(id) => info!("Blocked {} for apartment {}", range, id),
        None => info!("Blocked {} for every apartment", range),
    }

    let mut related = store.related([], [user.id]).await?;
    if let Some(apartment) = &apartment {
        related.add_apartment(apartment);
    }
    Ok(HttpResponse::Created().json(BlockedDateView::new(&blocked, &related)))
}

pub async fn delete_blocked_date(
    store: web::Data<Store>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let id = parse_object_id(&path.into_inner(), "blocked date")?;

    let removed = store.blocked_dates().find_one_and_delete(doc! { "_id": id }).await?;
    if removed.is_none() {
        return Err(ApiError::NotFound("Blocked date not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Blocked date removed" })))
}

/// First blocked date in `records` that covers a day of `range` for `scope`,
/// compared on the same calendar days the availability engine uses.
fn first_blocking<'a>(
    records: &'a [BlockedDate],
    scope: &OccupancyScope,
    range: &DateRange,
) -> Option<&'a BlockedDate> {
    let occupied: Vec<Occupancy> = records.iter().filter_map(|record| record.occupancy(scope)).collect();
    let conflict = first_conflict(&occupied, range, None)?;
    records.iter().find(|record| record.id.is_some() && record.id == conflict.record_id)
}

pub async fn check_blocked(
    store: web::Data<Store>,
    path: web::Path<String>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse, ApiError> {
    let apartment_id = parse_object_id(&path.into_inner(), "apartment")?;
    let range = match (&query.start_date, &query.end_date) {
        (Some(start), Some(end)) => DateRange::parse(start, end)?,
        _ => {
            return Err(ApiError::BadRequest(
                "startDate and endDate are required".to_string(),
            ))
        }
    };

    let scope = OccupancyScope::Apartment(apartment_id);
    let mut filter = BlockedDate::scope_filter(&scope);
    filter.insert("startDate", doc! { "$lt": range.end_bson() });
    filter.insert("endDate", doc! { "$gt": range.start_bson() });
    let cursor = store
        .blocked_dates()
        .find(filter)
        .sort(doc! { "startDate": 1 })
        .await?;
    let records: Vec<BlockedDate> = cursor.try_collect().await?;
    let blocked = first_blocking(&records, &scope, &range);

    Ok(HttpResponse::Ok().json(BlockedCheck {
        is_blocked: blocked.is_some(),
        blocked_date: blocked.map(|record| BlockedDateView::new(record, &Related::default())),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn holiday(apartment: Option<ObjectId>, start: &str, end: &str) -> BlockedDate {
        BlockedDate {
            id: Some(ObjectId::new()),
            start_date: bson::DateTime::parse_rfc3339_str(start).unwrap(),
            end_date: bson::DateTime::parse_rfc3339_str(end).unwrap(),
            reason: "Holidays".to_string(),
            apartment,
            created_by: ObjectId::new(),
            created_at: bson::DateTime::now(),
        }
    }

    #[test]
    fn partial_day_block_covers_its_whole_day() {
        let apartment = ObjectId::new();
        let records = vec![holiday(Some(apartment), "2024-06-01T10:00:00Z", "2024-06-01T20:00:00Z")];
        let scope = OccupancyScope::Apartment(apartment);

        let hit = first_blocking(&records, &scope, &DateRange::parse("2024-06-01", "2024-06-02").unwrap());
        assert_eq!(hit.and_then(|record| record.id), records[0].id);
        assert!(first_blocking(&records, &scope, &DateRange::parse("2024-06-02", "2024-06-03").unwrap()).is_none());
    }

    #[test]
    fn global_blocks_count_and_other_apartments_do_not() {
        let apartment = ObjectId::new();
        let records = vec![
            holiday(Some(ObjectId::new()), "2024-12-20T00:00:00Z", "2024-12-27T00:00:00Z"),
            holiday(None, "2024-12-24T00:00:00Z", "2024-12-26T00:00:00Z"),
        ];
        let scope = OccupancyScope::Apartment(apartment);

        let hit = first_blocking(&records, &scope, &DateRange::parse("2024-12-21", "2024-12-25").unwrap());
        assert_eq!(hit.and_then(|record| record.id), records[1].id);
        assert!(first_blocking(&records, &scope, &DateRange::parse("2024-12-20", "2024-12-24").unwrap()).is_none());
    }
}
