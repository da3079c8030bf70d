use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::apartment::ApartmentSummary;
use super::user::UserSummary;
use super::{Populated, Related};

/// An admin-declared closure. `apartment: None` applies to every apartment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedDate {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub start_date: bson::DateTime,
    pub end_date: bson::DateTime,
    pub reason: String,
    // Stored as null for global blocks, never omitted.
    pub apartment: Option<ObjectId>,
    pub created_by: ObjectId,
    pub created_at: bson::DateTime,
}

impl BlockedDate {
    pub fn is_global(&self) -> bool {
        self.apartment.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockedDateRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub reason: Option<String>,
    pub apartment_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedDateView {
    #[serde(rename = "_id")]
    pub id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    pub apartment: Option<Populated<ApartmentSummary>>,
    pub created_by: Populated<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl BlockedDateView {
    pub fn new(block: &BlockedDate, related: &Related) -> Self {
        BlockedDateView {
            id: block.id.map(|id| id.to_hex()).unwrap_or_default(),
            start_date: block.start_date.to_chrono(),
            end_date: block.end_date.to_chrono(),
            reason: block.reason.clone(),
            apartment: block.apartment.map(|id| related.apartment(&id)),
            created_by: related.user(&block.created_by),
            created_at: block.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedCheck {
    pub is_blocked: bool,
    pub blocked_date: Option<BlockedDateView>,
}
