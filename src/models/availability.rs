use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::apartment::ApartmentSummary;
use super::user::UserSummary;
use super::{Populated, Related};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    Maintenance,
    PersonalUse,
    Renovation,
    #[default]
    Blocked,
    Other,
}

/// An owner- or admin-declared unavailable period for one apartment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityBlock {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub apartment: ObjectId,
    pub start_date: bson::DateTime,
    pub end_date: bson::DateTime,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub reason: BlockReason,
    pub notes: Option<String>,
    pub created_by: ObjectId,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub apartment_id: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub reason: BlockReason,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlockRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub reason: Option<BlockReason>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityCheck {
    pub available: bool,
    pub apartment_id: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityView {
    #[serde(rename = "_id")]
    pub id: String,
    pub apartment: Populated<ApartmentSummary>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_available: bool,
    pub reason: BlockReason,
    pub notes: Option<String>,
    pub created_by: Populated<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl AvailabilityView {
    pub fn new(block: &AvailabilityBlock, related: &Related) -> Self {
        AvailabilityView {
            id: block.id.map(|id| id.to_hex()).unwrap_or_default(),
            apartment: related.apartment(&block.apartment),
            start_date: block.start_date.to_chrono(),
            end_date: block.end_date.to_chrono(),
            is_available: block.is_available,
            reason: block.reason,
            notes: block.notes.clone(),
            created_by: related.user(&block.created_by),
            created_at: block.created_at.to_chrono(),
        }
    }
}
