use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Apartment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner: ObjectId,
    pub title: String,
    pub location: String,
    pub price_per_night: f64,
    pub description: Option<String>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

impl Apartment {
    pub fn is_owned_by(&self, user_id: &ObjectId) -> bool {
        &self.owner == user_id
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentInput {
    pub title: String,
    pub location: String,
    pub price_per_night: f64,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentUpdate {
    pub title: Option<String>,
    pub location: Option<String>,
    pub price_per_night: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentView {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner: String,
    pub title: String,
    pub location: String,
    pub price_per_night: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Apartment> for ApartmentView {
    fn from(apartment: &Apartment) -> Self {
        ApartmentView {
            id: apartment.id.map(|id| id.to_hex()).unwrap_or_default(),
            owner: apartment.owner.to_hex(),
            title: apartment.title.clone(),
            location: apartment.location.clone(),
            price_per_night: apartment.price_per_night,
            description: apartment.description.clone(),
            created_at: apartment.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApartmentSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub location: String,
}

impl From<&Apartment> for ApartmentSummary {
    fn from(apartment: &Apartment) -> Self {
        ApartmentSummary {
            id: apartment.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: apartment.title.clone(),
            location: apartment.location.clone(),
        }
    }
}

/// Response of `GET /apartments/{id}/unavailable-dates`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableDates {
    pub apartment_id: String,
    pub unavailable_dates: Vec<String>,
}
