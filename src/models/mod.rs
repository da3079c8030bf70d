use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use self::apartment::{Apartment, ApartmentSummary};
use self::user::{User, UserSummary};

pub mod apartment;
pub mod availability;
pub mod blocked_date;
pub mod booking;
pub mod user;

/// A referenced record: its summary when it was loaded, otherwise its hex id.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Populated<T> {
    Id(String),
    Record(T),
}

/// Records referenced by the views of one response.
#[derive(Debug, Default)]
pub struct Related {
    apartments: HashMap<ObjectId, ApartmentSummary>,
    users: HashMap<ObjectId, UserSummary>,
}

impl Related {
    pub fn add_apartment(&mut self, apartment: &Apartment) {
        if let Some(id) = apartment.id {
            self.apartments.insert(id, ApartmentSummary::from(apartment));
        }
    }

    pub fn add_user(&mut self, user: &User) {
        if let Some(id) = user.id {
            self.users.insert(id, UserSummary::from(user));
        }
    }

    pub fn apartment(&self, id: &ObjectId) -> Populated<ApartmentSummary> {
        match self.apartments.get(id) {
            Some(summary) => Populated::Record(summary.clone()),
            None => Populated::Id(id.to_hex()),
        }
    }

    pub fn user(&self, id: &ObjectId) -> Populated<UserSummary> {
        match self.users.get(id) {
            Some(summary) => Populated::Record(summary.clone()),
            None => Populated::Id(id.to_hex()),
        }
    }
}

/// A record's fields at the top level next to a `message`.
#[derive(Debug, Serialize)]
pub struct WithMessage<T> {
    #[serde(flatten)]
    pub record: T,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apartment() -> Apartment {
        Apartment {
            id: Some(ObjectId::new()),
            owner: ObjectId::new(),
            title: "Loft".to_string(),
            location: "Zagreb".to_string(),
            price_per_night: 60.0,
            description: None,
            created_at: bson::DateTime::now(),
            updated_at: bson::DateTime::now(),
        }
    }

    #[test]
    fn unloaded_references_render_as_ids() {
        let id = ObjectId::new();
        let json = serde_json::to_value(Related::default().apartment(&id)).unwrap();
        assert_eq!(json, serde_json::json!(id.to_hex()));
    }

    #[test]
    fn loaded_references_render_their_summary() {
        let listing = apartment();
        let mut related = Related::default();
        related.add_apartment(&listing);

        let json = serde_json::to_value(related.apartment(&listing.id.unwrap())).unwrap();
        assert_eq!(json["_id"], listing.id.unwrap().to_hex());
        assert_eq!(json["title"], "Loft");
        assert_eq!(json["location"], "Zagreb");
    }

    #[test]
    fn message_sits_beside_the_record_fields() {
        let listing = apartment();
        let json = serde_json::to_value(WithMessage {
            record: ApartmentSummary::from(&listing),
            message: "Saved",
        })
        .unwrap();

        assert_eq!(json["_id"], listing.id.unwrap().to_hex());
        assert_eq!(json["title"], "Loft");
        assert_eq!(json["message"], "Saved");
    }
}
