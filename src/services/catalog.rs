use std::sync::RwLock;

use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection,
};

use crate::models::apartment::Apartment;

/// Lookup of apartment listings by id, used by the write paths before they
/// reserve any days.
#[async_trait]
pub trait ApartmentCatalog: Send + Sync {
    async fn find(&self, id: &ObjectId) -> Result<Option<Apartment>, mongodb::error::Error>;
}

pub struct MongoCatalog {
    apartments: Collection<Apartment>,
}

impl MongoCatalog {
    pub fn new(apartments: Collection<Apartment>) -> Self {
        Self { apartments }
    }
}

#[async_trait]
impl ApartmentCatalog for MongoCatalog {
    async fn find(&self, id: &ObjectId) -> Result<Option<Apartment>, mongodb::error::Error> {
        self.apartments.find_one(doc! { "_id": *id }).await
    }
}

#[derive(Default)]
pub struct MemoryCatalog {
    apartments: RwLock<Vec<Apartment>>,
}

impl MemoryCatalog {
    pub fn new(apartments: Vec<Apartment>) -> Self {
        Self {
            apartments: RwLock::new(apartments),
        }
    }

    pub fn push(&self, apartment: Apartment) {
        let mut apartments = self.apartments.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        apartments.push(apartment);
    }
}

#[async_trait]
impl ApartmentCatalog for MemoryCatalog {
    async fn find(&self, id: &ObjectId) -> Result<Option<Apartment>, mongodb::error::Error> {
        let apartments = self.apartments.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(apartments.iter().find(|apartment| apartment.id.as_ref() == Some(id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(owner: ObjectId) -> Apartment {
        Apartment {
            id: Some(ObjectId::new()),
            owner,
            title: "Sea view".to_string(),
            location: "Split".to_string(),
            price_per_night: 80.0,
            description: None,
            created_at: bson::DateTime::now(),
            updated_at: bson::DateTime::now(),
        }
    }

    #[test]
    fn memory_catalog_finds_by_id() {
        let owner = ObjectId::new();
        let apartment = listing(owner);
        let id = apartment.id.unwrap();
        let catalog = MemoryCatalog::default();
        catalog.push(apartment);

        let found = tokio_test::block_on(catalog.find(&id)).unwrap();
        assert!(found.map(|apartment| apartment.is_owned_by(&owner)).unwrap_or(false));
        assert!(tokio_test::block_on(catalog.find(&ObjectId::new())).unwrap().is_none());
    }
}
