use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use log::{info, warn};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion},
    Client, Collection, Database, IndexModel,
};

use crate::models::{
    apartment::Apartment, availability::AvailabilityBlock, blocked_date::BlockedDate, booking::Booking,
    user::User, Related,
};
use crate::services::availability::{mongo::MongoSource, AvailabilityEngine};

pub async fn create_mongo_client(uri: &str) -> Result<Client, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    Client::with_options(client_options)
}

/// Typed handles on the collections the service uses.
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    pub fn new(client: &Client, database_name: &str) -> Self {
        Self {
            db: client.database(database_name),
        }
    }

    pub async fn ping(&self) -> Result<(), mongodb::error::Error> {
        self.db.run_command(doc! { "ping": 1 }).await.map(|_| ())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn apartments(&self) -> Collection<Apartment> {
        self.db.collection("apartments")
    }

    pub fn bookings(&self) -> Collection<Booking> {
        self.db.collection("bookings")
    }

    pub fn availabilities(&self) -> Collection<AvailabilityBlock> {
        self.db.collection("availabilities")
    }

    pub fn blocked_dates(&self) -> Collection<BlockedDate> {
        self.db.collection("blockeddates")
    }

    /// Loads the apartments and users a set of views refers to.
    pub async fn related(
        &self,
        apartment_ids: impl IntoIterator<Item = ObjectId>,
        user_ids: impl IntoIterator<Item = ObjectId>,
    ) -> Result<Related, mongodb::error::Error> {
        let mut related = Related::default();

        let mut apartment_ids: Vec<ObjectId> = apartment_ids.into_iter().collect();
        apartment_ids.sort();
        apartment_ids.dedup();
        if !apartment_ids.is_empty() {
            let cursor = self.apartments().find(doc! { "_id": { "$in": apartment_ids } }).await?;
            let apartments: Vec<Apartment> = cursor.try_collect().await?;
            apartments.iter().for_each(|apartment| related.add_apartment(apartment));
        }

        let mut user_ids: Vec<ObjectId> = user_ids.into_iter().collect();
        user_ids.sort();
        user_ids.dedup();
        if !user_ids.is_empty() {
            let cursor = self.users().find(doc! { "_id": { "$in": user_ids } }).await?;
            let users: Vec<User> = cursor.try_collect().await?;
            users.iter().for_each(|user| related.add_user(user));
        }

        Ok(related)
    }

    /// Engine reading the three occupancy collections of this database.
    pub fn availability_engine(&self) -> AvailabilityEngine {
        AvailabilityEngine::new(
            Arc::new(MongoSource::new(self.bookings())),
            Arc::new(MongoSource::new(self.availabilities())),
            Arc::new(MongoSource::new(self.blocked_dates())),
        )
    }

    pub async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;

        self.bookings()
            .create_indexes([
                IndexModel::builder().keys(doc! { "user": 1 }).build(),
                IndexModel::builder().keys(doc! { "apartment": 1, "status": 1 }).build(),
                IndexModel::builder().keys(doc! { "startDate": 1, "endDate": 1 }).build(),
            ])
            .await?;

        self.availabilities()
            .create_indexes([
                IndexModel::builder()
                    .keys(doc! { "apartment": 1, "startDate": 1, "endDate": 1 })
                    .build(),
                IndexModel::builder().keys(doc! { "apartment": 1, "isAvailable": 1 }).build(),
            ])
            .await?;

        self.blocked_dates()
            .create_index(IndexModel::builder().keys(doc! { "apartment": 1, "startDate": 1 }).build())
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }
}

/// Connects and verifies the deployment answers a ping; a failed ping is only a warning.
pub async fn connect(uri: &str, database_name: &str) -> Result<Store, mongodb::error::Error> {
    let client = create_mongo_client(uri).await?;
    let store = Store::new(&client, database_name);

    match store.ping().await {
        Ok(_) => info!("Successfully connected to MongoDB and verified with ping command"),
        Err(e) => {
            warn!("Connected to MongoDB but ping test failed: {}", e);
            warn!("The API may still work, but some functionality might be impaired");
        }
    }

    Ok(store)
}
