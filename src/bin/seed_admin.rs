//! Creates the first administrator, or promotes an existing account.
//!
//! Reads `ADMIN_EMAIL`, `ADMIN_PASSWORD` and optionally `ADMIN_NAME` next to
//! the server's own variables. Running it again changes nothing.

use std::{env, io, process};

use env_logger::Env;
use log::{error, info};
use mongodb::bson::doc;

use apartment_booking_api::config::AppConfig;
use apartment_booking_api::db;
use apartment_booking_api::models::user::{User, UserRole};
use apartment_booking_api::services::account_service::{hash_password, is_valid_email, validate_password};

#[derive(Debug, PartialEq, Eq)]
enum SeedOutcome {
    Created,
    Promoted,
    AlreadyAdmin,
}

async fn seed(config: &AppConfig, email: &str, password: &str, name: &str) -> io::Result<SeedOutcome> {
    let store = db::mongo::connect(&config.mongodb_uri, &config.database_name)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let users = store.users();

    let existing = users
        .find_one(doc! { "email": email })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    match existing {
        Some(user) if user.role == UserRole::Admin => Ok(SeedOutcome::AlreadyAdmin),
        Some(_) => {
            users
                .update_one(
                    doc! { "email": email },
                    doc! { "$set": { "role": UserRole::Admin.as_str(), "updatedAt": bson::DateTime::now() } },
                )
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            Ok(SeedOutcome::Promoted)
        }
        None => {
            validate_password(password).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
            let password_hash =
                hash_password(password).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            let now = bson::DateTime::now();
            users
                .insert_one(User {
                    id: None,
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash,
                    role: UserRole::Admin,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            Ok(SeedOutcome::Created)
        }
    }
}

#[actix_web::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let email = env::var("ADMIN_EMAIL").unwrap_or_default().trim().to_lowercase();
    let password = env::var("ADMIN_PASSWORD").unwrap_or_default();
    let name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());

    if !is_valid_email(&email) {
        error!("ADMIN_EMAIL must be set to a valid email address");
        process::exit(1);
    }

    match seed(&config, &email, &password, &name).await {
        Ok(SeedOutcome::Created) => info!("Created admin user {}", email),
        Ok(SeedOutcome::Promoted) => info!("Promoted {} to admin", email),
        Ok(SeedOutcome::AlreadyAdmin) => info!("{} is already an admin; nothing to do", email),
        Err(e) => {
            error!("Failed to seed admin: {}", e);
            process::exit(1);
        }
    }
}
