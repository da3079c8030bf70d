use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use log::info;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::options::ReturnDocument;
use serde_json::json;

use crate::config::AppConfig;
use crate::db::mongo::Store;
use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::user::{LoginInput, ProfileUpdate, RegisterInput, TokenResponse, User, UserRole, UserView};
use crate::routes::parse_object_id;
use crate::services::account_service::{
    hash_password, is_valid_email, issue_token, validate_password, verify_password,
};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/me", web::get().to(me))
            .route("/profile", web::put().to(update_profile))
            .route("/promote/{id}", web::put().to(promote_to_admin))
            .route("", web::get().to(list_users)),
    );
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. }))
    )
}

fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    Ok(email)
}

pub async fn register(
    store: web::Data<Store>,
    config: web::Data<AppConfig>,
    input: web::Json<RegisterInput>,
) -> Result<HttpResponse, ApiError> {
    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    let email = normalize_email(&input.email)?;
    validate_password(&input.password)?;

    let now = bson::DateTime::now();
    let user = User {
        id: None,
        name: input.name.trim().to_string(),
        email,
        password_hash: hash_password(&input.password)?,
        role: UserRole::User,
        created_at: now,
        updated_at: now,
    };

    let inserted = match store.users().insert_one(&user).await {
        Ok(result) => result,
        Err(err) if is_duplicate_key(&err) => {
            return Err(ApiError::BadRequest("User already exists".to_string()))
        }
        Err(err) => return Err(err.into()),
    };
    let user_id = inserted
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::Internal("Failed to create user".to_string()))?;

    info!("Registered user {}", user_id);
    let token = issue_token(&config, &user.email, user_id, user.role)?;
    Ok(HttpResponse::Created().json(TokenResponse { token }))
}

pub async fn login(
    store: web::Data<Store>,
    config: web::Data<AppConfig>,
    input: web::Json<LoginInput>,
) -> Result<HttpResponse, ApiError> {
    let input = input.into_inner();
    let email = input.email.trim().to_lowercase();

    let user = store.users().find_one(doc! { "email": &email }).await?;
    let user = match user {
        Some(user) if verify_password(&input.password, &user.password_hash) => user,
        _ => return Err(ApiError::BadRequest("Invalid credentials".to_string())),
    };
    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("User record has no id".to_string()))?;

    let token = issue_token(&config, &user.email, user_id, user.role)?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

pub async fn me(store: web::Data<Store>, user: AuthenticatedUser) -> Result<HttpResponse, ApiError> {
    let record = store
        .users()
        .find_one(doc! { "_id": user.id })
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::Ok().json(UserView::from(&record)))
}

pub async fn update_profile(
    store: web::Data<Store>,
    user: AuthenticatedUser,
    input: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    let input = input.into_inner();
    let mut set = Document::new();

    if let Some(name) = input.name.filter(|name| !name.trim().is_empty()) {
        set.insert("name", name.trim());
    }
    if let Some(email) = input.email.filter(|email| !email.trim().is_empty()) {
        set.insert("email", normalize_email(&email)?);
    }
    if let Some(password) = input.password.filter(|password| !password.is_empty()) {
        validate_password(&password)?;
        set.insert("passwordHash", hash_password(&password)?);
    }
    set.insert("updatedAt", bson::DateTime::now());

    let updated = match store
        .users()
        .find_one_and_update(doc! { "_id": user.id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await
    {
        Ok(updated) => updated,
        Err(err) if is_duplicate_key(&err) => {
            return Err(ApiError::BadRequest("Email already in use".to_string()))
        }
        Err(err) => return Err(err.into()),
    };

    let updated = updated.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::Ok().json(UserView::from(&updated)))
}

pub async fn list_users(store: web::Data<Store>, user: AuthenticatedUser) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;

    let cursor = store.users().find(doc! {}).sort(doc! { "createdAt": -1 }).await?;
    let users: Vec<User> = cursor.try_collect().await?;
    let views: Vec<UserView> = users.iter().map(UserView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

pub async fn promote_to_admin(
    store: web::Data<Store>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let target = parse_object_id(&path.into_inner(), "user")?;

    let promoted = store
        .users()
        .find_one_and_update(
            doc! { "_id": target },
            doc! { "$set": { "role": UserRole::Admin.as_str(), "updatedAt": bson::DateTime::now() } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!("User {} promoted to admin by {}", target, user.id);
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("User {} has been promoted to admin", promoted.name),
        "user": UserView::from(&promoted),
    })))
}
