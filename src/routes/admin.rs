use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::doc;
use serde_json::json;

use crate::db::mongo::Store;
use crate::error::ApiError;
use crate::middleware::auth::AuthMiddleware;
use crate::middleware::role_auth::RequireRole;
use crate::models::user::{User, UserRole, UserView};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(RequireRole::new(UserRole::Admin))
            .wrap(AuthMiddleware)
            .route("/users", web::get().to(admin_users))
            .route("/all-users", web::get().to(all_users)),
    );
}

pub async fn admin_users(store: web::Data<Store>) -> Result<HttpResponse, ApiError> {
    let cursor = store
        .users()
        .find(doc! { "role": UserRole::Admin.as_str() })
        .sort(doc! { "createdAt": -1 })
        .await?;
    let admins: Vec<User> = cursor.try_collect().await?;
    let total_users = store.users().count_documents(doc! {}).await?;
    let total_admins = admins.len() as u64;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "adminUsers": admins.iter().map(UserView::from).collect::<Vec<_>>(),
            "stats": {
                "totalAdmins": total_admins,
                "totalUsers": total_users,
                "regularUsers": total_users.saturating_sub(total_admins),
            }
        }
    })))
}

pub async fn all_users(store: web::Data<Store>) -> Result<HttpResponse, ApiError> {
    let cursor = store.users().find(doc! {}).sort(doc! { "createdAt": -1 }).await?;
    let users: Vec<User> = cursor.try_collect().await?;
    let views: Vec<UserView> = users.iter().map(UserView::from).collect();

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": views })))
}
