use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, Error, FromRequest, HttpMessage, HttpRequest};
use mongodb::bson::oid::ObjectId;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::middleware::auth::{claims_from_request, Claims};
use crate::models::user::UserRole;

/// The caller behind a valid bearer token. Uses the claims `AuthMiddleware`
/// stored when present, otherwise validates the header itself.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: ObjectId,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = ObjectId::parse_str(&claims.user_id)
            .map_err(|_| ApiError::Unauthorized("Token expired or invalid".to_string()))?;
        Ok(AuthenticatedUser {
            id,
            email: claims.sub,
            role: claims.role,
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = match req.extensions().get::<Claims>().cloned() {
            Some(claims) => Ok(claims),
            None => claims_from_request(req.headers(), req.app_data::<web::Data<AppConfig>>()),
        };

        ready(
            claims
                .and_then(AuthenticatedUser::try_from)
                .map_err(Error::from),
        )
    }
}
