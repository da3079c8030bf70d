use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::services::payment::{PaymentError, StripePayments};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub amount: Option<f64>,
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments").route("/create-payment-intent", web::post().to(create_payment_intent)),
    );
}

pub async fn create_payment_intent(
    payments: Option<web::Data<StripePayments>>,
    user: AuthenticatedUser,
    request: web::Json<PaymentIntentRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    let amount = match (request.amount, request.payment_method_id.as_deref()) {
        (Some(amount), Some(method)) if !method.is_empty() => amount,
        _ => {
            return Err(ApiError::BadRequest(
                "Amount and payment method ID are required".to_string(),
            ))
        }
    };
    let payments = payments.ok_or(ApiError::PaymentUnavailable)?;

    let mut metadata = request.metadata;
    metadata.insert("userId".to_string(), user.id.to_hex());
    metadata.insert("email".to_string(), user.email.clone());

    let intent = payments
        .create_payment_intent(amount, metadata)
        .await
        .map_err(|err| match err {
            PaymentError::InvalidAmount => ApiError::BadRequest(err.to_string()),
            PaymentError::Provider(message) => ApiError::BadRequest(message),
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "clientSecret": intent.client_secret,
        "paymentIntentId": intent.payment_intent_id,
    })))
}
