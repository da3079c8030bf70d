use std::collections::HashMap;

use log::error;
use stripe::{CreatePaymentIntent, Currency, PaymentIntent};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("{0}")]
    Provider(String),
}

#[derive(Debug, Clone)]
pub struct PaymentIntentSummary {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
}

pub struct StripePayments {
    client: stripe::Client,
}

/// Converts a euro amount to the smallest currency unit.
pub fn to_cents(amount: f64) -> Result<i64, PaymentError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PaymentError::InvalidAmount);
    }
    let cents = (amount * 100.0).round() as i64;
    if cents <= 0 {
        return Err(PaymentError::InvalidAmount);
    }
    Ok(cents)
}

impl StripePayments {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: stripe::Client::new(api_key.into()),
        }
    }

    pub async fn create_payment_intent(
        &self,
        amount: f64,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntentSummary, PaymentError> {
        let mut create_intent = CreatePaymentIntent::new(to_cents(amount)?, Currency::EUR);
        create_intent.metadata = Some(metadata);

        match PaymentIntent::create(&self.client, create_intent).await {
            Ok(intent) => Ok(PaymentIntentSummary {
                client_secret: intent.client_secret,
                payment_intent_id: intent.id.to_string(),
            }),
            Err(err) => {
                error!("Error creating payment intent: {:?}", err);
                Err(PaymentError::Provider(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euros_convert_to_cents() {
        assert_eq!(to_cents(120.5).unwrap(), 12050);
        assert_eq!(to_cents(0.016).unwrap(), 2);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(to_cents(0.0).is_err());
        assert!(to_cents(-3.0).is_err());
        assert!(to_cents(f64::NAN).is_err());
        assert!(to_cents(0.001).is_err());
    }
}
