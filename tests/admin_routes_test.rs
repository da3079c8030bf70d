mod common;

use actix_web::{http::StatusCode, test};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use mongodb::bson::oid::ObjectId;

use apartment_booking_api::middleware::auth::Claims;
use apartment_booking_api::models::user::UserRole;
use common::{TestApp, TEST_SECRET};

/// Status of a request to a middleware-guarded scope; middleware failures
/// surface as service errors rather than responses.
async fn admin_status(app: &TestApp, uri: &str, token: Option<String>) -> StatusCode {
    let service = test::init_service(app.create_app()).await;
    let mut req = test::TestRequest::get().uri(uri);
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {}", token)));
    }
    match test::try_call_service(&service, req.to_request()).await {
        Ok(resp) => resp.status(),
        Err(err) => err.error_response().status(),
    }
}

#[actix_rt::test]
async fn admin_routes_require_a_token() {
    let app = TestApp::new().await;
    assert_eq!(admin_status(&app, "/api/admin/users", None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(admin_status(&app, "/api/admin/all-users", None).await, StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn regular_users_are_forbidden() {
    let app = TestApp::new().await;
    let token = app.token_for(ObjectId::new(), UserRole::User);

    assert_eq!(
        admin_status(&app, "/api/admin/users", Some(token.clone())).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        admin_status(&app, "/api/admin/all-users", Some(token)).await,
        StatusCode::FORBIDDEN
    );
}

#[actix_rt::test]
async fn expired_token_is_rejected() {
    let app = TestApp::new().await;
    let issued = Utc::now() - Duration::days(10);
    let claims = Claims {
        sub: "admin@example.com".to_string(),
        iat: issued.timestamp() as usize,
        exp: (issued + Duration::days(7)).timestamp() as usize,
        user_id: ObjectId::new().to_hex(),
        role: UserRole::Admin,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET.as_ref())).unwrap();

    assert_eq!(
        admin_status(&app, "/api/admin/users", Some(token)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[actix_rt::test]
async fn garbage_token_is_rejected() {
    let app = TestApp::new().await;
    assert_eq!(
        admin_status(&app, "/api/admin/users", Some("not.a.jwt".to_string())).await,
        StatusCode::UNAUTHORIZED
    );
}

#[actix_rt::test]
async fn admin_only_handlers_outside_the_scope_check_the_role() {
    let app = TestApp::new().await;
    let service = test::init_service(app.create_app()).await;

    for uri in ["/api/users", "/api/blocked-dates", "/api/availability/admin/all"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(app.bearer(ObjectId::new(), UserRole::User))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
}
