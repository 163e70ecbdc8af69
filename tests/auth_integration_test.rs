//! Registration, login, sessions and the role gates in front of the API.

mod common;

use agrichain_api::{
    entities::user::{UserRole, UserStatus},
    services::users::UpdateUserRequest,
};
use axum::http::{header, Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;

async fn register(app: &TestApp, email: &str, password: &str) -> StatusCode {
    app.request(
        Method::POST,
        "/api/v1/auth/register",
        Some(json!({ "name": "Grace Farmer", "email": email, "password": password })),
        None,
    )
    .await
    .status()
}

#[tokio::test]
async fn registration_defaults_to_farmer_and_rejects_duplicates() {
    let app = TestApp::new().await;

    let created = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "Grace Farmer",
                "email": "Grace@Cassava.com",
                "password": "cassava123"
            })),
            None,
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = response_json(created).await;
    assert_eq!(body["data"]["role"], "Farmer");
    assert_eq!(body["data"]["status"], "Active");
    assert_eq!(body["data"]["email"], "grace@cassava.com");
    assert!(body["data"].get("passwordHash").is_none());

    assert_eq!(
        register(&app, "grace@cassava.com", "cassava123").await,
        StatusCode::CONFLICT
    );
    assert_eq!(
        register(&app, "short@cassava.com", "abc").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        register(&app, "not-an-email", "cassava123").await,
        StatusCode::BAD_REQUEST
    );

    let admin = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "Sneaky",
                "email": "sneaky@cassava.com",
                "password": "cassava123",
                "role": "Admin"
            })),
            None,
        )
        .await;
    assert_eq!(admin.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_issues_a_session_usable_as_cookie_or_bearer() {
    let app = TestApp::new().await;
    assert_eq!(
        register(&app, "farmer@cassava.com", "farmer123").await,
        StatusCode::CREATED
    );

    let login = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "FARMER@cassava.com", "password": "farmer123" })),
            None,
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);
    let cookie = login
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let body = response_json(login).await;
    let token = body["data"]["token"].as_str().expect("token").to_string();
    assert_eq!(body["data"]["tokenType"], "Bearer");
    assert_eq!(body["data"]["user"]["role"], "Farmer");

    let session_pair = cookie.split(';').next().expect("cookie pair");
    let via_cookie = app
        .request_with_headers(
            Method::GET,
            "/api/v1/auth/me",
            None,
            None,
            &[("cookie", session_pair)],
        )
        .await;
    assert_eq!(via_cookie.status(), StatusCode::OK);
    assert_eq!(
        response_json(via_cookie).await["data"]["email"],
        "farmer@cassava.com"
    );

    let via_bearer = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&token))
        .await;
    assert_eq!(via_bearer.status(), StatusCode::OK);
}

#[tokio::test]
async fn bad_credentials_and_inactive_accounts_are_refused() {
    let app = TestApp::new().await;
    assert_eq!(
        register(&app, "sarah@cassava.com", "password123").await,
        StatusCode::CREATED
    );

    for (email, password) in [
        ("sarah@cassava.com", "wrong-password"),
        ("nobody@cassava.com", "password123"),
    ] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response_json(response).await;
        assert_eq!(body["message"], "Unauthorized: Invalid email or password");
    }

    let admin = app.token_for(UserRole::Admin).await;
    let users = response_json(
        app.request(Method::GET, "/api/v1/users?search=sarah", None, Some(&admin))
            .await,
    )
    .await;
    let id = users["data"][0]["id"].as_i64().expect("registered user listed");

    let deactivated = app
        .request(
            Method::PUT,
            &format!("/api/v1/users/{id}/status"),
            Some(json!({ "status": "Inactive" })),
            Some(&admin),
        )
        .await;
    assert_eq!(deactivated.status(), StatusCode::OK);

    let inactive = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "sarah@cassava.com", "password": "password123" })),
            None,
        )
        .await;
    assert_eq!(inactive.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn protected_routes_need_a_valid_session() {
    let app = TestApp::new().await;

    let anonymous = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .request(Method::GET, "/api/v1/products", None, Some("not.a.jwt"))
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let farmer = app.token_for(UserRole::Farmer).await;
    let products = app
        .request(Method::GET, "/api/v1/products", None, Some(&farmer))
        .await;
    assert_eq!(products.status(), StatusCode::OK);

    let user_admin = app
        .request(Method::GET, "/api/v1/users", None, Some(&farmer))
        .await;
    assert_eq!(user_admin.status(), StatusCode::FORBIDDEN);

    let new_product = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "name": "Cassava Flour", "price": "5.00", "stock": 10 })),
            Some(&farmer),
        )
        .await;
    assert_eq!(new_product.status(), StatusCode::FORBIDDEN);

    let admin = app.token_for(UserRole::Admin).await;
    let created = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "name": "Cassava Flour", "price": "5.00", "stock": 10 })),
            Some(&admin),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn sessions_follow_the_stored_user_row() {
    let app = TestApp::new().await;
    let admin = app.seed_user(UserRole::Admin, UserStatus::Active).await;
    let token = app.state.auth.issue_token(&admin).expect("token").token;
    let users = &app.state.services.users;

    let before = app.request(Method::GET, "/api/v1/users", None, Some(&token)).await;
    assert_eq!(before.status(), StatusCode::OK);

    users
        .update(
            admin.id,
            UpdateUserRequest {
                role: Some(UserRole::Farmer),
                ..Default::default()
            },
        )
        .await
        .expect("demote");

    let demoted = app.request(Method::GET, "/api/v1/users", None, Some(&token)).await;
    assert_eq!(demoted.status(), StatusCode::FORBIDDEN);
    let create = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "name": "Gari", "price": "2.00", "stock": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(create.status(), StatusCode::FORBIDDEN);
    let me = app.request(Method::GET, "/api/v1/auth/me", None, Some(&token)).await;
    assert_eq!(response_json(me).await["data"]["role"], "Farmer");

    users
        .set_status(admin.id, UserStatus::Inactive)
        .await
        .expect("deactivate");
    let inactive = app
        .request(Method::GET, "/api/v1/products", None, Some(&token))
        .await;
    assert_eq!(inactive.status(), StatusCode::FORBIDDEN);

    assert!(users.delete(admin.id).await.expect("delete"));
    let deleted = app
        .request(Method::GET, "/api/v1/products", None, Some(&token))
        .await;
    assert_eq!(deleted.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_endpoints_and_request_ids() {
    let app = TestApp::new().await;

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert!(health.headers().contains_key("x-request-id"));

    let status = app
        .request_with_headers(
            Method::GET,
            "/api/v1/status",
            None,
            None,
            &[("x-request-id", "trace-me-42")],
        )
        .await;
    assert_eq!(status.status(), StatusCode::OK);
    assert_eq!(
        status.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-me-42")
    );
    let body = response_json(status).await;
    assert_eq!(body["data"]["service"], "agrichain-api");
    assert_eq!(body["meta"]["request_id"], "trace-me-42");

    let logout = app.request(Method::POST, "/api/v1/auth/logout", None, None).await;
    assert_eq!(logout.status(), StatusCode::OK);
    let cleared = logout
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cleared.contains("Max-Age=0"));

    let unknown = app.request(Method::GET, "/nope", None, None).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}
