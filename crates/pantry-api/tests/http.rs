//! End-to-end tests over the HTTP surface, with an in-memory database and
//! the mailer disabled.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use uuid::Uuid;

use pantry_api::{AppStateInner, router};
use pantry_db::Database;
use pantry_mailer::Mailer;
use pantry_types::api::{Claims, TokenPurpose};

const JWT_SECRET: &str = "test-secret";
const PASSWORD: &str = "correct horse battery";

fn test_server() -> TestServer {
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: JWT_SECRET.into(),
        mailer: Mailer::disabled(),
    });
    TestServer::new(router(state)).unwrap()
}

async fn register(server: &TestServer, email: &str, role: &str) -> Uuid {
    let res = server
        .post("/register")
        .json(&json!({ "email": email, "password": PASSWORD, "role": role }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()["user_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap()
}

async fn login(server: &TestServer, email: &str, password: &str) -> Value {
    let res = server
        .post("/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    res.json()
}

async fn signup(server: &TestServer, email: &str, role: &str) -> String {
    register(server, email, role).await;
    login(server, email, PASSWORD).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Creates an event whose window is `now + start_offset .. now + end_offset`.
async fn create_event(
    server: &TestServer,
    token: &str,
    start_offset_minutes: i64,
    end_offset_minutes: i64,
    foods: Value,
) -> Value {
    let now = Utc::now();
    let res = server
        .post("/createevent")
        .authorization_bearer(token)
        .json(&json!({
            "name": "CS Club Leftovers",
            "description": "Side tables in the GSU alley",
            "start": now + Duration::minutes(start_offset_minutes),
            "end": now + Duration::minutes(end_offset_minutes),
            "location": { "lat": 42.3505, "lng": -71.1054, "address": "775 Commonwealth Ave" },
            "foods": foods,
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json()
}

fn mint_token(user_id: Uuid, purpose: TokenPurpose) -> String {
    let claims = Claims {
        sub: user_id,
        name: "tester".into(),
        purpose,
        exp: (Utc::now() + Duration::minutes(30)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn register_login_and_me() {
    let server = test_server();

    register(&server, "cal@bu.edu", "regular_user").await;

    // Same email twice is a conflict.
    let res = server
        .post("/register")
        .json(&json!({ "email": "cal@bu.edu", "password": PASSWORD, "role": "regular_user" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);
    assert!(res.json::<Value>()["detail"].as_str().unwrap().contains("already exists"));

    let body = login(&server, "cal@bu.edu", PASSWORD).await;
    assert_eq!(body["user"]["role"], "regular_user");
    // Name defaults to the email's local part.
    assert_eq!(body["user"]["name"], "cal");

    let token = body["access_token"].as_str().unwrap();
    let res = server.get("/me").authorization_bearer(token).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["email"], "cal@bu.edu");

    let res = server
        .post("/login")
        .json(&json!({ "email": "cal@bu.edu", "password": "wrong password!" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_validates_email_and_password() {
    let server = test_server();

    let res = server
        .post("/register")
        .json(&json!({ "email": "not-an-email", "password": PASSWORD, "role": "regular_user" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    let res = server
        .post("/register")
        .json(&json!({ "email": "cal@bu.edu", "password": "short", "role": "regular_user" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_reject_missing_and_wrong_purpose_tokens() {
    let server = test_server();
    let user_id = register(&server, "cal@bu.edu", "regular_user").await;

    let res = server.get("/events").await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    let res = server.get("/events").authorization_bearer("garbage").await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    // A reset token is not a session.
    let reset = mint_token(user_id, TokenPurpose::PasswordReset);
    let res = server.get("/events").authorization_bearer(&reset).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let server = test_server();
    let user_id = register(&server, "cal@bu.edu", "regular_user").await;

    // Same generic answer for known and unknown accounts.
    for email in ["cal@bu.edu", "nobody@bu.edu"] {
        let res = server
            .post("/forgot-password")
            .json(&json!({ "email": email }))
            .await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    // A session token cannot reset the password.
    let session = mint_token(user_id, TokenPurpose::Session);
    let res = server
        .post("/reset-password")
        .json(&json!({ "token": session, "new_password": "a brand new password" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    let reset = mint_token(user_id, TokenPurpose::PasswordReset);
    let res = server
        .post("/reset-password")
        .json(&json!({ "token": reset, "new_password": "a brand new password" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let res = server
        .post("/login")
        .json(&json!({ "email": "cal@bu.edu", "password": PASSWORD }))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    login(&server, "cal@bu.edu", "a brand new password").await;
}

#[tokio::test]
async fn event_crud_with_ownership_checks() {
    let server = test_server();
    let host = signup(&server, "host@bu.edu", "event_creator").await;
    let other = signup(&server, "other@bu.edu", "regular_user").await;

    let event = create_event(
        &server,
        &host,
        -15,
        120,
        json!([{ "name": "pizza", "quantity": 10, "dietary_tags": "Vegetarian" }]),
    )
    .await;
    let event_id = event["event_id"].as_str().unwrap();
    assert_eq!(event["foods"][0]["dietary_tags"], "vegetarian");

    // Own listing is scoped to the caller.
    let res = server.get("/events").authorization_bearer(&other).await;
    assert_eq!(res.json::<Value>().as_array().unwrap().len(), 0);
    let res = server.get("/events/all").authorization_bearer(&other).await;
    assert_eq!(res.json::<Value>().as_array().unwrap().len(), 1);

    // Only the creator may update or delete.
    let res = server
        .post(&format!("/events/update/{event_id}"))
        .authorization_bearer(&other)
        .json(&json!({ "name": "Hijacked" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = server
        .post(&format!("/events/delete/{event_id}"))
        .authorization_bearer(&other)
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = server
        .post(&format!("/events/update/{event_id}"))
        .authorization_bearer(&host)
        .json(&json!({ "name": "Moved to the lobby" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["name"], "Moved to the lobby");

    let res = server
        .get(&format!("/events/{event_id}"))
        .authorization_bearer(&other)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let detail = res.json::<Value>();
    assert_eq!(detail["event"]["name"], "Moved to the lobby");
    assert_eq!(detail["foods"].as_array().unwrap().len(), 1);

    let res = server
        .post(&format!("/events/delete/{event_id}"))
        .authorization_bearer(&host)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let res = server.get(&format!("/get-food/{event_id}")).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reservation_flow_stops_at_posted_stock() {
    let server = test_server();
    let host = signup(&server, "host@bu.edu", "event_creator").await;
    let diner = signup(&server, "diner@bu.edu", "regular_user").await;

    let event = create_event(
        &server,
        &host,
        -15,
        120,
        json!([{ "name": "pizza", "quantity": 3 }]),
    )
    .await;
    let event_id = event["event_id"].as_str().unwrap();
    let food_id = event["foods"][0]["food_id"].as_str().unwrap();

    let reserve = |quantity: i64| {
        let pickup = Utc::now() + Duration::minutes(60);
        server
            .post("/createreservation")
            .authorization_bearer(&diner)
            .json(&json!({
                "food_id": food_id,
                "event_id": event_id,
                "quantity": quantity,
                "pickup_time": pickup,
            }))
    };

    let res = reserve(2).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let body = res.json::<Value>();
    assert_eq!(body["food_name"], "pizza");
    assert_eq!(body["user_name"], "diner");

    // More than what is left.
    let res = reserve(2).await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);

    let res = server.get(&format!("/get-food/{event_id}")).await;
    assert_eq!(res.json::<Value>()["foods"][0]["quantity"], 1);

    // Draining the item removes it from the listing.
    let res = reserve(1).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let res = server.get(&format!("/get-food/{event_id}")).await;
    assert_eq!(res.json::<Value>()["foods"].as_array().unwrap().len(), 0);

    let res = server
        .get("/user/reservations")
        .authorization_bearer(&diner)
        .await;
    let body = res.json::<Value>();
    let listed = body["reservations"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["event"]["name"], "CS Club Leftovers");
}

#[tokio::test]
async fn ratings_require_attendance() {
    let server = test_server();
    let host = signup(&server, "host@bu.edu", "event_creator").await;
    let diner = signup(&server, "diner@bu.edu", "regular_user").await;

    let event = create_event(
        &server,
        &host,
        -15,
        120,
        json!([{ "name": "pizza", "quantity": 5 }]),
    )
    .await;
    let event_id = event["event_id"].as_str().unwrap();

    let res = server
        .post("/rate-event")
        .authorization_bearer(&diner)
        .json(&json!({ "event_id": event_id, "rating": 4.5 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = server
        .post("/createreservation")
        .authorization_bearer(&diner)
        .json(&json!({
            "food_id": event["foods"][0]["food_id"],
            "event_id": event_id,
            "quantity": 1,
            "pickup_time": Utc::now() + Duration::minutes(30),
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    let res = server
        .post("/rate-event")
        .authorization_bearer(&diner)
        .json(&json!({ "event_id": event_id, "rating": 6.0 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    let res = server
        .post("/rate-event")
        .authorization_bearer(&diner)
        .json(&json!({ "event_id": event_id, "rating": 4.5, "description": "still warm" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    // Listing is public.
    let res = server.get(&format!("/ratings/{event_id}")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body = res.json::<Value>();
    assert_eq!(body["ratings"][0]["description"], "still warm");
}

#[tokio::test]
async fn listings_split_by_time_and_dietary_filters() {
    let server = test_server();
    let host = signup(&server, "host@bu.edu", "event_creator").await;

    // One event running now with vegan food, one starting in three hours.
    create_event(
        &server,
        &host,
        -15,
        120,
        json!([{ "name": "salad", "quantity": 5, "dietary_tags": "Vegan, Gluten-Free" }]),
    )
    .await;
    create_event(
        &server,
        &host,
        180,
        300,
        json!([{ "name": "pizza", "quantity": 10 }]),
    )
    .await;

    let res = server.get("/active-events").await;
    let body = res.json::<Value>();
    assert_eq!(body["events"].as_array().unwrap().len(), 1);
    assert_eq!(body["events"][0]["foods"][0]["food_name"], "salad");

    let res = server
        .get("/events/filtered?time_filter=running_now")
        .authorization_bearer(&host)
        .await;
    assert_eq!(res.json::<Value>().as_array().unwrap().len(), 1);

    let res = server
        .get("/events/filtered?dietary_restrictions=VEGAN")
        .authorization_bearer(&host)
        .await;
    assert_eq!(res.json::<Value>().as_array().unwrap().len(), 1);

    let res = server
        .get("/events/filtered?dietary_restrictions=nut-free")
        .authorization_bearer(&host)
        .await;
    assert_eq!(res.json::<Value>().as_array().unwrap().len(), 0);

    // Dashboard buckets: the future event is archived, not active.
    let res = server.get("/host/events").authorization_bearer(&host).await;
    let body = res.json::<Value>();
    assert_eq!(body["active_events"].as_array().unwrap().len(), 1);
    assert_eq!(body["archived_events"].as_array().unwrap().len(), 1);

    // Latest event is the most recently created one.
    let res = server
        .get("/host-latest-event")
        .authorization_bearer(&host)
        .await;
    assert_eq!(res.json::<Value>()["foods"][0]["food_name"], "pizza");
}

#[tokio::test]
async fn host_latest_event_without_events_is_not_found() {
    let server = test_server();
    let host = signup(&server, "host@bu.edu", "event_creator").await;
    let res = server
        .get("/host-latest-event")
        .authorization_bearer(&host)
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn optupdate_toggles_the_flag() {
    let server = test_server();
    let token = signup(&server, "cal@bu.edu", "regular_user").await;

    let res = server.post("/optupdate").authorization_bearer(&token).await;
    assert_eq!(res.json::<Value>()["optin"], true);
    let res = server.post("/optupdate").authorization_bearer(&token).await;
    assert_eq!(res.json::<Value>()["optin"], false);
}
