use dealerops_core::config::Config;
use dealerops_core::models::Role;
use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::Client;

fn test_client() -> Client {
    let mut config = Config::for_tests();
    config.database_url = ":memory:".to_string();
    let rocket = dealerops_core::rocket_with_config(config);
    Client::tracked(rocket).expect("valid rocket instance")
}

fn store(client: &Client) -> std::sync::Arc<dealerops_core::db::Store> {
    client.rocket().state::<std::sync::Arc<dealerops_core::db::Store>>().unwrap().clone()
}

fn make_dealership(client: &Client, slug: &str) -> i64 {
    let s = store(client);
    let now = chrono::Utc::now().to_rfc3339();
    let d = dealerops_core::store::dealerships::create(
        &s, slug, slug, &format!("{slug} Motors"), "scrape-secret", "crm-secret", 10, &now,
    )
    .unwrap();
    d.id
}

fn make_user(client: &Client, dealership_id: i64, email: &str, role: Role) -> i64 {
    let s = store(client);
    let now = chrono::Utc::now().to_rfc3339();
    let hash = dealerops_core::auth::hash_password("hunter2hunter2").unwrap();
    let u = dealerops_core::store::users::create(&s, email, &hash, "Test User", role, Some(dealership_id), &now)
        .unwrap();
    u.id
}

fn login(client: &Client, email: &str) -> String {
    let res = client
        .post("/auth/login")
        .header(ContentType::JSON)
        .body(format!(r#"{{"email":"{email}","password":"hunter2hunter2"}}"#))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    body["token"].as_str().unwrap().to_string()
}

fn auth_header(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

// --- Health / tenancy ---

#[test]
fn health_ok() {
    let client = test_client();
    let res = client.get("/health").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
}

#[test]
fn tenancy_resolve_by_subdomain() {
    let client = test_client();
    make_dealership(&client, "acme");
    let res = client.get("/tenancy/resolve?subdomain=acme").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["dealership"]["slug"], "acme");
}

#[test]
fn tenancy_resolve_unknown_subdomain_is_null() {
    let client = test_client();
    let res = client.get("/tenancy/resolve?subdomain=nope").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["dealership"].is_null());
}

// --- Auth ---

#[test]
fn login_succeeds_and_me_reflects_claims() {
    let client = test_client();
    let dealership_id = make_dealership(&client, "acme");
    make_user(&client, dealership_id, "master@acme.test", Role::Master);
    let token = login(&client, "master@acme.test");

    let res = client.get("/auth/me").header(auth_header(&token)).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["email"], "master@acme.test");
    assert_eq!(body["dealershipId"], dealership_id);
}

#[test]
fn login_rejects_wrong_password() {
    let client = test_client();
    let dealership_id = make_dealership(&client, "acme");
    make_user(&client, dealership_id, "master@acme.test", Role::Master);

    let res = client
        .post("/auth/login")
        .header(ContentType::JSON)
        .body(r#"{"email":"master@acme.test","password":"wrong"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Unauthorized);
}

#[test]
fn me_without_credentials_is_rejected() {
    let client = test_client();
    let res = client.get("/auth/me").dispatch();
    assert_ne!(res.status(), Status::Ok);
}

// --- Vehicles ---

#[test]
fn salesperson_cannot_create_vehicle_but_master_can() {
    let client = test_client();
    let dealership_id = make_dealership(&client, "acme");
    make_user(&client, dealership_id, "sales@acme.test", Role::Salesperson);
    make_user(&client, dealership_id, "master@acme.test", Role::Master);
    let sales_token = login(&client, "sales@acme.test");
    let master_token = login(&client, "master@acme.test");

    let body = r#"{"year":2021,"make":"Honda","model":"Civic","price":22000,"odometer":15000}"#;

    let res = client
        .post("/vehicles")
        .header(auth_header(&sales_token))
        .header(ContentType::JSON)
        .body(body)
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);

    let res = client
        .post("/vehicles")
        .header(auth_header(&master_token))
        .header(ContentType::JSON)
        .body(body)
        .dispatch();
    assert_eq!(res.status(), Status::Created);
    let created: serde_json::Value = res.into_json().unwrap();
    assert_eq!(created["make"], "Honda");
    assert_eq!(created["dealership_id"], dealership_id);
}

#[test]
fn vehicles_are_isolated_per_dealership() {
    let client = test_client();
    let dealership_a = make_dealership(&client, "acme");
    let dealership_b = make_dealership(&client, "globex");
    make_user(&client, dealership_a, "master@acme.test", Role::Master);
    make_user(&client, dealership_b, "master@globex.test", Role::Master);
    let token_a = login(&client, "master@acme.test");
    let token_b = login(&client, "master@globex.test");

    let res = client
        .post("/vehicles")
        .header(auth_header(&token_a))
        .header(ContentType::JSON)
        .body(r#"{"year":2020,"make":"Ford","model":"Focus","price":15000,"odometer":40000}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Created);
    let created: serde_json::Value = res.into_json().unwrap();
    let vehicle_id = created["id"].as_i64().unwrap();

    let res = client
        .get(format!("/vehicles/{vehicle_id}"))
        .header(auth_header(&token_b))
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);

    let res = client
        .get(format!("/vehicles/{vehicle_id}"))
        .header(auth_header(&token_a))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
}

#[test]
fn vehicle_listing_paginates() {
    let client = test_client();
    let dealership_id = make_dealership(&client, "acme");
    make_user(&client, dealership_id, "master@acme.test", Role::Master);
    let token = login(&client, "master@acme.test");
    for i in 0..3 {
        let res = client
            .post("/vehicles")
            .header(auth_header(&token))
            .header(ContentType::JSON)
            .body(format!(r#"{{"year":2020,"make":"Make{i}","model":"Model{i}","price":10000,"odometer":1000}}"#))
            .dispatch();
        assert_eq!(res.status(), Status::Created);
    }

    let res = client
        .get("/vehicles?page=1&limit=2")
        .header(auth_header(&token))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

// --- Conversations ---

#[test]
fn conversation_messages_round_trip_and_ai_toggle() {
    let client = test_client();
    let dealership_id = make_dealership(&client, "acme");
    make_user(&client, dealership_id, "master@acme.test", Role::Master);
    let token = login(&client, "master@acme.test");

    let s = store(&client);
    let now = chrono::Utc::now().to_rfc3339();
    let conversation = dealerops_core::store::conversations::find_or_create(
        &s,
        dealership_id,
        dealerops_core::models::Channel::WebsiteChat,
        "visitor-1",
        &now,
    )
    .unwrap();

    let res = client
        .get("/all-conversations")
        .header(auth_header(&token))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let res = client
        .post(format!("/messenger-conversations/{}/toggle-ai", conversation.id))
        .header(auth_header(&token))
        .header(ContentType::JSON)
        .body(r#"{"enabled":false}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    let updated = dealerops_core::store::conversations::get(&s, dealership_id, conversation.id).unwrap();
    assert!(!updated.ai_enabled);
}

// --- Posting extension ---

#[test]
fn extension_limits_reflect_dealership_cap() {
    let client = test_client();
    let dealership_id = make_dealership(&client, "acme");
    make_user(&client, dealership_id, "sales@acme.test", Role::Salesperson);
    let token = login(&client, "sales@acme.test");

    let res = client
        .get("/extension/limits")
        .header(auth_header(&token))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["cap"], 10);
    assert_eq!(body["remaining"], 10);
}

// --- Webhook signature verification ---

#[test]
fn webhook_signature_round_trips() {
    let secret = "crm-secret";
    let body = br#"{"locationId":"loc-1"}"#;
    let now_ms = chrono::Utc::now().timestamp_millis();
    let sig = dealerops_core::webhook_sig::sign(secret, now_ms, body);
    assert!(dealerops_core::webhook_sig::verify(secret, now_ms, body, &sig, now_ms));
    assert!(!dealerops_core::webhook_sig::verify(secret, now_ms, body, &sig, now_ms + 10 * 60 * 1000));
}
