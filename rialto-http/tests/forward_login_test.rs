use std::net::TcpListener;

use actix_web::{web, App, HttpServer};
use serde_json::{json, Value};

use rialto::token::TokenSigner;
use rialto_http::http::alerts_v1::{
    server::{
        active_users, create_alert, delete_alert, healthz, list_alerts, login, login_legacy,
        market_data, profile, profile_legacy, register,
    },
    AppState,
};
use rialto_http::http::proxy_v1::{
    server::{forward, forward_path, health, not_found},
    ProxyState,
};

fn start_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let state = web::Data::new(AppState::new(TokenSigner::new("integration-secret"), true));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(login)
            .service(login_legacy)
            .service(register)
            .service(profile)
            .service(profile_legacy)
            .service(list_alerts)
            .service(create_alert)
            .service(delete_alert)
            .service(active_users)
            .service(market_data)
            .service(healthz)
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    tokio::spawn(server);

    format!("http://{addr}/api")
}

fn start_proxy(backend_url: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let state = web::Data::new(ProxyState::new(backend_url));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(forward)
            .service(forward_path)
            .service(health)
            .default_service(web::route().to(not_found))
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    tokio::spawn(server);

    format!("http://{addr}")
}

// Full dashboard path: login, create and list alerts, all tunneled through the
// forwarding proxy against a live backend
#[tokio::test]
async fn proxied_dashboard_flow_test() {
    env_logger::try_init().ok();

    let backend_url = start_backend();
    let proxy_url = start_proxy(backend_url);
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{proxy_url}/api_proxy"))
        .json(&json!({
            "endpoint": "auth/login",
            "method": "POST",
            "data": json!({"username": "admin", "password": "adminpass"}).to_string(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let auth: Value = resp.json().await.unwrap();
    let token = auth["token"].as_str().unwrap().to_string();
    assert_eq!(auth["user"]["isAdmin"], true);

    // Wrong credentials carry the backend's status and message through the proxy
    let resp = client
        .post(format!("{proxy_url}/api_proxy"))
        .json(&json!({
            "endpoint": "auth/login",
            "method": "POST",
            "data": json!({"username": "admin", "password": "nope"}).to_string(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");

    let resp = client
        .post(format!("{proxy_url}/api_proxy"))
        .json(&json!({
            "endpoint": "alerts",
            "method": "POST",
            "token": token,
            "data": json!({"title": "Breakout", "message": "BTC over resistance"}).to_string(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    let alert_id = created["id"].as_str().unwrap().to_string();

    // Path-tail mode reads the same backend
    let resp = client
        .get(format!("{proxy_url}/api_proxy/alerts?type=ALL"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let alerts: Value = resp.json().await.unwrap();
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    assert_eq!(alerts[0]["id"], alert_id.as_str());

    let resp = client
        .post(format!("{proxy_url}/api_proxy"))
        .json(&json!({
            "endpoint": format!("alerts/{alert_id}"),
            "method": "DELETE",
            "token": token,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);

    let resp = client
        .post(format!("{proxy_url}/api_proxy"))
        .json(&json!({
            "endpoint": format!("alerts/{alert_id}"),
            "method": "DELETE",
            "token": token,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
