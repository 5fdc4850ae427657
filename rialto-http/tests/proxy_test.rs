use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};

use rialto_http::http::proxy_v1::{
    server::{forward, forward_path, health, not_found},
    ProxyState,
};

async fn echo(hits: web::Data<AtomicUsize>, body: web::Bytes) -> HttpResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    HttpResponse::Ok()
        .content_type("application/json")
        .body(body)
}

async fn status_code(hits: web::Data<AtomicUsize>, path: web::Path<(u16,)>) -> HttpResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let (code,) = path.into_inner();
    let status = actix_web::http::StatusCode::from_u16(code).unwrap();
    HttpResponse::build(status).json(json!({ "code": code }))
}

async fn auth_check(hits: web::Data<AtomicUsize>, req: HttpRequest) -> HttpResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let authorization = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok());
    HttpResponse::Ok().json(json!({ "authorization": authorization }))
}

async fn plain_text(hits: web::Data<AtomicUsize>) -> HttpResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    HttpResponse::Ok()
        .content_type("text/plain")
        .body("not json at all")
}

fn start_mock_backend(hits: web::Data<AtomicUsize>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(hits.clone())
            .route("/api/echo", web::post().to(echo))
            .route("/api/status/{code}", web::route().to(status_code))
            .route("/api/authcheck", web::get().to(auth_check))
            .route("/api/plain", web::get().to(plain_text))
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

#[tokio::test]
async fn proxy_forwarding_integration_test() {
    env_logger::try_init().ok();

    let hits = web::Data::new(AtomicUsize::new(0));
    let backend_url = start_mock_backend(hits.clone());
    let proxy_url = start_proxy(backend_url);
    let client = reqwest::Client::new();

    // Missing endpoint is rejected before any outbound call is attempted
    let resp = client
        .post(format!("{proxy_url}/api_proxy"))
        .json(&json!({"method": "POST"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["proxy_status"], "missing_endpoint");
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    // The proxy status code always equals the backend status code
    for code in [200u16, 201, 400, 401, 403, 404, 500] {
        let resp = client
            .post(format!("{proxy_url}/api_proxy"))
            .json(&json!({"endpoint": format!("status/{code}")}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), code);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], code);
    }

    // JSON bodies round-trip unmodified in both directions
    let payload = json!({"title": "A", "nested": {"pnl": "+12.5", "ids": [1, 2, 3]}});
    let resp = client
        .post(format!("{proxy_url}/api_proxy"))
        .json(&json!({
            "endpoint": "echo",
            "method": "POST",
            "data": payload.to_string(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, payload);

    // Token parameters are normalized into a bearer header
    let resp = client
        .post(format!("{proxy_url}/api_proxy"))
        .json(&json!({"endpoint": "authcheck", "token": "abc123"}))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["authorization"], "Bearer abc123");

    // An already-prefixed inbound header passes through untouched
    let resp = client
        .get(format!("{proxy_url}/api_proxy?endpoint=authcheck"))
        .header("Authorization", "Bearer xyz")
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["authorization"], "Bearer xyz");

    // Non-JSON upstream bodies pass through as raw text
    let resp = client
        .get(format!("{proxy_url}/api_proxy?endpoint=plain"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "not json at all");
}

#[tokio::test]
async fn proxy_path_tail_integration_test() {
    env_logger::try_init().ok();

    let hits = web::Data::new(AtomicUsize::new(0));
    let backend_url = start_mock_backend(hits.clone());
    let proxy_url = start_proxy(backend_url);
    let client = reqwest::Client::new();

    // Path-tail mode reuses the inbound method and forwards the raw body
    let payload = json!({"echoed": true});
    let resp = client
        .post(format!("{proxy_url}/api_proxy/echo"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, payload);

    let resp = client
        .get(format!("{proxy_url}/api_proxy/status/201"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Unmatched proxy routes answer with the JSON 404
    let resp = client
        .get(format!("{proxy_url}/design-studio"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Route not found");
}
