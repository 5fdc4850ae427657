use std::future::{self, Future};

use anyhow::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use rialto::alert::{Alert, NewAlert};
use rialto::bus::AlertEvent;
use rialto::market::MarketQuote;
use rialto::user::{ActiveUser, UserProfile};
use rialto_http::http::alerts_v1::{
    AlertsV1Error, AppState, AuthResponse, Client, DeleteAlertResponse, LoginRequest,
    RegisterRequest,
};
use rialto_http::http::proxy_v1::{HealthResponse, ProxyRequest, PROXY_TIMEOUT};

use crate::store::{normalize_list, LIST_KEYS};

/// Failure carrying the backend-supplied message and status, raised whenever a
/// response status falls outside the success range.
#[derive(Debug)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl std::error::Error for ApiError {}

impl core::fmt::Display for ApiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|message| message.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Decodes a successful response, or fails with the backend's error message. A
/// 401 invalidates the locally cached token, the caller has to re-authenticate.
async fn read_response<T: DeserializeOwned>(
    response: reqwest::Response,
    token: &mut Option<String>,
) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(serde_json::from_str(&body)?);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        *token = None;
    }
    Err(Error::new(ApiError {
        status: status.as_u16(),
        message: extract_error_message(&body),
    }))
}

fn decode_list<T: DeserializeOwned>(value: &Value) -> Result<Vec<T>> {
    Ok(serde_json::from_value(Value::Array(normalize_list(
        value, &LIST_KEYS,
    )))?)
}

/// Calls the backend API directly.
#[derive(Debug)]
pub struct HttpClient {
    pub path: String,
    pub token: Option<String>,
    pub client: reqwest::Client,
}

impl HttpClient {
    pub fn new(path: String) -> Self {
        Self {
            path,
            token: None,
            client: reqwest::Client::builder()
                .timeout(PROXY_TIMEOUT)
                .build()
                .expect("reqwest client builds with static configuration"),
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            builder.header("Authorization", format!("Bearer {token}"))
        } else {
            builder
        }
    }
}

impl Client for HttpClient {
    async fn login(&mut self, username: String, password: String) -> Result<AuthResponse> {
        let response = self
            .client
            .post(self.path.clone() + "/api/auth/login")
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let auth: AuthResponse = read_response(response, &mut self.token).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    async fn register(
        &mut self,
        username: String,
        email: String,
        password: String,
    ) -> Result<AuthResponse> {
        let response = self
            .client
            .post(self.path.clone() + "/api/auth/register")
            .json(&RegisterRequest {
                username: Some(username),
                email: Some(email),
                password: Some(password),
            })
            .send()
            .await?;
        let auth: AuthResponse = read_response(response, &mut self.token).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    async fn profile(&mut self) -> Result<UserProfile> {
        let request = self.authorized(self.client.get(self.path.clone() + "/api/auth/profile"));
        let response = request.send().await?;
        read_response(response, &mut self.token).await
    }

    async fn list_alerts(&mut self, type_filter: Option<String>) -> Result<Vec<Alert>> {
        let mut url = self.path.clone() + "/api/alerts";
        if let Some(typ) = type_filter {
            url = format!("{url}?type={typ}");
        }
        let response = self.client.get(url).send().await?;
        let value: Value = read_response(response, &mut self.token).await?;
        decode_list(&value)
    }

    async fn create_alert(&mut self, new_alert: NewAlert) -> Result<Alert> {
        let request = self.authorized(self.client.post(self.path.clone() + "/api/alerts"));
        let response = request.json(&new_alert).send().await?;
        read_response(response, &mut self.token).await
    }

    async fn delete_alert(&mut self, id: String) -> Result<DeleteAlertResponse> {
        let request =
            self.authorized(self.client.delete(format!("{}/api/alerts/{id}", self.path)));
        let response = request.send().await?;
        read_response(response, &mut self.token).await
    }

    async fn active_users(&mut self) -> Result<Vec<ActiveUser>> {
        let response = self
            .client
            .get(self.path.clone() + "/api/users/active")
            .send()
            .await?;
        let value: Value = read_response(response, &mut self.token).await?;
        decode_list(&value)
    }

    async fn market_data(&mut self) -> Result<Vec<MarketQuote>> {
        let request = self.authorized(self.client.get(self.path.clone() + "/api/market/data"));
        let response = request.send().await?;
        let value: Value = read_response(response, &mut self.token).await?;
        decode_list(&value)
    }

    async fn health(&mut self) -> Result<String> {
        let response = self
            .client
            .get(self.path.clone() + "/healthz")
            .send()
            .await?;
        Ok(response.text().await?)
    }
}

/// Tunnels every operation through the forwarding proxy's envelope endpoint.
#[derive(Debug)]
pub struct ProxyClient {
    pub path: String,
    pub token: Option<String>,
    pub client: reqwest::Client,
}

impl ProxyClient {
    pub fn new(path: String) -> Self {
        Self {
            path,
            token: None,
            client: reqwest::Client::builder()
                .timeout(PROXY_TIMEOUT)
                .build()
                .expect("reqwest client builds with static configuration"),
        }
    }

    async fn tunnel<T: DeserializeOwned>(
        &mut self,
        endpoint: String,
        method: &str,
        data: Option<String>,
    ) -> Result<T> {
        let envelope = ProxyRequest {
            endpoint: Some(endpoint),
            method: Some(method.to_string()),
            data,
            token: self.token.clone(),
        };
        let response = self
            .client
            .post(self.path.clone() + "/api_proxy")
            .json(&envelope)
            .send()
            .await?;
        read_response(response, &mut self.token).await
    }
}

impl Client for ProxyClient {
    async fn login(&mut self, username: String, password: String) -> Result<AuthResponse> {
        let body = serde_json::to_string(&LoginRequest { username, password })?;
        let auth: AuthResponse = self
            .tunnel("auth/login".to_string(), "POST", Some(body))
            .await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    async fn register(
        &mut self,
        username: String,
        email: String,
        password: String,
    ) -> Result<AuthResponse> {
        let body = serde_json::to_string(&RegisterRequest {
            username: Some(username),
            email: Some(email),
            password: Some(password),
        })?;
        let auth: AuthResponse = self
            .tunnel("auth/register".to_string(), "POST", Some(body))
            .await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    async fn profile(&mut self) -> Result<UserProfile> {
        self.tunnel("auth/profile".to_string(), "GET", None).await
    }

    async fn list_alerts(&mut self, type_filter: Option<String>) -> Result<Vec<Alert>> {
        let endpoint = match type_filter {
            Some(typ) => format!("alerts?type={typ}"),
            None => "alerts".to_string(),
        };
        let value: Value = self.tunnel(endpoint, "GET", None).await?;
        decode_list(&value)
    }

    async fn create_alert(&mut self, new_alert: NewAlert) -> Result<Alert> {
        let body = serde_json::to_string(&new_alert)?;
        self.tunnel("alerts".to_string(), "POST", Some(body)).await
    }

    async fn delete_alert(&mut self, id: String) -> Result<DeleteAlertResponse> {
        self.tunnel(format!("alerts/{id}"), "DELETE", None).await
    }

    async fn active_users(&mut self) -> Result<Vec<ActiveUser>> {
        let value: Value = self.tunnel("users/active".to_string(), "GET", None).await?;
        decode_list(&value)
    }

    async fn market_data(&mut self) -> Result<Vec<MarketQuote>> {
        let value: Value = self.tunnel("market/data".to_string(), "GET", None).await?;
        decode_list(&value)
    }

    async fn health(&mut self) -> Result<String> {
        let response = self.client.get(self.path.clone() + "/health").send().await?;
        let health: HealthResponse = read_response(response, &mut self.token).await?;
        Ok(health.status)
    }
}

/// Runs against an in-process `AppState`, mirroring the HTTP semantics without a
/// network hop. Used by tests and examples.
pub struct LocalClient {
    pub state: AppState,
    pub token: Option<String>,
}

impl LocalClient {
    pub fn new(state: AppState) -> Self {
        Self { state, token: None }
    }

    pub fn demo() -> Self {
        Self::new(AppState::demo())
    }

    /// Live alert events, for re-fetch-on-notify consumers.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AlertEvent> {
        self.state.bus.subscribe()
    }

    fn fail(&mut self, err: AlertsV1Error) -> Error {
        if err.status() == 401 {
            self.token = None;
        }
        Error::new(ApiError {
            status: err.status(),
            message: err.to_string(),
        })
    }
}

impl Client for LocalClient {
    fn login(
        &mut self,
        username: String,
        password: String,
    ) -> impl Future<Output = Result<AuthResponse>> {
        match self.state.login(&username, &password) {
            Ok(auth) => {
                self.token = Some(auth.token.clone());
                future::ready(Ok(auth))
            }
            Err(err) => future::ready(Err(self.fail(err))),
        }
    }

    fn register(
        &mut self,
        username: String,
        email: String,
        password: String,
    ) -> impl Future<Output = Result<AuthResponse>> {
        let request = RegisterRequest {
            username: Some(username),
            email: Some(email),
            password: Some(password),
        };
        match self.state.register(&request) {
            Ok(auth) => {
                self.token = Some(auth.token.clone());
                future::ready(Ok(auth))
            }
            Err(err) => future::ready(Err(self.fail(err))),
        }
    }

    fn profile(&mut self) -> impl Future<Output = Result<UserProfile>> {
        match self.state.profile(self.token.clone().as_deref()) {
            Ok(user) => future::ready(Ok(user)),
            Err(err) => future::ready(Err(self.fail(err))),
        }
    }

    fn list_alerts(
        &mut self,
        type_filter: Option<String>,
    ) -> impl Future<Output = Result<Vec<Alert>>> {
        future::ready(Ok(self.state.list_alerts(type_filter.as_deref())))
    }

    fn create_alert(&mut self, new_alert: NewAlert) -> impl Future<Output = Result<Alert>> {
        match self.state.create_alert(self.token.clone().as_deref(), new_alert) {
            Ok(alert) => future::ready(Ok(alert)),
            Err(err) => future::ready(Err(self.fail(err))),
        }
    }

    fn delete_alert(&mut self, id: String) -> impl Future<Output = Result<DeleteAlertResponse>> {
        match self.state.delete_alert(self.token.clone().as_deref(), &id) {
            Ok(()) => future::ready(Ok(DeleteAlertResponse { ok: true })),
            Err(err) => future::ready(Err(self.fail(err))),
        }
    }

    fn active_users(&mut self) -> impl Future<Output = Result<Vec<ActiveUser>>> {
        future::ready(Ok(self.state.active_users()))
    }

    fn market_data(&mut self) -> impl Future<Output = Result<Vec<MarketQuote>>> {
        match self.state.market_data(self.token.clone().as_deref()) {
            Ok(quotes) => future::ready(Ok(quotes)),
            Err(err) => future::ready(Err(self.fail(err))),
        }
    }

    fn health(&mut self) -> impl Future<Output = Result<String>> {
        future::ready(Ok("ok".to_string()))
    }
}
