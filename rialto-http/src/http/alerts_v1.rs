use std::future::Future;
use std::sync::Mutex;

use actix_web::HttpRequest;
use anyhow::Result;
use serde::{Deserialize, Serialize};

use rialto::alert::{Alert, AlertLog, NewAlert};
use rialto::bus::{AlertBus, AlertEvent};
use rialto::market::{MarketBoard, MarketQuote};
use rialto::token::{Claims, TokenSigner};
use rialto::user::{ActiveUser, UserDirectory, UserProfile};

/// Shared state behind the backend API. Collections sit behind their own locks so
/// that unrelated routes do not serialize against each other; event broadcasts fire
/// only after the owning lock has been released.
pub struct AppState {
    pub alerts: Mutex<AlertLog>,
    pub users: Mutex<UserDirectory>,
    pub market: Mutex<MarketBoard>,
    pub bus: AlertBus,
    pub signer: TokenSigner,
    pub require_admin: bool,
}

impl AppState {
    pub fn new(signer: TokenSigner, require_admin: bool) -> Self {
        Self {
            alerts: Mutex::new(AlertLog::new()),
            users: Mutex::new(UserDirectory::demo()),
            market: Mutex::new(MarketBoard::random(vec!["BTC", "ETH", "SOL", "SPY"])),
            bus: AlertBus::default(),
            signer,
            require_admin,
        }
    }

    /// Demo configuration: secrets and policy from the environment, admin
    /// enforcement on mutating routes defaults to on.
    pub fn demo() -> Self {
        Self::new(TokenSigner::from_env(), require_admin_from_env())
    }

    fn claims(&self, token: Option<&str>) -> Result<Claims, AlertsV1Error> {
        let token = token.ok_or(AlertsV1Error::Unauthorized)?;
        self.signer
            .verify(token)
            .map_err(|_| AlertsV1Error::InvalidToken)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<AuthResponse, AlertsV1Error> {
        let users = self.users.lock().unwrap();
        let user = users
            .authenticate(username, password)
            .ok_or(AlertsV1Error::InvalidCredentials)?;
        Ok(AuthResponse {
            token: self.signer.issue(&user.id, &user.username, user.is_admin),
            user: user.clone(),
        })
    }

    pub fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AlertsV1Error> {
        let (username, email, password) = match (
            request.username.as_deref(),
            request.email.as_deref(),
            request.password.as_deref(),
        ) {
            (Some(username), Some(email), Some(password))
                if !username.is_empty() && !email.is_empty() && !password.is_empty() =>
            {
                (username, email, password)
            }
            _ => return Err(AlertsV1Error::MissingFields),
        };
        // The demo backend validates the email but does not persist it
        let _ = email;

        let user = {
            let mut users = self.users.lock().unwrap();
            users
                .register(username, password)
                .ok_or(AlertsV1Error::UsernameExists)?
        };
        Ok(AuthResponse {
            token: self.signer.issue(&user.id, &user.username, user.is_admin),
            user,
        })
    }

    pub fn profile(&self, token: Option<&str>) -> Result<UserProfile, AlertsV1Error> {
        let claims = self.claims(token)?;
        let users = self.users.lock().unwrap();
        // Older tokens carried the username only
        users
            .find_by_id(&claims.sub)
            .or_else(|| users.find_by_username(&claims.username))
            .cloned()
            .ok_or(AlertsV1Error::InvalidToken)
    }

    pub fn list_alerts(&self, type_filter: Option<&str>) -> Vec<Alert> {
        let filter = type_filter.filter(|typ| !typ.is_empty());
        self.alerts.lock().unwrap().list(filter)
    }

    pub fn create_alert(
        &self,
        token: Option<&str>,
        new_alert: NewAlert,
    ) -> Result<Alert, AlertsV1Error> {
        let claims = self.claims(token)?;
        if self.require_admin && !claims.is_admin {
            return Err(AlertsV1Error::AdminOnly);
        }
        if new_alert.title.trim().is_empty() || new_alert.message.trim().is_empty() {
            return Err(AlertsV1Error::MissingTitleOrMessage);
        }

        let alert = {
            let mut alerts = self.alerts.lock().unwrap();
            alerts.create(new_alert)
        };
        self.bus.publish(AlertEvent::Created(alert.clone()));
        Ok(alert)
    }

    pub fn delete_alert(&self, token: Option<&str>, id: &str) -> Result<(), AlertsV1Error> {
        let claims = self.claims(token)?;
        if self.require_admin && !claims.is_admin {
            return Err(AlertsV1Error::AdminOnly);
        }

        {
            let mut alerts = self.alerts.lock().unwrap();
            alerts.delete(id).ok_or(AlertsV1Error::NotFound)?;
        }
        self.bus.publish(AlertEvent::Deleted { id: id.to_string() });
        Ok(())
    }

    pub fn active_users(&self) -> Vec<ActiveUser> {
        self.users.lock().unwrap().active()
    }

    pub fn market_data(&self, token: Option<&str>) -> Result<Vec<MarketQuote>, AlertsV1Error> {
        let Some(token) = token else {
            return Err(AlertsV1Error::SubscriptionRequired);
        };
        let claims = self
            .signer
            .verify(token)
            .map_err(|_| AlertsV1Error::InvalidToken)?;

        let tier = {
            let users = self.users.lock().unwrap();
            users
                .find_by_id(&claims.sub)
                .map(|user| user.tier)
                .ok_or(AlertsV1Error::InvalidToken)?
        };
        if !tier.can_view_market() {
            return Err(AlertsV1Error::SubscriptionRequired);
        }

        let mut market = self.market.lock().unwrap();
        market.refresh();
        Ok(market.quotes())
    }
}

/// `RIALTO_REQUIRE_ADMIN` toggles admin enforcement on alert create/delete. Any
/// value other than an explicit off keeps enforcement on.
pub fn require_admin_from_env() -> bool {
    match std::env::var("RIALTO_REQUIRE_ADMIN") {
        Ok(raw) => !matches!(raw.trim(), "0" | "false" | "off"),
        Err(_) => true,
    }
}

/// Strips the `Bearer ` prefix from an inbound Authorization header.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)?
        .to_str()
        .ok()
        .map(|raw| raw.strip_prefix("Bearer ").unwrap_or(raw))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LegacyProfileRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AlertsQuery {
    #[serde(rename = "type")]
    pub typ: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeleteAlertResponse {
    pub ok: bool,
}

/// Error body shared by every failing route: `{"error": "..."}`.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AlertsV1Error {
    InvalidCredentials,
    Unauthorized,
    InvalidToken,
    MissingFields,
    UsernameExists,
    MissingTitleOrMessage,
    AdminOnly,
    SubscriptionRequired,
    NotFound,
}

impl AlertsV1Error {
    pub fn status(&self) -> u16 {
        match self {
            AlertsV1Error::InvalidCredentials
            | AlertsV1Error::Unauthorized
            | AlertsV1Error::InvalidToken => 401,
            AlertsV1Error::MissingFields | AlertsV1Error::MissingTitleOrMessage => 400,
            AlertsV1Error::UsernameExists => 409,
            AlertsV1Error::AdminOnly | AlertsV1Error::SubscriptionRequired => 403,
            AlertsV1Error::NotFound => 404,
        }
    }
}

impl std::error::Error for AlertsV1Error {}

impl core::fmt::Display for AlertsV1Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AlertsV1Error::InvalidCredentials => write!(f, "Invalid credentials"),
            AlertsV1Error::Unauthorized => write!(f, "Unauthorized"),
            AlertsV1Error::InvalidToken => write!(f, "Invalid token"),
            AlertsV1Error::MissingFields => write!(f, "Missing fields"),
            AlertsV1Error::UsernameExists => write!(f, "Username already exists"),
            AlertsV1Error::MissingTitleOrMessage => write!(f, "Missing title or message"),
            AlertsV1Error::AdminOnly => write!(f, "Admin only"),
            AlertsV1Error::SubscriptionRequired => write!(f, "Subscription required"),
            AlertsV1Error::NotFound => write!(f, "Not found"),
        }
    }
}

impl actix_web::ResponseError for AlertsV1Error {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.status())
            .expect("error statuses are valid codes")
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

pub trait Client {
    fn login(
        &mut self,
        username: String,
        password: String,
    ) -> impl Future<Output = Result<AuthResponse>>;
    fn register(
        &mut self,
        username: String,
        email: String,
        password: String,
    ) -> impl Future<Output = Result<AuthResponse>>;
    fn profile(&mut self) -> impl Future<Output = Result<UserProfile>>;
    fn list_alerts(
        &mut self,
        type_filter: Option<String>,
    ) -> impl Future<Output = Result<Vec<Alert>>>;
    fn create_alert(&mut self, new_alert: NewAlert) -> impl Future<Output = Result<Alert>>;
    fn delete_alert(&mut self, id: String) -> impl Future<Output = Result<DeleteAlertResponse>>;
    fn active_users(&mut self) -> impl Future<Output = Result<Vec<ActiveUser>>>;
    fn market_data(&mut self) -> impl Future<Output = Result<Vec<MarketQuote>>>;
    fn health(&mut self) -> impl Future<Output = Result<String>>;
}

pub mod server {
    use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};

    use rialto::alert::{Alert, NewAlert};
    use rialto::user::{ActiveUser, UserProfile};

    use super::{
        bearer_token, AlertsQuery, AlertsV1Error, AppState, AuthResponse, DeleteAlertResponse,
        LegacyProfileRequest, LoginRequest, RegisterRequest,
    };

    #[post("/api/auth/login")]
    pub async fn login(
        app: web::Data<AppState>,
        login: web::Json<LoginRequest>,
    ) -> Result<web::Json<AuthResponse>, AlertsV1Error> {
        Ok(web::Json(app.login(&login.username, &login.password)?))
    }

    // Kept for older dashboard builds that call /api/login directly
    #[post("/api/login")]
    pub async fn login_legacy(
        app: web::Data<AppState>,
        body: web::Json<LoginRequest>,
    ) -> Result<web::Json<AuthResponse>, AlertsV1Error> {
        Ok(web::Json(app.login(&body.username, &body.password)?))
    }

    #[post("/api/auth/register")]
    pub async fn register(
        app: web::Data<AppState>,
        register: web::Json<RegisterRequest>,
    ) -> Result<HttpResponse, AlertsV1Error> {
        let auth = app.register(&register)?;
        Ok(HttpResponse::Created().json(auth))
    }

    #[get("/api/auth/profile")]
    pub async fn profile(
        req: HttpRequest,
        app: web::Data<AppState>,
    ) -> Result<web::Json<UserProfile>, AlertsV1Error> {
        Ok(web::Json(app.profile(bearer_token(&req))?))
    }

    // Body-token profile lookup kept for compatibility; every failure collapses to
    // the same invalid-token response
    #[post("/api/profile")]
    pub async fn profile_legacy(
        app: web::Data<AppState>,
        body: web::Json<LegacyProfileRequest>,
    ) -> Result<web::Json<UserProfile>, AlertsV1Error> {
        let user = app
            .profile(body.token.as_deref())
            .map_err(|_| AlertsV1Error::InvalidToken)?;
        Ok(web::Json(user))
    }

    #[get("/api/alerts")]
    pub async fn list_alerts(
        app: web::Data<AppState>,
        query: web::Query<AlertsQuery>,
    ) -> web::Json<Vec<Alert>> {
        web::Json(app.list_alerts(query.typ.as_deref()))
    }

    #[post("/api/alerts")]
    pub async fn create_alert(
        req: HttpRequest,
        app: web::Data<AppState>,
        new_alert: web::Json<NewAlert>,
    ) -> Result<HttpResponse, AlertsV1Error> {
        let alert = app.create_alert(bearer_token(&req), new_alert.into_inner())?;
        Ok(HttpResponse::Created().json(alert))
    }

    #[delete("/api/alerts/{id}")]
    pub async fn delete_alert(
        req: HttpRequest,
        app: web::Data<AppState>,
        path: web::Path<(String,)>,
    ) -> Result<web::Json<DeleteAlertResponse>, AlertsV1Error> {
        let (id,) = path.into_inner();
        app.delete_alert(bearer_token(&req), &id)?;
        Ok(web::Json(DeleteAlertResponse { ok: true }))
    }

    #[get("/api/users/active")]
    pub async fn active_users(app: web::Data<AppState>) -> web::Json<Vec<ActiveUser>> {
        web::Json(app.active_users())
    }

    #[get("/api/market/data")]
    pub async fn market_data(
        req: HttpRequest,
        app: web::Data<AppState>,
    ) -> Result<HttpResponse, AlertsV1Error> {
        let quotes = app.market_data(bearer_token(&req))?;
        Ok(HttpResponse::Ok().json(quotes))
    }

    #[get("/healthz")]
    pub async fn healthz() -> &'static str {
        "ok"
    }
}
