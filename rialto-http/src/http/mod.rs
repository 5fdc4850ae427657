//! Route handlers and wire types. Both servers attach the same CORS policy: a
//! configured origin list enables credentials, a wildcard never does, as the two
//! together are rejected by browsers.
use actix_cors::Cors;

pub mod alerts_v1;
pub mod proxy_v1;

/// Comma-separated origin list from `RIALTO_ALLOWED_ORIGINS`, defaulting to a
/// wildcard for local development.
pub fn allowed_origins_from_env() -> Vec<String> {
    let raw = std::env::var("RIALTO_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());
    let origins: Vec<String> = raw
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();
    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

pub fn permissive_cors(origins: &[String]) -> Cors {
    if origins.iter().any(|origin| origin == "*") {
        // Wildcard and credentials are mutually exclusive
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(86400)
    } else {
        let mut cors = Cors::default()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(86400);
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors
    }
}
