use std::env;

use actix_web::{web, App, HttpServer};

use rialto_http::http::alerts_v1::{
    server::{
        active_users, create_alert, delete_alert, healthz, list_alerts, login, login_legacy,
        market_data, profile, profile_legacy, register,
    },
    AppState,
};
use rialto_http::http::{allowed_origins_from_env, permissive_cors};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let address: String = args[1].clone();
    let port: u16 = args[2].parse().unwrap();

    let origins = allowed_origins_from_env();
    let app_state = web::Data::new(AppState::demo());

    HttpServer::new(move || {
        App::new()
            .wrap(permissive_cors(&origins))
            .app_data(app_state.clone())
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
    .bind((address, port))?
    .run()
    .await
}
