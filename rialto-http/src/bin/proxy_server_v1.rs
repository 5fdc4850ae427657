use std::env;

use actix_web::{web, App, HttpServer};

use rialto_http::http::proxy_v1::{
    server::{forward, forward_path, health, not_found},
    ProxyState,
};
use rialto_http::http::{allowed_origins_from_env, permissive_cors};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let address: String = args[1].clone();
    let port: u16 = args[2].parse().unwrap();

    let origins = allowed_origins_from_env();
    let proxy_state = web::Data::new(ProxyState::from_env());
    log::info!("proxy target backend: {}", proxy_state.backend_url);

    HttpServer::new(move || {
        App::new()
            .wrap(permissive_cors(&origins))
            .app_data(proxy_state.clone())
            .service(forward)
            .service(forward_path)
            .service(health)
            .default_service(web::route().to(not_found))
    })
    .bind((address, port))?
    .run()
    .await
}
