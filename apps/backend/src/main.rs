use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use daruma_backend::config::redis::redis_url;
use daruma_backend::middleware::cors::cors_middleware;
use daruma_backend::routes;
use daruma_backend::state::app_state::AppState;
use daruma_backend::store::redis::RedisStore;
use daruma_backend::store::GameStore;
use daruma_backend::ws::hub::WsHub;

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment:
    // - Docker: Set via docker-compose env_file or docker run --env-file
    // - Local dev: Source env files manually (e.g., set -a; . ./.env; set +a)
    let host = std::env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("BACKEND_PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            eprintln!("❌ BACKEND_PORT must be a valid port number");
            std::process::exit(1);
        });

    println!("🚀 Starting Daruma Backend on http://{}:{}", host, port);

    let store = match RedisStore::connect(&redis_url()).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ Failed to connect to Redis: {e}");
            std::process::exit(1);
        }
    };

    println!("✅ Redis connected");

    let store: Arc<dyn GameStore> = Arc::new(store);
    let hub = Arc::new(WsHub::new());
    let app_state = AppState::new(store, hub);

    // Wrap AppState with web::Data before passing to HttpServer
    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware())
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
