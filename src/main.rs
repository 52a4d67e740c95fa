use log::{error, info, warn};
use std::sync::Arc;
use trusty_poll::config::Config;
use trusty_poll::db::{MemoryStorage, PollStorage};
use trusty_poll::handlers::{self, AppState};
use trusty_poll::share::ShareLinkCodec;
use trusty_poll::store::PollStore;

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let codec = match ShareLinkCodec::new(&config.base_url) {
        Ok(codec) => codec,
        Err(e) => {
            error!("BASE_URL {:?} is not a valid URL: {}", config.base_url, e);
            return;
        }
    };

    // A backend that cannot be opened leaves us serving from memory only
    let storage: Arc<dyn PollStorage> = match config.open_storage().await {
        Ok(storage) => storage,
        Err(e) => {
            warn!("Failed to open {:?} storage, polls will not persist: {}", config.storage, e);
            Arc::new(MemoryStorage::new())
        }
    };

    let store = PollStore::open(storage).await;
    let router = handlers::build_router(AppState::new(store, codec));

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind port {}: {}", config.port, e);
            return;
        }
    };
    info!("Listening on port {}, sharing links under {}", config.port, config.base_url);

    if let Err(why) = axum::serve(listener, router).await {
        error!("Server error: {:?}", why);
    }
}
