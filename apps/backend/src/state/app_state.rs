use std::sync::Arc;

use crate::services::games::GameService;
use crate::store::GameStore;
use crate::ws::hub::{RoomHub, WsHub};

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn GameStore>,
    hub: Arc<WsHub>,
    service: Arc<GameService>,
}

impl AppState {
    pub fn new(store: Arc<dyn GameStore>, hub: Arc<WsHub>) -> Self {
        let service = Arc::new(GameService::new(
            Arc::clone(&store),
            Arc::clone(&hub) as Arc<dyn RoomHub>,
        ));
        Self {
            store,
            hub,
            service,
        }
    }

    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    pub fn hub(&self) -> &Arc<WsHub> {
        &self.hub
    }

    pub fn service(&self) -> Arc<GameService> {
        Arc::clone(&self.service)
    }
}
