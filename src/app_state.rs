use std::sync::Arc;

use crate::admission::{AdmissionCoordinator, AdmissionPolicy};
use crate::config::Config;
use crate::hub::Hub;
use crate::relay::Relay;

// Состояние приложения, общее для всех соединений
#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub admission: Arc<AdmissionCoordinator>,
    pub relay: Relay,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let hub = Hub::new();
        let admission = Arc::new(AdmissionCoordinator::new(
            hub.clone(),
            AdmissionPolicy::from(&config),
        ));
        Self {
            relay: Relay::new(hub.clone()),
            hub,
            admission,
            config: Arc::new(config),
        }
    }
}
