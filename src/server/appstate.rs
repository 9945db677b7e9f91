use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::coordinator::Coordinator;
use crate::entities::light::TankLight;
use crate::error::{ApiError, ApiResult};

/// One fully wired tank: the refresh coordinator plus its presentation
/// adapters.
pub struct Tank {
    pub name: String,
    pub coordinator: Arc<Coordinator>,
    pub light: TankLight,
}

#[derive(Clone)]
pub struct AppState {
    conf: Arc<AppConfig>,
    tanks: Arc<BTreeMap<String, Tank>>,
}

impl AppState {
    #[must_use]
    pub fn new(conf: AppConfig, tanks: BTreeMap<String, Tank>) -> Self {
        Self {
            conf: Arc::new(conf),
            tanks: Arc::new(tanks),
        }
    }

    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        self.conf.clone()
    }

    pub fn tank(&self, key: &str) -> ApiResult<&Tank> {
        self.tanks
            .get(key)
            .ok_or_else(|| ApiError::TankNotFound(key.to_string()))
    }

    #[must_use]
    pub fn tank_keys(&self) -> Vec<String> {
        self.tanks.keys().cloned().collect()
    }
}
