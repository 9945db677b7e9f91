use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use camino::Utf8Path;
use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct ServerConfig {
    pub ipaddress: Ipv4Addr,
    pub port: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct TankConfig {
    pub host: String,
    /// Either a bare scheme ("http") or a full prefix ("http://"); some
    /// installations configure the latter.
    pub protocol: String,
    /// Poll cadence in minutes. The wiring tightens this to a seconds-scale
    /// cadence once the first refresh has completed.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    /// Display name; the map key is used when absent.
    pub name: Option<String>,
}

const fn default_update_interval() -> u64 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub tanks: BTreeMap<String, TankConfig>,
}

impl AppConfig {
    #[must_use]
    pub fn has_tanks(&self) -> bool {
        !self.tanks.is_empty()
    }
}

impl TankConfig {
    #[must_use]
    pub fn display_name(&self, key: &str) -> String {
        self.name.clone().unwrap_or_else(|| key.to_string())
    }
}

pub fn parse(filename: &Utf8Path) -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        .set_default("server.ipaddress", "0.0.0.0")?
        .set_default("server.port", 8920)?
        .add_source(config::File::with_name(filename.as_str()))
        .build()?;

    settings.try_deserialize()
}
