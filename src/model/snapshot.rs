use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::model::status::{DEFAULT_DEVICE_TIME, DEFAULT_PROFILE, StatusUpdate};

/// Last known good state of one controller, merged across refresh cycles.
///
/// Fields only accumulate or get overwritten. A failed poll never touches the
/// snapshot, so dependent sensors keep rendering the previous reading instead
/// of flickering back to defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub current_profile: String,
    /// Controller clock, HH:MM.
    pub device_time: String,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
    pub manual_color_simulation_enabled: bool,
    pub manual_daytime_simulation_enabled: bool,
    /// Unrecognized wire fields, passed through for forward compatibility.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            current_profile: DEFAULT_PROFILE.to_string(),
            device_time: DEFAULT_DEVICE_TIME.to_string(),
            red: 0,
            green: 0,
            blue: 0,
            white: 0,
            manual_color_simulation_enabled: false,
            manual_daytime_simulation_enabled: false,
            extra: Map::new(),
        }
    }
}

impl Snapshot {
    /// Apply one normalized reading. Canonical fields are overwritten; extra
    /// fields are upserted, so keys absent from this update survive.
    pub fn merge(&mut self, update: StatusUpdate) {
        self.current_profile = update.current_profile;
        self.device_time = update.device_time;
        self.red = update.red;
        self.green = update.green;
        self.blue = update.blue;
        self.white = update.white;
        self.manual_color_simulation_enabled = update.manual_color_simulation_enabled;
        self.manual_daytime_simulation_enabled = update.manual_daytime_simulation_enabled;

        for (key, value) in update.extra {
            self.extra.insert(key, value);
        }
    }

    /// Render the full attribute map (canonical fields plus extras) for the
    /// status sensor. Canonical fields win on key collision.
    #[must_use]
    pub fn to_attributes(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        map.insert("current_profile".to_string(), json!(self.current_profile));
        map.insert("device_time".to_string(), json!(self.device_time));
        map.insert("red".to_string(), json!(self.red));
        map.insert("green".to_string(), json!(self.green));
        map.insert("blue".to_string(), json!(self.blue));
        map.insert("white".to_string(), json!(self.white));
        map.insert(
            "manual_color_simulation_enabled".to_string(),
            json!(self.manual_color_simulation_enabled),
        );
        map.insert(
            "manual_daytime_simulation_enabled".to_string(),
            json!(self.manual_daytime_simulation_enabled),
        );
        map
    }
}
