use serde_json::{Map, Value};

pub const DEFAULT_PROFILE: &str = "offline";
pub const DEFAULT_DEVICE_TIME: &str = "00:00";

/// One normalized reading produced from a raw status payload.
///
/// Canonical fields are always present (missing wire keys fall back to their
/// defaults); everything unrecognized is carried verbatim in `extra` so newer
/// firmware fields survive the round trip through the snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusUpdate {
    pub current_profile: String,
    pub device_time: String,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
    pub manual_color_simulation_enabled: bool,
    pub manual_daytime_simulation_enabled: bool,
    pub extra: Map<String, Value>,
}

const RECOGNIZED_KEYS: &[&str] = &[
    "currentProfile",
    "deviceTime",
    "currentRed",
    "currentGreen",
    "currentBlue",
    "currentWhite",
    "manualColorSimulationEnabled",
    "manualDaytimeSimulationEnabled",
];

fn text(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn channel(obj: &Map<String, Value>, key: &str) -> u8 {
    obj.get(key)
        .and_then(Value::as_u64)
        .map_or(0, |x| u8::try_from(x.min(100)).unwrap_or(100))
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Normalize a raw status payload into a [`StatusUpdate`].
///
/// Returns `None` when the payload is not an object. That is "no new
/// information", not an all-defaults reading; callers must skip the merge
/// for this tick instead of regressing the snapshot.
#[must_use]
pub fn normalize(raw: &Value) -> Option<StatusUpdate> {
    let obj = raw.as_object()?;

    let extra = obj
        .iter()
        .filter(|(key, _)| !RECOGNIZED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Some(StatusUpdate {
        current_profile: text(obj, "currentProfile", DEFAULT_PROFILE),
        device_time: text(obj, "deviceTime", DEFAULT_DEVICE_TIME),
        red: channel(obj, "currentRed"),
        green: channel(obj, "currentGreen"),
        blue: channel(obj, "currentBlue"),
        white: channel(obj, "currentWhite"),
        manual_color_simulation_enabled: flag(obj, "manualColorSimulationEnabled"),
        manual_daytime_simulation_enabled: flag(obj, "manualDaytimeSimulationEnabled"),
        extra,
    })
}
