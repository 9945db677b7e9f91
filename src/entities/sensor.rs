use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::coordinator::TankState;

/// Classification of an attribute sensor, mirroring how automation platforms
/// group readings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorClass {
    Measurement,
    Diagnostic,
}

pub struct AttributeSpec {
    pub field: &'static str,
    pub unit: Option<&'static str>,
    pub class: SensorClass,
}

/// One row per attribute sensor. A single renderer consumes this table
/// instead of one entity type per attribute.
pub const ATTRIBUTE_SENSORS: &[AttributeSpec] = &[
    AttributeSpec {
        field: "current_profile",
        unit: None,
        class: SensorClass::Diagnostic,
    },
    AttributeSpec {
        field: "white",
        unit: Some("%"),
        class: SensorClass::Measurement,
    },
    AttributeSpec {
        field: "blue",
        unit: Some("%"),
        class: SensorClass::Measurement,
    },
    AttributeSpec {
        field: "green",
        unit: Some("%"),
        class: SensorClass::Measurement,
    },
    AttributeSpec {
        field: "red",
        unit: Some("%"),
        class: SensorClass::Measurement,
    },
    AttributeSpec {
        field: "manual_color_simulation_enabled",
        unit: None,
        class: SensorClass::Diagnostic,
    },
    AttributeSpec {
        field: "manual_daytime_simulation_enabled",
        unit: None,
        class: SensorClass::Diagnostic,
    },
    AttributeSpec {
        field: "device_time",
        unit: None,
        class: SensorClass::Diagnostic,
    },
];

#[derive(Clone, Debug, Serialize)]
pub struct SensorReading {
    pub field: &'static str,
    pub value: Value,
    pub unit: Option<&'static str>,
    pub class: SensorClass,
}

/// The tank's presence sensor: overall state plus the full attribute map.
#[derive(Clone, Debug, Serialize)]
pub struct StatusSensor {
    pub state: &'static str,
    pub extra_attributes: Value,
    pub polls: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[must_use]
pub fn status_sensor(state: &TankState) -> StatusSensor {
    StatusSensor {
        state: if state.online() { "online" } else { "offline" },
        extra_attributes: Value::Object(state.snapshot.to_attributes()),
        polls: state.polls,
        last_success: state.last_success,
        last_error: state.last_error.clone(),
    }
}

#[must_use]
pub fn attribute_sensors(state: &TankState) -> Vec<SensorReading> {
    let attrs = state.snapshot.to_attributes();

    ATTRIBUTE_SENSORS
        .iter()
        .map(|spec| SensorReading {
            field: spec.field,
            value: attrs.get(spec.field).cloned().unwrap_or(Value::Null),
            unit: spec.unit,
            class: spec.class,
        })
        .collect()
}
