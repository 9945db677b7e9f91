use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::coordinator::Coordinator;
use crate::device::{MANUAL_SIMULATION_INDEFINITE, ManualColor};
use crate::error::ApiResult;
use crate::model::snapshot::Snapshot;

/// Scale factor between the device range (0-100) and the presentation range
/// (0-255).
const SCALE: f64 = 2.55;

/// Light view derived purely from the snapshot's RGBW channels. The
/// controller has no independent power-state field; "on" is synthesized as
/// "any channel above zero".
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    pub is_on: bool,
    /// 0-255, the maximum of the presented channels.
    pub brightness: u8,
    /// (red, green, blue, white) on the presentation scale.
    pub rgbw_color: (u8, u8, u8, u8),
}

impl LightState {
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let channels = [snapshot.red, snapshot.green, snapshot.blue, snapshot.white];

        if channels == [0, 0, 0, 0] {
            return Self {
                is_on: false,
                brightness: 0,
                rgbw_color: (0, 0, 0, 0),
            };
        }

        let rgbw_color = (
            present(snapshot.red),
            present(snapshot.green),
            present(snapshot.blue),
            present(snapshot.white),
        );

        Self {
            is_on: true,
            brightness: channels.into_iter().map(present).max().unwrap_or(0),
            rgbw_color,
        }
    }
}

/// Device scale (0-100) to presentation scale (0-255).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn present(raw: u8) -> u8 {
    (f64::from(raw) * SCALE).round().clamp(0.0, 255.0) as u8
}

/// Presentation scale (0-255) to device scale (0-100).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_device(channel: u8) -> u8 {
    (f64::from(channel) / SCALE).round().clamp(0.0, 100.0) as u8
}

/// Write adapter for one tank light.
///
/// Command failures are propagated to the caller, unlike poll failures; the
/// optimistic state write-through happens only after both device calls
/// succeeded.
pub struct TankLight {
    tank_name: String,
    coordinator: Arc<Coordinator>,
}

impl TankLight {
    #[must_use]
    pub fn new(tank_name: &str, coordinator: Arc<Coordinator>) -> Self {
        Self {
            tank_name: tank_name.to_string(),
            coordinator,
        }
    }

    #[must_use]
    pub fn state(&self) -> LightState {
        LightState::from_snapshot(&self.coordinator.state().snapshot)
    }

    /// Turn the light on. Omitted parameters default to full-scale.
    ///
    /// The requested brightness is accepted for interface compatibility but
    /// does not attenuate the channel values: brightness is derived from the
    /// channel maxima on read, so the channels alone carry it.
    pub async fn turn_on(
        &self,
        brightness: Option<u8>,
        rgbw_color: Option<(u8, u8, u8, u8)>,
    ) -> ApiResult<()> {
        let brightness = brightness.unwrap_or(255);
        let (red, green, blue, white) = rgbw_color.unwrap_or((255, 255, 255, 255));

        log::debug!(
            "[{}] Turn on: brightness {brightness}, rgbw ({red}, {green}, {blue}, {white})",
            self.tank_name
        );

        self.send_manual_color(ManualColor {
            white: to_device(white),
            blue: to_device(blue),
            green: to_device(green),
            red: to_device(red),
        })
        .await
    }

    pub async fn turn_off(&self) -> ApiResult<()> {
        log::debug!("[{}] Turn off", self.tank_name);
        self.send_manual_color(ManualColor::OFF).await
    }

    async fn send_manual_color(&self, color: ManualColor) -> ApiResult<()> {
        {
            let device = self.coordinator.device();
            let device = device.lock().await;
            device
                .start_manual_color_simulation(MANUAL_SIMULATION_INDEFINITE)
                .await?;
            device.set_manual_color(color).await?;
        }

        self.coordinator.apply_manual_color(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    use crate::device::DeviceClient;
    use crate::error::{ApiError, ApiResult};
    use crate::model::status::normalize;

    use super::*;

    #[test]
    fn off_snapshot_presents_black() {
        let state = LightState::from_snapshot(&Snapshot::default());
        assert!(!state.is_on);
        assert_eq!(state.brightness, 0);
        assert_eq!(state.rgbw_color, (0, 0, 0, 0));
    }

    #[test]
    fn single_channel_presentation() {
        let mut snapshot = Snapshot::default();
        snapshot.merge(normalize(&json!({ "currentRed": 50 })).unwrap());

        let state = LightState::from_snapshot(&snapshot);
        assert!(state.is_on);
        assert_eq!(state.rgbw_color, (128, 0, 0, 0));
        assert_eq!(state.brightness, 128);
    }

    #[test]
    fn is_on_iff_any_channel_above_zero() {
        for (r, g, b, w) in [(1, 0, 0, 0), (0, 1, 0, 0), (0, 0, 1, 0), (0, 0, 0, 1)] {
            let snapshot = Snapshot {
                red: r,
                green: g,
                blue: b,
                white: w,
                ..Snapshot::default()
            };
            assert!(LightState::from_snapshot(&snapshot).is_on);
        }
    }

    #[test]
    fn brightness_is_channel_maximum() {
        let snapshot = Snapshot {
            red: 20,
            green: 80,
            blue: 5,
            white: 40,
            ..Snapshot::default()
        };
        let state = LightState::from_snapshot(&snapshot);
        assert_eq!(state.brightness, present(80));
    }

    #[test]
    fn scale_round_trip_within_tolerance() {
        for raw in 0..=100_u8 {
            let presented = present(raw);
            let back = to_device(presented);
            assert!(
                i16::from(back).abs_diff(i16::from(raw)) <= 1,
                "device {raw} -> presented {presented} -> device {back}"
            );
        }
    }

    /* command flow */

    enum Call {
        StartSimulation(u32),
        SetColor(ManualColor),
    }

    #[derive(Default)]
    struct ScriptedClient {
        calls: StdMutex<Vec<Call>>,
        fail_set_color: bool,
        status: StdMutex<VecDeque<Value>>,
    }

    #[async_trait]
    impl DeviceClient for ScriptedClient {
        async fn get_status(&self) -> ApiResult<Value> {
            self.status
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ApiError::service_error("no status scripted"))
        }

        async fn start_manual_color_simulation(&self, minutes: u32) -> ApiResult<()> {
            self.calls.lock().unwrap().push(Call::StartSimulation(minutes));
            Ok(())
        }

        async fn set_manual_color(&self, color: ManualColor) -> ApiResult<()> {
            if self.fail_set_color {
                return Err(ApiError::service_error("manual color rejected"));
            }
            self.calls.lock().unwrap().push(Call::SetColor(color));
            Ok(())
        }
    }

    fn wire(client: ScriptedClient) -> (Arc<Mutex<ScriptedClient>>, TankLight) {
        let client = Arc::new(Mutex::new(client));
        let coordinator = Arc::new(Coordinator::new(
            "test-tank",
            client.clone(),
            Duration::from_secs(60),
        ));
        (client, TankLight::new("test-tank", coordinator))
    }

    #[tokio::test]
    async fn turn_off_sequences_simulation_then_zero_color() {
        let (client, light) = wire(ScriptedClient::default());

        light.turn_off().await.unwrap();

        let guard = client.lock().await;
        let calls = guard.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(matches!(
            calls[0],
            Call::StartSimulation(MANUAL_SIMULATION_INDEFINITE)
        ));
        assert!(matches!(calls[1], Call::SetColor(ManualColor::OFF)));
        drop(calls);
        drop(guard);

        let state = light.state();
        assert!(!state.is_on);
        assert_eq!(state.rgbw_color, (0, 0, 0, 0));
    }

    #[tokio::test]
    async fn turn_on_defaults_to_full_scale() {
        let (client, light) = wire(ScriptedClient::default());

        light.turn_on(None, None).await.unwrap();

        let guard = client.lock().await;
        let calls = guard.calls.lock().unwrap();
        assert!(matches!(
            calls[1],
            Call::SetColor(ManualColor {
                white: 100,
                blue: 100,
                green: 100,
                red: 100,
            })
        ));
        drop(calls);
        drop(guard);

        let state = light.state();
        assert!(state.is_on);
        assert_eq!(state.brightness, 255);
        assert_eq!(state.rgbw_color, (255, 255, 255, 255));
    }

    #[tokio::test]
    async fn turn_on_converts_channels_to_device_scale() {
        let (client, light) = wire(ScriptedClient::default());

        light.turn_on(Some(255), Some((128, 0, 0, 0))).await.unwrap();

        let guard = client.lock().await;
        let calls = guard.calls.lock().unwrap();
        assert!(matches!(
            calls[1],
            Call::SetColor(ManualColor {
                white: 0,
                blue: 0,
                green: 0,
                red: 50,
            })
        ));
    }

    #[tokio::test]
    async fn command_failure_propagates_without_optimistic_commit() {
        let (_client, light) = wire(ScriptedClient {
            fail_set_color: true,
            ..ScriptedClient::default()
        });

        let res = light.turn_on(None, None).await;
        assert!(res.is_err());

        // no write-through happened
        let state = light.state();
        assert!(!state.is_on);
        assert_eq!(state.rgbw_color, (0, 0, 0, 0));
    }
}
