mod helialux;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiResult;

pub use self::helialux::HelialuxClient;

/// Duration (in minutes) passed to
/// [`DeviceClient::start_manual_color_simulation`] to keep the controller in
/// manual mode until explicitly released. 23:59 is the longest runtime the
/// firmware accepts.
pub const MANUAL_SIMULATION_INDEFINITE: u32 = 1439;

/// Channel values on the device scale (0-100), in the controller's own
/// channel order.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ManualColor {
    pub white: u8,
    pub blue: u8,
    pub green: u8,
    pub red: u8,
}

impl ManualColor {
    pub const OFF: Self = Self {
        white: 0,
        blue: 0,
        green: 0,
        red: 0,
    };
}

/// Transport boundary towards one HeliaLux controller.
///
/// Implementations own timeout and retry policy; callers treat any error as a
/// single failure signal and do not stack a second timeout layer on top.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Fetch the raw status payload. The shape is not guaranteed; consumers
    /// must normalize defensively.
    async fn get_status(&self) -> ApiResult<Value>;

    async fn start_manual_color_simulation(&self, minutes: u32) -> ApiResult<()>;

    async fn set_manual_color(&self, color: ManualColor) -> ApiResult<()>;
}
