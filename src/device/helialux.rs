use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::TankConfig;
use crate::device::{DeviceClient, ManualColor};
use crate::error::{ApiError, ApiResult};

pub struct HelialuxClient {
    tank_name: String,
    base_url: Url,
    http: reqwest::Client,
}

impl HelialuxClient {
    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn new(tank_name: &str, config: &TankConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            tank_name: tank_name.to_string(),
            base_url: Self::base_url(&config.protocol, &config.host)?,
            http,
        })
    }

    /// Controllers are usually configured as a bare host plus a scheme, but
    /// some installations carry the full "scheme://" prefix in the protocol
    /// field already.
    fn base_url(protocol: &str, host: &str) -> ApiResult<Url> {
        let raw = if protocol.contains("://") {
            format!("{protocol}{host}")
        } else {
            format!("{protocol}://{host}")
        };
        Ok(Url::parse(&raw)?)
    }

    fn endpoint_url(&self, endpoint: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
        action: &str,
    ) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| String::new());

        let details = if body.is_empty() {
            format!("{status}")
        } else {
            format!("{status}: {body}")
        };

        Err(ApiError::DeviceError(
            format!("[{}] {action}", self.tank_name),
            details,
        ))
    }

    /// The firmware encodes simulation runtime as HH:MM.
    fn ctime(minutes: u32) -> String {
        format!("{:02}:{:02}", minutes / 60, minutes % 60)
    }
}

#[async_trait]
impl DeviceClient for HelialuxClient {
    async fn get_status(&self) -> ApiResult<Value> {
        let url = self.endpoint_url("/status")?;
        let response = self.http.get(url).send().await?;
        let response = self.check_status(response, "GET /status").await?;
        Ok(response.json().await?)
    }

    async fn start_manual_color_simulation(&self, minutes: u32) -> ApiResult<()> {
        let url = self.endpoint_url("/stat")?;
        let params = [
            ("action", "14".to_string()),
            ("cswi", "true".to_string()),
            ("ctime", Self::ctime(minutes)),
        ];
        let response = self.http.post(url).form(&params).send().await?;
        self.check_status(response, "POST /stat (manual color simulation)")
            .await?;
        Ok(())
    }

    async fn set_manual_color(&self, color: ManualColor) -> ApiResult<()> {
        let url = self.endpoint_url("/stat")?;
        let params = [
            ("action", "10".to_string()),
            ("ch1", color.white.to_string()),
            ("ch2", color.blue.to_string()),
            ("ch3", color.green.to_string()),
            ("ch4", color.red.to_string()),
        ];
        let response = self.http.post(url).form(&params).send().await?;
        self.check_status(response, "POST /stat (manual color)")
            .await?;
        Ok(())
    }
}
