//! Read-only passthrough to an external wellness survey service.
//!
//! The service is optional. Every failure collapses into an "unavailable"
//! summary so player pages keep working when it is down.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::error::{Error, Result};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellnessSummary {
    pub available: bool,
    pub data: Option<serde_json::Value>,
}

impl WellnessSummary {
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            data: None,
        }
    }
}

pub struct WellnessClient {
    client: Client,
    base_url: Option<String>,
}

impl WellnessClient {
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    pub async fn fetch(&self, wellness_id: Option<&str>) -> WellnessSummary {
        let (Some(base_url), Some(wellness_id)) = (&self.base_url, wellness_id) else {
            return WellnessSummary::unavailable();
        };

        match self.try_fetch(base_url, wellness_id).await {
            Ok(data) => WellnessSummary {
                available: true,
                data: Some(data),
            },
            Err(e) => {
                tracing::warn!("Wellness fetch for {wellness_id} failed: {e}");
                WellnessSummary::unavailable()
            }
        }
    }

    async fn try_fetch(
        &self,
        base_url: &str,
        wellness_id: &str,
    ) -> std::result::Result<serde_json::Value, reqwest::Error> {
        let url = format!("{base_url}/players/{wellness_id}");
        self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}
