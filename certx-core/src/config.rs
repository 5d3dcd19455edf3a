use std::time::Duration;

use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use time::UtcOffset;

use crate::service::error::ServiceError;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertxConfig {
    pub registry: RegistryConfig,
    pub list: ListConfig,
    /// Offset of "local" time, used to decide where an expiration day ends.
    pub utc_offset_seconds: i32,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub verify_base_url: Option<String>,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListConfig {
    pub default_limit: u32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub search_debounce: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            verify_base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            search_debounce: Duration::from_millis(400),
        }
    }
}

impl CertxConfig {
    pub fn utc_offset(&self) -> Result<UtcOffset, ServiceError> {
        UtcOffset::from_whole_seconds(self.utc_offset_seconds).map_err(|e| {
            ServiceError::Config(format!(
                "invalid utc offset `{}`: {e}",
                self.utc_offset_seconds
            ))
        })
    }
}
