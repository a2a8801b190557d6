use std::time::Duration;

use serde::Deserialize;

use huyalive_core::anticode::FlvSource;
use huyalive_core::error::{HuyaLiveError, Result};

use crate::transport::session::{SessionConfig, DEFAULT_ENDPOINT};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub client: ClientSection,

    pub room: RoomSection,

    #[serde(default)]
    pub stream: Option<StreamSection>,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(HuyaLiveError::BadConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.client.validate()?;
        self.room.validate()?;
        if let Some(stream) = &self.stream {
            stream.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,

    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ClientSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(HuyaLiveError::BadConfig(
                "client.endpoint must be a ws:// or wss:// url".into(),
            ));
        }
        if !(1000..=300_000).contains(&self.heartbeat_interval_ms) {
            return Err(HuyaLiveError::BadConfig(
                "client.heartbeat_interval_ms must be between 1000 and 300000".into(),
            ));
        }
        if !(1000..=60_000).contains(&self.connect_timeout_ms) {
            return Err(HuyaLiveError::BadConfig(
                "client.connect_timeout_ms must be between 1000 and 60000".into(),
            ));
        }
        if !(100..=30_000).contains(&self.close_timeout_ms) {
            return Err(HuyaLiveError::BadConfig(
                "client.close_timeout_ms must be between 100 and 30000".into(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(HuyaLiveError::BadConfig(
                "client.event_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            close_timeout: Duration::from_millis(self.close_timeout_ms),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_heartbeat_interval_ms() -> u64 {
    60_000
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_close_timeout_ms() -> u64 {
    3_000
}
fn default_event_buffer() -> usize {
    1024
}

/// Room identifiers as resolved by the profile lookup.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomSection {
    pub target_uid: i64,
    pub channel_id: i32,
}

impl RoomSection {
    pub fn validate(&self) -> Result<()> {
        if self.target_uid <= 0 {
            return Err(HuyaLiveError::BadConfig("room.target_uid must be positive".into()));
        }
        if self.channel_id <= 0 {
            return Err(HuyaLiveError::BadConfig("room.channel_id must be positive".into()));
        }
        Ok(())
    }
}

/// One FLV line to sign at startup.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamSection {
    pub flv_url: String,
    pub stream_name: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    pub anticode: String,
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default)]
    pub bit_rate: u32,
}

impl StreamSection {
    pub fn validate(&self) -> Result<()> {
        if self.flv_url.is_empty() {
            return Err(HuyaLiveError::BadConfig("stream.flv_url must not be empty".into()));
        }
        if self.stream_name.is_empty() {
            return Err(HuyaLiveError::BadConfig("stream.stream_name must not be empty".into()));
        }
        Ok(())
    }

    pub fn flv_source(&self) -> FlvSource {
        FlvSource {
            base_url: self.flv_url.clone(),
            stream_name: self.stream_name.clone(),
            suffix: self.suffix.clone(),
            anticode: self.anticode.clone(),
        }
    }
}

fn default_suffix() -> String {
    "flv".into()
}
