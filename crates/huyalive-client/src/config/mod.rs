//! Client config loader (strict parsing).

pub mod schema;

use std::fs;

use huyalive_core::error::{HuyaLiveError, Result};

pub use schema::{ClientConfig, ClientSection, RoomSection, StreamSection};

pub fn load_from_file(path: &str) -> Result<ClientConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| HuyaLiveError::BadConfig(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ClientConfig> {
    let cfg: ClientConfig = serde_yaml::from_str(s)
        .map_err(|e| HuyaLiveError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
