//! huyalive client binary.
//!
//! - Loads `huyalive.yaml` (or the path given as first argument)
//! - Logs a signed FLV url when a `stream` section is configured
//! - Joins the configured room and prints chat events as JSON lines
//! - Ctrl-C closes the session

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use huyalive_client::{config, ChatEvent, ClientMetrics, Dispatcher, Session};
use huyalive_core::anticode;
use huyalive_core::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "huyalive.yaml".to_owned());
    let cfg = config::load_from_file(&path)?;

    if let Some(stream) = &cfg.stream {
        let uid = stream.uid.unwrap_or_else(anticode::random_uid);
        let url = stream
            .flv_source()
            .url(uid, anticode::now_millis(), stream.bit_rate);
        tracing::info!(uid, %url, "signed flv url");
    }

    let metrics = Arc::new(ClientMetrics::default());
    let (tx, mut rx) = mpsc::channel::<ChatEvent>(cfg.client.event_buffer);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "event serialization failed"),
            }
        }
    });

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(tx), metrics.clone()));
    let mut session = Session::new(cfg.client.session_config(), dispatcher);

    tracing::info!(endpoint = %cfg.client.endpoint, "huyalive-client starting");
    session.connect(&cfg.client.endpoint).await?;
    session.join(cfg.room.target_uid, cfg.room.channel_id).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted, closing"),
        _ = session.closed() => {}
    }

    let result = session.close().await;
    drop(session);
    let _ = printer.await;

    tracing::debug!(metrics = %metrics.render(), "final metrics");
    result
}
