//! Headless dashboard listener
//!
//! Connects to the dashboard socket and logs every event the browser
//! dashboard would react to.
//!
//! Run with: GCODE_ACCESS_TOKEN=... cargo run --features cli --bin gcode-watch

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use gcode_live::core::{handler, Event, EventKind, ServerMessage};
    use gcode_live::dashboard::{
        self, ChartRefresher, DashboardBridge, Intensity, ScoreDisplay, StatusIndicator,
    };
    use gcode_live::websocket_native::NativeWsClient;
    use gcode_live::ClientConfig;
    use tracing::{error, info, warn};
    use tracing_subscriber::{fmt, EnvFilter};

    struct LogDashboard;

    impl ChartRefresher for LogDashboard {
        fn refresh(&self, chart: &str) {
            info!(chart, "Refreshing chart");
        }
    }

    impl ScoreDisplay for LogDashboard {
        fn show_score(&self, score: f64, intensity: Intensity) {
            info!(score, class = intensity.css_class(), "Today's G-Code score");
        }
    }

    impl StatusIndicator for LogDashboard {
        fn set_connected(&self, connected: bool) {
            if connected {
                info!("Real-time updates active");
            } else {
                warn!("Real-time updates inactive, dashboard falls back to polling");
            }
        }
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gcode_live=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let access_token = std::env::var("GCODE_ACCESS_TOKEN").ok();
    if !dashboard::has_session(access_token.as_deref()) {
        warn!("No access token found, realtime client not started");
        return Ok(());
    }

    let config = ClientConfig::from_env();
    info!(
        url = ?config.url,
        origin = %config.origin,
        max_attempts = config.max_reconnect_attempts,
        delay_ms = config.reconnect_delay_ms,
        "Configuration resolved"
    );

    let view = Arc::new(LogDashboard);
    let client = NativeWsClient::spawn(config, Some(dashboard::connection_callback(view.clone())));
    DashboardBridge::new(view.clone(), view).attach(client.listeners());

    client.listeners().on(
        EventKind::message("pong"),
        handler(|event| {
            if let Event::Message(frame) = event {
                if let Ok(ServerMessage::Pong { timestamp }) = frame.decode::<ServerMessage>() {
                    info!(?timestamp, "Liveness probe answered");
                }
            }
        }),
    );
    client.listeners().on(
        EventKind::Error,
        handler(|event| warn!(?event, "Socket error reported")),
    );
    client.listeners().on(
        EventKind::ReconnectFailed,
        handler(|event| error!(?event, "Gave up reconnecting, press Ctrl-C to exit")),
    );

    client.handle().connect(None);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    tokio::task::spawn_blocking(move || client.shutdown()).await?;
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
