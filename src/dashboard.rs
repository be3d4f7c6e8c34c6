//! Dashboard wiring for the realtime client
//!
//! Connects client events to the dashboard's collaborators: the connection
//! status indicator, the chart manager and today's score widget. The
//! collaborators themselves (DOM, chart library) live outside this crate and
//! are reached only through the traits below.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::{
    handler, ConnectionCallback, Event, EventKind, Handler, InboundFrame, Listeners,
    CONNECTION_ESTABLISHED, GCODE_UPDATE,
};

/// Chart refreshed when a G-Code update arrives
pub const TREND_CHART: &str = "trend";

#[cfg(not(target_arch = "wasm32"))]
pub trait Collaborator: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> Collaborator for T {}

#[cfg(target_arch = "wasm32")]
pub trait Collaborator {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> Collaborator for T {}

/// Reloads a named chart
pub trait ChartRefresher: Collaborator {
    fn refresh(&self, chart: &str);
}

/// Shows whether real-time updates are active
pub trait StatusIndicator: Collaborator {
    fn set_connected(&self, connected: bool);
}

/// Shows today's G-Code score
pub trait ScoreDisplay: Collaborator {
    fn show_score(&self, score: f64, intensity: Intensity);
}

/// Intensity band of a G-Code score
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intensity {
    Low,
    Medium,
    High,
    Intense,
}

impl Intensity {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Intensity::Intense
        } else if score >= 60.0 {
            Intensity::High
        } else if score >= 40.0 {
            Intensity::Medium
        } else {
            Intensity::Low
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Intensity::Low => "intensity-low",
            Intensity::Medium => "intensity-medium",
            Intensity::High => "intensity-high",
            Intensity::Intense => "intensity-intense",
        }
    }
}

/// Fields of a `gcode_update` the dashboard acts on
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GcodeUpdate {
    #[serde(default)]
    pub update_score: bool,
    #[serde(default)]
    pub g_code_score: Option<f64>,
}

impl GcodeUpdate {
    /// Read the update from the frame's `data` object, or the frame itself when absent.
    pub fn from_frame(frame: &InboundFrame) -> Self {
        let source = match frame.get("data") {
            Some(data @ Value::Object(_)) => data,
            _ => frame.payload(),
        };
        GcodeUpdate::deserialize(source).unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable gcode_update payload");
            GcodeUpdate::default()
        })
    }
}

/// Only sessions holding an access token get a realtime connection.
pub fn has_session(access_token: Option<&str>) -> bool {
    access_token.is_some_and(|t| !t.trim().is_empty())
}

/// Connection callback that drives the status indicator
pub fn connection_callback(indicator: Arc<dyn StatusIndicator>) -> ConnectionCallback {
    Arc::new(move |connected| indicator.set_connected(connected))
}

/// Routes client events to the chart manager and score widget
#[derive(Clone)]
pub struct DashboardBridge {
    charts: Arc<dyn ChartRefresher>,
    score: Arc<dyn ScoreDisplay>,
}

impl DashboardBridge {
    pub fn new(charts: Arc<dyn ChartRefresher>, score: Arc<dyn ScoreDisplay>) -> Self {
        Self { charts, score }
    }

    /// Register the dashboard's handlers. The returned pairs can be passed to
    /// [`Listeners::off`] to detach them again.
    pub fn attach(&self, listeners: &Listeners) -> Vec<(EventKind, Handler)> {
        let bridge = self.clone();
        let registrations = vec![
            (
                EventKind::Connected,
                handler(|event| info!(?event, "Dashboard socket connected")),
            ),
            (
                EventKind::Disconnected,
                handler(|event| info!(?event, "Dashboard socket disconnected")),
            ),
            (
                EventKind::message(CONNECTION_ESTABLISHED),
                handler(|event| {
                    if let Event::Message(frame) = event {
                        info!(payload = %frame.payload(), "Dashboard connection confirmed");
                    }
                }),
            ),
            (
                EventKind::message(GCODE_UPDATE),
                handler(move |event| {
                    if let Event::Message(frame) = event {
                        bridge.handle_gcode_update(frame);
                    }
                }),
            ),
        ];

        for (kind, h) in &registrations {
            listeners.on(kind.clone(), h.clone());
        }
        registrations
    }

    /// Refresh the trend chart and, when asked to, today's score.
    pub fn handle_gcode_update(&self, frame: &InboundFrame) {
        debug!(payload = %frame.payload(), "G-Code update received");
        self.charts.refresh(TREND_CHART);

        let update = GcodeUpdate::from_frame(frame);
        if !update.update_score {
            return;
        }
        match update.g_code_score {
            Some(score) => self.score.show_score(score, Intensity::from_score(score)),
            None => warn!("gcode_update asked for a score refresh without a score"),
        }
    }
}
