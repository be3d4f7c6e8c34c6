//! Endpoint resolution for the dashboard socket

/// Well-known path of the dashboard socket on the server
pub const DASHBOARD_WS_PATH: &str = "/ws/dashboard/";

/// Derive the socket URL from a page origin.
///
/// `https://host` maps to `wss://host/ws/dashboard/`, anything else to `ws://`.
/// Origins given with a `ws`/`wss` scheme keep it; a bare host is treated as plain HTTP.
pub fn derive_endpoint(origin: &str) -> String {
    let origin = origin.trim().trim_end_matches('/');

    let (scheme, host) = if let Some(host) = origin.strip_prefix("https://") {
        ("wss", host)
    } else if let Some(host) = origin.strip_prefix("http://") {
        ("ws", host)
    } else if let Some(host) = origin.strip_prefix("wss://") {
        ("wss", host)
    } else if let Some(host) = origin.strip_prefix("ws://") {
        ("ws", host)
    } else {
        ("ws", origin)
    };

    format!("{scheme}://{host}{DASHBOARD_WS_PATH}")
}

/// Pick the endpoint for a connect attempt: explicit argument, then the
/// previously configured URL, then the origin-derived default.
pub fn resolve_endpoint(explicit: Option<&str>, configured: Option<&str>, origin: &str) -> String {
    explicit
        .or(configured)
        .map(str::to_string)
        .unwrap_or_else(|| derive_endpoint(origin))
}
