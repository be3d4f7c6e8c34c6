//! Platform-agnostic wall clock
//!
//! Lifecycle events carry a millisecond timestamp. `SystemTime` is not
//! available in the browser, so the wasm build asks JavaScript instead.

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub fn now_millis() -> u64 {
    js_sys::Date::now() as u64
}

// No clock to ask without js-sys; SystemTime::now panics on wasm32-unknown-unknown.
#[cfg(all(target_arch = "wasm32", not(feature = "wasm")))]
pub fn now_millis() -> u64 {
    0
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
