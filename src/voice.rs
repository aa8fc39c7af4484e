//! Voice volume conversions.
//!
//! Discord reports per-user volume over IPC on a logarithmic scale, while
//! its settings UI shows a slider from 0 to 200. Below 100 on the IPC
//! scale the two are related by `17.362 ln(v) + 20.054`, above it by
//! `144.86 ln(v) - 567.21`.

const LOW_SLOPE: f64 = 17.362;
const LOW_OFFSET: f64 = 20.054;
const HIGH_SLOPE: f64 = 144.86;
const HIGH_OFFSET: f64 = 567.21;

/// Converts an IPC volume to the UI slider value.
///
/// Non-positive input maps to `0`.
#[must_use]
pub fn ipc_to_ui_volume(volume: f64) -> f64 {
    if volume <= 0.0 {
        0.0
    } else if volume <= 100.0 {
        LOW_SLOPE * volume.ln() + LOW_OFFSET
    } else {
        HIGH_SLOPE * volume.ln() - HIGH_OFFSET
    }
}

/// Converts a UI slider value to an IPC volume.
///
/// Non-positive input maps to `0`.
#[must_use]
pub fn ui_to_ipc_volume(volume: f64) -> f64 {
    if volume <= 0.0 {
        0.0
    } else if volume <= 100.0 {
        ((volume - LOW_OFFSET) / LOW_SLOPE).exp()
    } else {
        ((volume + HIGH_OFFSET) / HIGH_SLOPE).exp()
    }
}
