//! Runtime settings.
//!
//! Defaults, then `DEVORIENT_*` environment variables, then command line flags.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    Auto,
    Xrandr,
    Wlroots,
    Dummy,
}

impl Backend {
    pub const NAMES: [&'static str; 4] = ["auto", "xrandr", "wlroots", "dummy"];
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Backend::Auto),
            "xrandr" | "x11" => Ok(Backend::Xrandr),
            "wlroots" | "wayland" => Ok(Backend::Wlroots),
            "dummy" => Ok(Backend::Dummy),
            _ => Err(Error::InvalidBackend(s.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub backend: Backend,
    /// Output name as the display server knows it.
    pub display: String,
    pub poll_interval: Duration,
    /// Accelerometer reading past which the device counts as tilted.
    pub threshold: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            backend: Backend::Auto,
            display: "eDP-1".into(),
            poll_interval: Duration::from_millis(500),
            threshold: 500_000,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Settings::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply `DEVORIENT_*` values found through `lookup`. Unparseable values are skipped.
    pub fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DEVORIENT_BACKEND") {
            match v.parse() {
                Ok(backend) => self.backend = backend,
                Err(_) => warn!("ignoring unknown DEVORIENT_BACKEND {:?}", v),
            }
        }
        if let Some(v) = lookup("DEVORIENT_DISPLAY") {
            if !v.trim().is_empty() {
                self.display = v.trim().to_owned();
            }
        }
        if let Some(v) = lookup("DEVORIENT_POLL_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.poll_interval = Duration::from_millis(ms),
                _ => warn!("ignoring invalid DEVORIENT_POLL_MS {:?}", v),
            }
        }
        if let Some(v) = lookup("DEVORIENT_THRESHOLD") {
            match v.trim().parse::<i32>() {
                Ok(threshold) if threshold >= 0 => self.threshold = threshold,
                _ => warn!("ignoring invalid DEVORIENT_THRESHOLD {:?}", v),
            }
        }
        self
    }
}
