//! Game settings and preferences
//!
//! Persisted separately from high scores through the storage collaborator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persistence::{Storage, load_json, save_json};
use crate::sim::SpawnPolicy;

/// Color theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    /// Follow the host's day/night setting
    #[default]
    System,
    Day,
    Night,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::System => "System",
            Theme::Day => "Day",
            Theme::Night => "Night",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown theme `{0}` (expected system, day or night)")]
pub struct ParseThemeError(String);

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" | "auto" => Ok(Theme::System),
            "day" | "light" => Ok(Theme::Day),
            "night" | "dark" => Ok(Theme::Night),
            _ => Err(ParseThemeError(s.to_string())),
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Steer gravity with the tilt sensor instead of flings
    pub gravity_mode: bool,
    /// Whether the host reported a usable tilt sensor
    pub accelerometer_available: bool,
    pub theme: Theme,
    /// Ticks between spawns in gravity mode
    pub tilt_spawn_ticks: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gravity_mode: false,
            accelerometer_available: false,
            theme: Theme::System,
            tilt_spawn_ticks: 120,
        }
    }
}

impl Settings {
    /// Storage key
    const STORAGE_KEY: &'static str = "gravity_2050_settings";

    /// Tilt control is only honored when a sensor exists
    pub fn tilt_enabled(&self) -> bool {
        self.gravity_mode && self.accelerometer_available
    }

    /// Spawn policy matching the input mode
    pub fn spawn_policy(&self) -> SpawnPolicy {
        if self.tilt_enabled() {
            SpawnPolicy::Periodic {
                every_ticks: self.tilt_spawn_ticks.max(1),
            }
        } else {
            SpawnPolicy::OnFling
        }
    }

    /// Load settings, falling back to defaults on any failure
    pub fn load(storage: &dyn Storage) -> Self {
        match load_json(storage, Self::STORAGE_KEY) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings");
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(err) => {
                log::warn!("Settings unreadable, using defaults: {err}");
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &dyn Storage) {
        match save_json(storage, Self::STORAGE_KEY, self) {
            Ok(()) => log::info!("Settings saved"),
            Err(err) => log::warn!("Settings not saved: {err}"),
        }
    }
}
