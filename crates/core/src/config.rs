use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::{parse_duration, parse_utc_offset};
use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled key: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt(lookup: Lookup<'_>, profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = lookup(&prefixed) {
            return Some(v);
        }
    }
    lookup(key)
}

fn profiled_or(lookup: Lookup<'_>, profile: &str, key: &str, default: &str) -> String {
    profiled_opt(lookup, profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_u64(lookup: Lookup<'_>, profile: &str, key: &str, default: u64) -> u64 {
    profiled_opt(lookup, profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_bool(lookup: Lookup<'_>, profile: &str, key: &str, default: bool) -> bool {
    match profiled_opt(lookup, profile, key).as_deref() {
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        _ => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub monitor: MonitorConfig,
    pub rotation: RotationConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `FLEET_PROFILE`. When set (e.g. `DEPOT_A`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_lookup("FLEET_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        Self::from_lookup(profile, &env_lookup)
    }

    /// Build config from an arbitrary key lookup instead of the process env.
    pub fn from_lookup(profile: &str, lookup: Lookup<'_>) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            monitor: MonitorConfig::from_lookup(lookup, p),
            rotation: RotationConfig::from_lookup(lookup, p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  monitor:   interval={}s, cooldown={}s, scope={}, utc_offset={}",
            self.monitor.interval_secs,
            self.monitor.alert_cooldown_secs,
            self.monitor.debounce_scope,
            self.monitor.utc_offset,
        );
        tracing::info!(
            "  rotation:  enabled={}, period={}s, slots={}",
            self.rotation.enabled,
            self.rotation.period_secs,
            if self.rotation.slots.is_empty() {
                "(sequential)".to_string()
            } else {
                self.rotation.slots.join(",")
            },
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup("", &|_: &str| None)
    }
}

// ── Monitor ───────────────────────────────────────────────────

/// Whether the alert cooldown is shared by all trips or kept per trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebounceScope {
    /// One last-notified instant shared across every trip.
    #[default]
    Global,
    PerTrip,
}

impl FromStr for DebounceScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(DebounceScope::Global),
            "per-trip" | "per_trip" | "trip" => Ok(DebounceScope::PerTrip),
            other => Err(CoreError::InvalidConfig {
                key: "FLEET_DEBOUNCE_SCOPE".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for DebounceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebounceScope::Global => write!(f, "global"),
            DebounceScope::PerTrip => write!(f, "per-trip"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between delay evaluations.
    pub interval_secs: u64,
    /// Minimum seconds between two alert notifications.
    pub alert_cooldown_secs: u64,
    pub debounce_scope: DebounceScope,
    /// UTC offset of the depot's schedule clock, e.g. `+05:30`.
    pub utc_offset: String,
    /// Optional minijinja template for alert messages.
    pub alert_template: Option<String>,
}

impl MonitorConfig {
    fn from_lookup(lookup: Lookup<'_>, p: &str) -> Self {
        let debounce_scope = match profiled_opt(lookup, p, "FLEET_DEBOUNCE_SCOPE") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to global debounce scope");
                DebounceScope::Global
            }),
            None => DebounceScope::Global,
        };

        Self {
            interval_secs: profiled_u64(lookup, p, "FLEET_MONITOR_INTERVAL_SECS", 60).max(1),
            alert_cooldown_secs: profiled_u64(lookup, p, "FLEET_ALERT_COOLDOWN_SECS", 30),
            debounce_scope,
            utc_offset: profiled_or(lookup, p, "FLEET_UTC_OFFSET", "+05:30"),
            alert_template: profiled_opt(lookup, p, "FLEET_ALERT_TEMPLATE"),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_secs)
    }

    /// Resolved schedule offset. Unparseable values fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        parse_utc_offset(&self.utc_offset).unwrap_or_else(|| {
            tracing::warn!(utc_offset = %self.utc_offset, "invalid UTC offset, using UTC");
            Utc.fix()
        })
    }
}

// ── Rotation ──────────────────────────────────────────────────

/// Longest accepted rotation period (one year).
pub const MAX_ROTATION_PERIOD_SECS: u64 = 366 * 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    pub enabled: bool,
    /// Seconds between rotation ticks.
    pub period_secs: u64,
    /// Slot labels (typically route numbers) that rotation cycles through.
    pub slots: Vec<String>,
}

impl RotationConfig {
    fn from_lookup(lookup: Lookup<'_>, p: &str) -> Self {
        let raw_period = profiled_or(lookup, p, "FLEET_ROTATION_PERIOD", "1d");
        let period_secs = match parse_duration(&raw_period) {
            Some(d) if d.as_secs() > 0 && d.as_secs() <= MAX_ROTATION_PERIOD_SECS => d.as_secs(),
            _ => {
                tracing::warn!(period = %raw_period, "invalid rotation period, using 1d");
                86_400
            }
        };

        let slots = profiled_opt(lookup, p, "FLEET_ROTATION_SLOTS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            enabled: profiled_bool(lookup, p, "FLEET_ROTATION_ENABLED", false),
            period_secs,
            slots,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}
