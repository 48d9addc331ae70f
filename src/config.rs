//! Runtime configuration parsed from environment variables.
//!
//! All settings are optional:
//! - `SCREENMARK_SHARE_MAX_BYTES`: share upload limit, default 10 MiB
//! - `SCREENMARK_MESSAGE_ATTEMPTS`: host message attempts, default 5
//! - `SCREENMARK_MESSAGE_BACKOFF_MS`: first retry delay, default 100
//! - `SCREENMARK_MESSAGE_BACKOFF_MAX_MS`: retry delay ceiling, default 2000
//! - `SCREENMARK_REDRAW_INTERVAL_MS`: minimum time between paints, default 16
//! - `SCREENMARK_KEYMAP`: path to a JSON keymap override file
//! - `SCREENMARK_EXPORT_PREFIX`: export filename prefix, default `screenshot`
//! - `SCREENMARK_ASSET_BASE_URL`: base URL for arrowhead images, default empty
//!
//! Unparseable values fall back to the default with a warning.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use canvas::consts::FRAME_INTERVAL_MS;
use canvas::keymap::Keymap;

use crate::error::ConfigError;
use crate::messaging::RetryPolicy;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_SHARE_MAX_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MESSAGE_ATTEMPTS: u32 = 5;
pub const DEFAULT_MESSAGE_BACKOFF_MS: u64 = 100;
pub const DEFAULT_MESSAGE_BACKOFF_MAX_MS: u64 = 2000;
pub const DEFAULT_EXPORT_PREFIX: &str = "screenshot";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub share_max_bytes: usize,
    pub message_attempts: u32,
    pub message_backoff_ms: u64,
    pub message_backoff_max_ms: u64,
    pub redraw_interval_ms: f64,
    pub keymap_path: Option<PathBuf>,
    pub export_prefix: String,
    /// Prefix for arrowhead asset URLs; empty means origin-relative.
    pub asset_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            share_max_bytes: DEFAULT_SHARE_MAX_BYTES,
            message_attempts: DEFAULT_MESSAGE_ATTEMPTS,
            message_backoff_ms: DEFAULT_MESSAGE_BACKOFF_MS,
            message_backoff_max_ms: DEFAULT_MESSAGE_BACKOFF_MAX_MS,
            redraw_interval_ms: FRAME_INTERVAL_MS,
            keymap_path: None,
            export_prefix: DEFAULT_EXPORT_PREFIX.to_owned(),
            asset_base_url: String::new(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let attempts = env_parse(&lookup, "SCREENMARK_MESSAGE_ATTEMPTS", d.message_attempts).max(1);
        let backoff_ms = env_parse(&lookup, "SCREENMARK_MESSAGE_BACKOFF_MS", d.message_backoff_ms);
        let backoff_max_ms = env_parse(&lookup, "SCREENMARK_MESSAGE_BACKOFF_MAX_MS", d.message_backoff_max_ms);
        let redraw = env_parse(&lookup, "SCREENMARK_REDRAW_INTERVAL_MS", d.redraw_interval_ms);

        Self {
            share_max_bytes: env_parse(&lookup, "SCREENMARK_SHARE_MAX_BYTES", d.share_max_bytes),
            message_attempts: attempts,
            message_backoff_ms: backoff_ms,
            message_backoff_max_ms: backoff_max_ms.max(backoff_ms),
            redraw_interval_ms: if redraw.is_finite() { redraw.max(0.0) } else { d.redraw_interval_ms },
            keymap_path: lookup("SCREENMARK_KEYMAP").filter(|v| !v.trim().is_empty()).map(PathBuf::from),
            export_prefix: lookup("SCREENMARK_EXPORT_PREFIX")
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .unwrap_or(d.export_prefix),
            asset_base_url: lookup("SCREENMARK_ASSET_BASE_URL").map_or(d.asset_base_url, |v| v.trim().to_owned()),
        }
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.message_attempts,
            base: Duration::from_millis(self.message_backoff_ms),
            max: Duration::from_millis(self.message_backoff_max_ms),
            jitter: true,
        }
    }

    /// The default keymap with the configured override file applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the override file cannot be read or parsed.
    pub fn load_keymap(&self) -> Result<Keymap, ConfigError> {
        let Some(path) = &self.keymap_path else {
            return Ok(Keymap::new());
        };
        let json = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::KeymapRead { path: path.clone(), source })?;
        let keymap =
            Keymap::from_json(&json).map_err(|source| ConfigError::Keymap { path: path.clone(), source })?;
        tracing::info!(path = %path.display(), bindings = keymap.len(), "keymap overrides loaded");
        Ok(keymap)
    }

    /// Default export filename, `{prefix}-{unix seconds}.png`.
    #[must_use]
    pub fn export_filename(&self) -> String {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        self.export_filename_at(secs)
    }

    #[must_use]
    pub fn export_filename_at(&self, unix_secs: u64) -> String {
        format!("{}-{unix_secs}.png", self.export_prefix)
    }
}

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid config value; using default");
            default
        }),
    }
}
