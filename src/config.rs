//! Settings consumed by the renderer and the print dispatcher.
//!
//! The core never reads the environment itself; callers build a
//! [`BadgeConfig`] once and pass it into constructors.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::error::{BadgeError, BadgeResult};

pub const ENV_PRINTER_NAME: &str = "PRINTER_NAME";
pub const ENV_OUTPUT_DIR: &str = "OUTPUT_DIR";
pub const ENV_LIST_TIMEOUT: &str = "BADGE_LIST_TIMEOUT_SECS";
pub const ENV_SUBMIT_TIMEOUT: &str = "BADGE_SUBMIT_TIMEOUT_SECS";

/// Printer and output settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeConfig {
    /// Exact printer name as the OS print subsystem reports it. Empty means
    /// unset.
    pub printer_name: String,
    /// Directory rendered badges are written to (default: `out`).
    pub output_dir: PathBuf,
    /// Upper bound on one printer enumeration (default: 5 s).
    #[serde(skip)]
    pub list_timeout: Duration,
    /// Upper bound on one submission (default: 30 s).
    #[serde(skip)]
    pub submit_timeout: Duration,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            printer_name: String::new(),
            output_dir: PathBuf::from("out"),
            list_timeout: Duration::from_secs(5),
            submit_timeout: Duration::from_secs(30),
        }
    }
}

impl BadgeConfig {
    /// Build from process environment variables.
    pub fn from_env() -> BadgeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BadgeResult<Self> {
        let mut config = Self::default();
        if let Some(name) = lookup(ENV_PRINTER_NAME) {
            config.printer_name = name;
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|d| !d.trim().is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_LIST_TIMEOUT) {
            config.list_timeout = parse_secs(ENV_LIST_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SUBMIT_TIMEOUT) {
            config.submit_timeout = parse_secs(ENV_SUBMIT_TIMEOUT, &raw)?;
        }
        Ok(config)
    }

    /// The configured printer, or an error if none was set.
    pub fn require_printer(&self) -> BadgeResult<&str> {
        let name = self.printer_name.as_str();
        if name.trim().is_empty() {
            return Err(BadgeError::InvalidConfig(format!(
                "{ENV_PRINTER_NAME} not set. Set it in .env or the environment."
            )));
        }
        Ok(name)
    }
}

fn parse_secs(key: &str, raw: &str) -> BadgeResult<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| BadgeError::InvalidConfig(format!("{key}: '{raw}' is not a number")))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(BadgeError::InvalidConfig(format!(
            "{key}: timeout must be positive, got {raw}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| BadgeError::InvalidConfig(format!("{key}: '{raw}' is out of range: {e}")))
}
