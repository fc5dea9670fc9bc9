//! Runtime configuration.
//!
//! Engine tunables come from a `gps.conf` style file: whitespace-separated
//! `KEY=VALUE` tokens. Unknown tokens are ignored and out-of-range values
//! leave the default in place.

use std::{fs, path::Path};

use tracing::{debug, info};

use crate::{
    constants::MAX_FIX_FREQUENCY,
    error::ConfigError,
    rpc::FailurePolicy,
};

const AUTO_DOWNLOAD_KEY: &str = "GPS1_XTRA_AUTO_DOWNLOAD_ENABLED";
const DOWNLOAD_INTERVAL_KEY: &str = "GPS1_XTRA_DOWNLOAD_INTERVAL";
const CLEANUP_KEY: &str = "GPS1_CLEANUP_ENABLED";
const SESSION_TIMEOUT_KEY: &str = "GPS1_SESSION_TIMEOUT";
const PRECISION_KEY: &str = "GPS1_MEASUREMENT_PRECISION";

/// Default location of the engine configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/system/etc/gps.conf";

/// Device node streaming NMEA sentences.
pub const DEFAULT_NMEA_DEVICE: &str = "/dev/smd27";

/// Where location fixes come from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FixSource {
    /// NMEA sentences from the device stream; PD events only pace the session.
    #[default]
    Sentences,
    /// Fixes decoded from PD events.
    Rpc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsConfig {
    pub xtra_auto_download: bool,
    /// Hours, 1..=168
    pub xtra_download_interval: u16,
    pub cleanup_enabled: bool,
    /// Seconds, 2..=120
    pub session_timeout: u32,
    /// Metres per unit of HDOP, 1..=15
    pub measurement_precision: u8,
    /// Seconds between publications, 1..=1800
    pub fix_frequency: u32,
    pub fix_source: FixSource,
    pub failure_policy: FailurePolicy,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            xtra_auto_download: false,
            xtra_download_interval: 24,
            cleanup_enabled: true,
            session_timeout: 2,
            measurement_precision: 10,
            fix_frequency: 1,
            fix_source: FixSource::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Leading decimal digits of `s`, like C `atoi`.
fn atoi(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, c| {
            acc.saturating_mul(10).saturating_add(i64::from(c - b'0'))
        });
    if negative {
        -value
    } else {
        value
    }
}

/// Value following `key=` anywhere in `token`.
fn value_of(token: &str, key: &str) -> Option<i64> {
    let at = token.find(key)?;
    let rest = token.get(at + key.len() + 1..).unwrap_or("");
    Some(atoi(rest))
}

impl GpsConfig {
    /// Parses `gps.conf` text on top of the defaults.
    ///
    /// The first occurrence of each key wins. The download interval is only
    /// read once auto download has been switched on earlier in the file.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        let mut seen_auto = false;
        let mut seen_cleanup = false;
        let mut seen_timeout = false;
        let mut seen_precision = false;

        for token in text.split_whitespace() {
            if !seen_auto {
                if let Some(v) = value_of(token, AUTO_DOWNLOAD_KEY) {
                    if v == 0 || v == 1 {
                        config.xtra_auto_download = v == 1;
                    }
                    seen_auto = true;
                }
            }
            if config.xtra_auto_download {
                if let Some(v) = value_of(token, DOWNLOAD_INTERVAL_KEY) {
                    if (1..=168).contains(&v) {
                        config.xtra_download_interval = v as u16;
                    }
                }
            }
            if !seen_cleanup {
                if let Some(v) = value_of(token, CLEANUP_KEY) {
                    if v == 0 || v == 1 {
                        config.cleanup_enabled = v == 1;
                    }
                    seen_cleanup = true;
                }
            }
            if !seen_timeout {
                if let Some(v) = value_of(token, SESSION_TIMEOUT_KEY) {
                    if (2..=120).contains(&v) {
                        config.session_timeout = v as u32;
                    }
                    seen_timeout = true;
                }
            }
            if !seen_precision {
                if let Some(v) = value_of(token, PRECISION_KEY) {
                    if (1..=15).contains(&v) {
                        config.measurement_precision = v as u8;
                    }
                    seen_precision = true;
                }
            }
        }

        debug!(?config, "parsed GPS configuration");
        config
    }

    /// Reads and parses the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::parse(&text);
        info!(
            path = %path.as_ref().display(),
            auto_download = config.xtra_auto_download,
            interval = config.xtra_download_interval,
            cleanup = config.cleanup_enabled,
            timeout = config.session_timeout,
            precision = config.measurement_precision,
            "loaded GPS configuration"
        );
        Ok(config)
    }

    /// Like [`GpsConfig::load`], falling back to defaults when the file
    /// cannot be read.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            debug!("{}, using defaults", e);
            Self::default()
        })
    }

    /// Sets the publication interval; 0 means 1 s, values above 1800 s are capped.
    pub fn set_fix_frequency(&mut self, seconds: u32) {
        self.fix_frequency = seconds.clamp(1, MAX_FIX_FREQUENCY);
    }

    pub fn with_fix_source(mut self, source: FixSource) -> Self {
        self.fix_source = source;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}
