//! Configuration for the WSD bridge.
//!
//! Loaded from a TOML file by the host, every field has a default matching
//! the classical saldowsd setup. `validate` is called once up front so that
//! a bad probability format or an unsupported encoding fails the run before
//! any worker is spawned.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::annot::SCORESEP;
use crate::error::WsdError;
use crate::merge::ProbFormat;

/// Maximum time to wait for one classifier call (in milliseconds).
const DEFAULT_CALL_TIMEOUT_MS: u64 = 120_000;

/// Configuration surface consumed by the bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WsdConfig {
    /// Path to the saldowsd executable.
    pub binary: PathBuf,

    /// Path to the sense vector model.
    pub sense_model: PathBuf,

    /// Path to the context vector model.
    pub context_model: PathBuf,

    /// Probability assigned to candidate senses the classifier did not score.
    pub default_prob: f64,

    /// printf-style format string appended to each scored sense, e.g.
    /// `":%.3f"`. Empty disables the probability suffix entirely.
    pub prob_format: String,

    /// Text encoding applied symmetrically to requests and responses.
    /// Only UTF-8 is supported.
    pub encoding: String,

    /// Keep one worker process alive across calls instead of spawning a
    /// fresh process per call.
    pub persistent: bool,

    /// Upper bound on one classifier call before the worker is considered
    /// hung and restarted.
    pub call_timeout_ms: u64,
}

impl Default for WsdConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("saldowsd"),
            sense_model: PathBuf::from("models/ALL_512_128_w10_A2_140403_ctx1.bin"),
            context_model: PathBuf::from("models/lem_cbow0_s512_w10_NEW2_ctx.bin"),
            default_prob: -1.0,
            prob_format: format!("{SCORESEP}%.3f"),
            encoding: "UTF-8".to_string(),
            persistent: false,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}

impl WsdConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WsdError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&data)
            .map_err(|e| WsdError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the probability format string and the encoding name.
    pub fn validate(&self) -> Result<(), WsdError> {
        ProbFormat::parse(&self.prob_format)?;
        if !self.encoding_is_utf8() {
            return Err(WsdError::Config(format!(
                "unsupported encoding {:?} (only UTF-8 is supported)",
                self.encoding
            )));
        }
        Ok(())
    }

    /// Parsed form of `prob_format`; `None` when the string is empty.
    pub fn parsed_prob_format(&self) -> Result<Option<ProbFormat>, WsdError> {
        ProbFormat::parse(&self.prob_format)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    fn encoding_is_utf8(&self) -> bool {
        matches!(
            self.encoding.to_ascii_lowercase().as_str(),
            "utf-8" | "utf8"
        )
    }
}
