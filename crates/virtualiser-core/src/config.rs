#![forbid(unsafe_code)]

//! Policy-as-data configuration for the virtualiser.
//!
//! Every tunable lives in [`VirtualiserConfig`], which can be loaded from
//! JSON (the natural form for a browser host) or TOML when the `config`
//! feature is enabled.
//!
//! ```json
//! {
//!   "strategy": "pages",
//!   "visible_pages": 4.0,
//!   "reveal_margin_px": 300.0,
//!   "wait": { "timeout_ms": 10000 }
//! }
//! ```
//!
//! Omitted fields keep their defaults, and the defaults reproduce the
//! behaviour of the hardcoded constants in each component, so
//! `VirtualiserConfig::default()` is always a valid configuration.

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::observer::DEFAULT_REVEAL_MARGIN_PX;
use crate::strategy::{
    CountSizing, DEFAULT_REVEAL_COUNT, DEFAULT_REVEAL_PAGES, DEFAULT_VISIBLE_COUNT,
    DEFAULT_VISIBLE_PAGES, PageHeightSizing, SizingKind,
};

/// Which sizing strategy the engine is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum StrategySelection {
    /// Fixed turn counts.
    #[default]
    Count,
    /// Viewport-height pages.
    Pages,
}

/// Bounded polling policy for waiting on host content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct WaitPolicy {
    /// Give up after this long.
    pub timeout_ms: u64,
    /// Delay between polls.
    pub poll_interval_ms: u64,
}

impl WaitPolicy {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval, never zero.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            poll_interval_ms: 200,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct VirtualiserConfig {
    pub strategy: StrategySelection,

    /// Turns kept visible (count strategy).
    pub visible_count: usize,

    /// Turns revealed per batch (count strategy).
    pub reveal_count: usize,

    /// Viewport heights kept visible (pages strategy).
    pub visible_pages: f64,

    /// Viewport heights revealed per batch (pages strategy).
    pub reveal_pages: f64,

    /// How far above the viewport top the placeholder triggers a reveal.
    pub reveal_margin_px: f64,

    /// Waiting for the host to render turns after navigation.
    pub wait: WaitPolicy,
}

impl Default for VirtualiserConfig {
    fn default() -> Self {
        Self {
            strategy: StrategySelection::Count,
            visible_count: DEFAULT_VISIBLE_COUNT,
            reveal_count: DEFAULT_REVEAL_COUNT,
            visible_pages: DEFAULT_VISIBLE_PAGES,
            reveal_pages: DEFAULT_REVEAL_PAGES,
            reveal_margin_px: DEFAULT_REVEAL_MARGIN_PX,
            wait: WaitPolicy::default(),
        }
    }
}

impl VirtualiserConfig {
    /// Load from a JSON string and validate.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Load from a TOML string and validate.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Serialize to pretty JSON.
    #[cfg(feature = "config")]
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Json)
    }

    /// Return `self` if valid, otherwise every validation error.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.visible_count == 0 {
            errors.push("visible_count must be > 0".into());
        }
        if self.reveal_count == 0 {
            errors.push("reveal_count must be > 0".into());
        }
        if !(self.visible_pages.is_finite() && self.visible_pages > 0.0) {
            errors.push(format!(
                "visible_pages must be finite and > 0, got {}",
                self.visible_pages
            ));
        }
        if !(self.reveal_pages.is_finite() && self.reveal_pages > 0.0) {
            errors.push(format!(
                "reveal_pages must be finite and > 0, got {}",
                self.reveal_pages
            ));
        }
        if !(self.reveal_margin_px.is_finite() && self.reveal_margin_px >= 0.0) {
            errors.push(format!(
                "reveal_margin_px must be finite and >= 0, got {}",
                self.reveal_margin_px
            ));
        }
        if self.wait.poll_interval_ms == 0 {
            errors.push("wait.poll_interval_ms must be > 0".into());
        }
        if self.wait.timeout_ms < self.wait.poll_interval_ms {
            errors.push(format!(
                "wait.timeout_ms ({}) must be >= wait.poll_interval_ms ({})",
                self.wait.timeout_ms, self.wait.poll_interval_ms
            ));
        }

        errors
    }

    /// The sizing strategy this configuration selects.
    #[must_use]
    pub fn sizing_kind(&self) -> SizingKind {
        match self.strategy {
            StrategySelection::Count => {
                SizingKind::Count(CountSizing::new(self.visible_count, self.reveal_count))
            }
            StrategySelection::Pages => SizingKind::PageHeight(PageHeightSizing::new(
                self.visible_pages,
                self.reveal_pages,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
