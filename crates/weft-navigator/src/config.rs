#![forbid(unsafe_code)]

//! Navigator configuration.
//!
//! ```toml
//! # navigator.toml
//! row_height = 24.0
//! detour_timeout_ms = 1500
//! ```
//!
//! ```rust,ignore
//! let config = NavigatorConfig::from_toml_file("navigator.toml")?;
//! let config = NavigatorConfig::from_json_str(r#"{"row_height": 28.0}"#)?;
//! ```
//!
//! Loading requires the `config-files` feature. Missing keys keep their
//! defaults, and loaded configs are validated.

#[cfg(feature = "config-files")]
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "config-files")]
use serde::{Deserialize, Serialize};

use crate::geometry::{DEFAULT_ROW_HEIGHT, HoverGeometry};

/// Tunables for the navigator controller.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct NavigatorConfig {
    /// Row height in pixels (default: 24.0).
    pub row_height: f64,
    /// How long a drop may wait for its target container to open before the
    /// gesture is abandoned on the next tick (default: wait indefinitely).
    #[cfg_attr(
        feature = "config-files",
        serde(
            rename = "detour_timeout_ms",
            serialize_with = "serialize_timeout_ms",
            deserialize_with = "deserialize_timeout_ms"
        )
    )]
    pub detour_timeout: Option<Duration>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            row_height: DEFAULT_ROW_HEIGHT,
            detour_timeout: None,
        }
    }
}

impl NavigatorConfig {
    #[must_use]
    pub fn with_row_height(mut self, row_height: f64) -> Self {
        self.row_height = row_height;
        self
    }

    #[must_use]
    pub fn with_detour_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.detour_timeout = timeout;
        self
    }

    #[must_use]
    pub fn geometry(&self) -> HoverGeometry {
        HoverGeometry::new(self.row_height)
    }

    /// Validation problems, empty when the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.row_height.is_finite() || self.row_height <= 0.0 {
            errors.push(format!(
                "row_height must be finite and > 0, got {}",
                self.row_height
            ));
        }
        if self.detour_timeout == Some(Duration::ZERO) {
            errors.push("detour_timeout must be > 0 when set".into());
        }
        errors
    }

    /// Like [`validate`](Self::validate), as a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(s)
            .map_err(ConfigError::Toml)?
            .validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-files")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<Self>(s)
            .map_err(ConfigError::Json)?
            .validated()
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for the detour timeout
// ---------------------------------------------------------------------------

#[cfg(feature = "config-files")]
fn serialize_timeout_ms<S>(timeout: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match timeout {
        Some(d) => serializer.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        None => serializer.serialize_none(),
    }
}

#[cfg(feature = "config-files")]
fn deserialize_timeout_ms<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let ms: Option<u64> = Option::deserialize(deserializer)?;
    Ok(ms.map(Duration::from_millis))
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a navigator configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-files")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-files")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "invalid navigator config: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
