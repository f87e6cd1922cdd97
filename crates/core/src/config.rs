//! Engine configuration.
//!
//! Collects the tunable interaction and export constants in one place.
//! Configuration can be parsed from JSON, read from environment variables,
//! or created programmatically; every field falls back to its default.

use crate::annotation::PageRect;
use crate::store::ColorPalette;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Prefix shared by every environment variable the engine reads
pub const ENV_PREFIX: &str = "PDF_ANNOTATOR_";

/// Tunable constants for gestures, zoom, history and defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Drawn boxes smaller than this on both axes are discarded as taps
    pub draw_threshold: f32,
    /// Floor for the width and height of drawn or resized boxes
    pub min_annotation_size: f32,
    /// Half the side of a resize handle's square hit zone, in page units
    pub handle_hit_radius: f32,
    /// Side of the square marker used to hit and draw comments, in page units
    pub comment_marker_size: f32,
    pub initial_scale: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Increment applied by the zoom buttons
    pub zoom_step: f32,
    /// A touch that moves less than this many screen pixels is a tap
    pub tap_max_movement: f32,
    /// Width fraction at each viewport edge that turns taps into page turns
    pub tap_edge_fraction: f32,
    /// Where applied signatures are placed on the current page
    pub signature_box: PageRect,
    /// Maximum undo depth; `None` keeps every step
    pub history_limit: Option<usize>,
    pub palette: ColorPalette,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            draw_threshold: 5.0,
            min_annotation_size: 20.0,
            handle_hit_radius: 7.5,
            comment_marker_size: 24.0,
            initial_scale: 1.0,
            min_scale: 0.5,
            max_scale: 3.0,
            zoom_step: 0.2,
            tap_max_movement: 10.0,
            tap_edge_fraction: 0.3,
            signature_box: PageRect::new(100.0, 100.0, 200.0, 100.0),
            history_limit: None,
            palette: ColorPalette::default(),
        }
    }
}

impl EngineConfig {
    /// Parses configuration from a JSON document. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or the values are inconsistent.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables (all optional):
    /// - `PDF_ANNOTATOR_DRAW_THRESHOLD`
    /// - `PDF_ANNOTATOR_MIN_ANNOTATION_SIZE`
    /// - `PDF_ANNOTATOR_HANDLE_HIT_RADIUS`
    /// - `PDF_ANNOTATOR_MIN_SCALE` / `PDF_ANNOTATOR_MAX_SCALE`
    /// - `PDF_ANNOTATOR_ZOOM_STEP`
    /// - `PDF_ANNOTATOR_HISTORY_LIMIT`
    /// - `PDF_ANNOTATOR_HIGHLIGHT_COLOR`, `PDF_ANNOTATOR_UNDERLINE_COLOR`,
    ///   `PDF_ANNOTATOR_ANNOTATION_COLOR`
    ///
    /// # Errors
    /// Returns an error if any variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Layers values from `lookup` (keyed by full variable name) over the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| -> (String, Option<String>) {
            let key = format!("{ENV_PREFIX}{name}");
            let value = lookup(&key);
            (key, value)
        };

        if let Some(v) = parse_var(var("DRAW_THRESHOLD"))? {
            config.draw_threshold = v;
        }
        if let Some(v) = parse_var(var("MIN_ANNOTATION_SIZE"))? {
            config.min_annotation_size = v;
        }
        if let Some(v) = parse_var(var("HANDLE_HIT_RADIUS"))? {
            config.handle_hit_radius = v;
        }
        if let Some(v) = parse_var(var("MIN_SCALE"))? {
            config.min_scale = v;
        }
        if let Some(v) = parse_var(var("MAX_SCALE"))? {
            config.max_scale = v;
        }
        if let Some(v) = parse_var(var("ZOOM_STEP"))? {
            config.zoom_step = v;
        }
        if let Some(v) = parse_var(var("HISTORY_LIMIT"))? {
            config.history_limit = Some(v);
        }
        if let Some(v) = parse_var(var("HIGHLIGHT_COLOR"))? {
            config.palette.highlight = v;
        }
        if let Some(v) = parse_var(var("UNDERLINE_COLOR"))? {
            config.palette.underline = v;
        }
        if let Some(v) = parse_var(var("ANNOTATION_COLOR"))? {
            config.palette.annotation = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that the values describe a usable configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("draw_threshold", self.draw_threshold),
            ("min_annotation_size", self.min_annotation_size),
            ("handle_hit_radius", self.handle_hit_radius),
            ("comment_marker_size", self.comment_marker_size),
            ("tap_max_movement", self.tap_max_movement),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange { field, reason: "must be a non-negative number" });
            }
        }

        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return Err(ConfigError::OutOfRange { field: "min_scale", reason: "must be positive" });
        }
        if !(self.max_scale.is_finite() && self.max_scale >= self.min_scale) {
            return Err(ConfigError::OutOfRange {
                field: "max_scale",
                reason: "must not be below min_scale",
            });
        }
        if !(self.min_scale..=self.max_scale).contains(&self.initial_scale) {
            return Err(ConfigError::OutOfRange {
                field: "initial_scale",
                reason: "must lie within the zoom bounds",
            });
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            return Err(ConfigError::OutOfRange { field: "zoom_step", reason: "must be positive" });
        }
        if !(self.tap_edge_fraction > 0.0 && self.tap_edge_fraction <= 0.5) {
            return Err(ConfigError::OutOfRange {
                field: "tap_edge_fraction",
                reason: "must be in (0, 0.5]",
            });
        }
        if self.signature_box.width <= 0.0 || self.signature_box.height <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "signature_box",
                reason: "must have a positive size",
            });
        }

        Ok(())
    }

    /// Clamp a zoom factor into the configured bounds
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

fn parse_var<T: FromStr>((key, value): (String, Option<String>)) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value could not be parsed
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    /// A value parsed but is unusable
    #[error("{field} {reason}")]
    OutOfRange { field: &'static str, reason: &'static str },
    /// The JSON document could not be parsed
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}
