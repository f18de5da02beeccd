//! Open-time options.

use serde::{Deserialize, Serialize};
use tracing::warn;

use raster_common::{RasterError, RasterResult};

/// Default block-cache budget per resolution level.
const DEFAULT_CACHE_BYTES: usize = 32 * 1024 * 1024;

/// Options controlling how a dataset is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Expand 1-bit monochrome to full-range 8-bit on read.
    pub promote_1bit_to_8bit: bool,
    /// Keep pyramid levels smaller than the 64-pixel floor.
    pub show_all_pyramid_levels: bool,
    /// Block-cache budget in bytes, per resolution level.
    pub cache_bytes: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            promote_1bit_to_8bit: true,
            show_all_pyramid_levels: false,
            cache_bytes: DEFAULT_CACHE_BYTES,
        }
    }
}

impl OpenOptions {
    /// Parse `KEY=VALUE` open-option pairs. Unknown keys are ignored with a
    /// warning.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> RasterResult<Self> {
        let mut options = Self::default();
        for pair in pairs {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                RasterError::open_failed(format!("malformed open option: {}", pair))
            })?;
            match key.to_ascii_uppercase().as_str() {
                "1BIT_AS_8BIT" => options.promote_1bit_to_8bit = parse_bool(key, value)?,
                "SHOW_ALL_PYRAMID_LEVELS" => {
                    options.show_all_pyramid_levels = parse_bool(key, value)?
                }
                _ => warn!(key, "ignoring unknown open option"),
            }
        }
        Ok(options)
    }
}

fn parse_bool(key: &str, value: &str) -> RasterResult<bool> {
    match value.to_ascii_uppercase().as_str() {
        "YES" | "TRUE" | "ON" | "1" => Ok(true),
        "NO" | "FALSE" | "OFF" | "0" => Ok(false),
        _ => Err(RasterError::open_failed(format!(
            "invalid boolean for {}: {}",
            key, value
        ))),
    }
}
