//! Creation options for the write path.

use serde::{Deserialize, Serialize};
use tracing::warn;

use raster_common::{Compression, PixelType, RasterError, RasterResult};

/// Default tile edge in pixels.
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// Options controlling coverage creation and ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOptions {
    /// Target coverage name; defaults to the store path's file stem.
    pub coverage: Option<String>,
    /// Section name; defaults to the store path's file stem.
    pub section: Option<String>,
    /// Append a new section to an existing coverage instead of creating one.
    pub append: bool,
    /// Channel layout; inferred from the source when not given.
    pub pixel_type: Option<PixelType>,
    pub compression: Compression,
    /// Explicit quality; defaults depend on the compression kind.
    pub quality: Option<i32>,
    pub block_width: u32,
    pub block_height: u32,
    /// Spatial reference id; falls back to the source raster's.
    pub srid: Option<i32>,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            coverage: None,
            section: None,
            append: false,
            pixel_type: None,
            compression: Compression::None,
            quality: None,
            block_width: DEFAULT_BLOCK_SIZE,
            block_height: DEFAULT_BLOCK_SIZE,
            srid: None,
        }
    }
}

impl CreateOptions {
    /// Parse `KEY=VALUE` creation-option pairs.
    ///
    /// Unknown compression or pixel-type names are rejected; unknown keys
    /// are ignored with a warning.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> RasterResult<Self> {
        let mut options = Self::default();
        for pair in pairs {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                RasterError::create_failed(format!("malformed creation option: {}", pair))
            })?;
            match key.to_ascii_uppercase().as_str() {
                "COVERAGE" => options.coverage = Some(value.to_string()),
                "SECTION" => options.section = Some(value.to_string()),
                "APPEND_SUBDATASET" => options.append = parse_bool(key, value)?,
                "PIXEL_TYPE" => {
                    options.pixel_type = Some(PixelType::from_option_name(value).ok_or_else(
                        || RasterError::create_failed(format!("unknown pixel type: {}", value)),
                    )?)
                }
                "COMPRESS" => {
                    let (compression, _) =
                        Compression::from_option_name(value).ok_or_else(|| {
                            RasterError::create_failed(format!(
                                "unknown compression: {}",
                                value
                            ))
                        })?;
                    options.compression = compression;
                }
                "QUALITY" => {
                    options.quality = Some(value.parse().map_err(|_| {
                        RasterError::create_failed(format!("invalid quality: {}", value))
                    })?)
                }
                "BLOCKXSIZE" => options.block_width = parse_size(key, value)?,
                "BLOCKYSIZE" => options.block_height = parse_size(key, value)?,
                "SRID" => {
                    options.srid = Some(value.parse().map_err(|_| {
                        RasterError::create_failed(format!("invalid SRID: {}", value))
                    })?)
                }
                _ => warn!(key, "ignoring unknown creation option"),
            }
        }
        Ok(options)
    }

    /// Resolve compression and quality, applying the kind-specific default
    /// quality and the lossless upgrade for explicit quality 100.
    pub fn resolved_compression(&self) -> (Compression, i32) {
        let default_quality = match self.compression {
            Compression::Jpeg | Compression::LossyWebp => 75,
            Compression::LossyJp2 => 20,
            _ => 100,
        };
        match self.quality {
            Some(quality) => self.compression.with_quality(quality),
            None => (self.compression, default_quality),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> RasterResult<bool> {
    match value.to_ascii_uppercase().as_str() {
        "YES" | "TRUE" | "ON" | "1" => Ok(true),
        "NO" | "FALSE" | "OFF" | "0" => Ok(false),
        _ => Err(RasterError::create_failed(format!(
            "invalid boolean for {}: {}",
            key, value
        ))),
    }
}

fn parse_size(key: &str, value: &str) -> RasterResult<u32> {
    let size: u32 = value.parse().map_err(|_| {
        RasterError::create_failed(format!("invalid {}: {}", key, value))
    })?;
    if size == 0 {
        return Err(RasterError::create_failed(format!(
            "{} must be positive",
            key
        )));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CreateOptions::default();
        assert_eq!(options.block_width, 512);
        assert_eq!(options.block_height, 512);
        assert_eq!(options.compression, Compression::None);
        assert!(!options.append);
    }

    #[test]
    fn test_from_pairs() {
        let options = CreateOptions::from_pairs([
            "COVERAGE=ortho",
            "SECTION=north",
            "PIXEL_TYPE=RGB",
            "COMPRESS=WEBP",
            "BLOCKXSIZE=256",
            "SRID=3857",
        ])
        .unwrap();
        assert_eq!(options.coverage.as_deref(), Some("ortho"));
        assert_eq!(options.pixel_type, Some(PixelType::Rgb));
        assert_eq!(options.compression, Compression::LossyWebp);
        assert_eq!(options.block_width, 256);
        assert_eq!(options.block_height, 512);
        assert_eq!(options.srid, Some(3857));
    }

    #[test]
    fn test_unknown_names_rejected() {
        assert!(CreateOptions::from_pairs(["COMPRESS=BZIP2"]).is_err());
        assert!(CreateOptions::from_pairs(["PIXEL_TYPE=CMYK"]).is_err());
        assert!(CreateOptions::from_pairs(["BLOCKXSIZE=0"]).is_err());
    }

    #[test]
    fn test_quality_defaults_per_kind() {
        let mut options = CreateOptions {
            compression: Compression::Jpeg,
            ..Default::default()
        };
        assert_eq!(options.resolved_compression(), (Compression::Jpeg, 75));

        options.compression = Compression::LossyJp2;
        assert_eq!(options.resolved_compression(), (Compression::LossyJp2, 20));

        options.compression = Compression::Deflate;
        assert_eq!(options.resolved_compression(), (Compression::Deflate, 100));
    }

    #[test]
    fn test_quality_100_upgrades_to_lossless() {
        let options = CreateOptions {
            compression: Compression::LossyWebp,
            quality: Some(100),
            ..Default::default()
        };
        assert_eq!(
            options.resolved_compression(),
            (Compression::LosslessWebp, 100)
        );
    }
}
