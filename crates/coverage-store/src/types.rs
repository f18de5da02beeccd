//! Resolved data model exchanged across the storage seams.

use serde::{Deserialize, Serialize};

use raster_common::{Compression, Extent, Pixel, PixelType, SampleType};

/// Placeholder the registry stores when a coverage has no title.
pub const MISSING_TITLE: &str = "*** missing Title ***";

/// Placeholder the registry stores when a coverage has no abstract.
pub const MISSING_ABSTRACT: &str = "*** missing Abstract ***";

/// A fully resolved coverage definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub name: String,
    pub sample_type: SampleType,
    pub pixel_type: PixelType,
    pub bands: u8,
    pub compression: Compression,
    /// Quality setting; meaningful only for lossy compressions.
    pub quality: i32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub srid: i32,
    /// Base horizontal resolution in world units per pixel.
    pub x_res: f64,
    /// Base vertical resolution in world units per pixel (positive).
    pub y_res: f64,
    /// Sections must match the declared base resolution exactly.
    pub strict_resolution: bool,
    /// Sections are allowed to carry differing base resolutions.
    pub mixed_resolutions: bool,
    pub section_paths: bool,
    pub section_md5: bool,
    pub section_summaries: bool,
    pub no_data: Option<Pixel>,
    pub palette: Option<Palette>,
}

/// Stored palette for palette-typed coverages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub entries: Vec<PaletteEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Per-band statistics as decoded from the coverage's statistics blob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
}

/// One pyramid level row: up to four (x, y) resolution pairs covering the
/// intra-row scale factors 1, 2, 4 and 8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyramidRow {
    pub resolutions: Vec<(f64, f64)>,
}

/// Catalog row for one coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageEntry {
    pub name: String,
    pub title: Option<String>,
    pub abstract_: Option<String>,
}

impl CoverageEntry {
    /// Title, unless absent or the stored placeholder.
    pub fn real_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty() && *t != MISSING_TITLE)
    }

    /// Abstract, unless absent or the stored placeholder.
    pub fn real_abstract(&self) -> Option<&str> {
        self.abstract_
            .as_deref()
            .filter(|a| !a.is_empty() && *a != MISSING_ABSTRACT)
    }
}

/// Catalog row for one section of a coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub id: i64,
    pub name: String,
}

/// Base geometry of a section: resolution plus full world extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionGeometry {
    pub x_res: f64,
    pub y_res: f64,
    pub extent: Extent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_title_filtered() {
        let entry = CoverageEntry {
            name: "dem".to_string(),
            title: Some(MISSING_TITLE.to_string()),
            abstract_: Some("elevation grid".to_string()),
        };
        assert_eq!(entry.real_title(), None);
        assert_eq!(entry.real_abstract(), Some("elevation grid"));
    }

    #[test]
    fn test_empty_title_filtered() {
        let entry = CoverageEntry {
            name: "dem".to_string(),
            title: Some(String::new()),
            abstract_: None,
        };
        assert_eq!(entry.real_title(), None);
        assert_eq!(entry.real_abstract(), None);
    }
}
