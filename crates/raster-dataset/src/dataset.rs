//! Resolved dataset and per-level views.

use std::collections::BTreeMap;

use coverage_store::{Coverage, RasterStore};
use raster_common::{ConnectionId, GeoTransform};

use crate::band::RasterBand;
use crate::cache::BlockCache;

/// One resolution level of a dataset: the base raster or one overview.
pub struct DatasetLevel {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) x_res: f64,
    pub(crate) y_res: f64,
    pub(crate) geo: GeoTransform,
    pub(crate) bands: Vec<RasterBand>,
    pub(crate) cache: BlockCache,
}

impl DatasetLevel {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Absolute x/y resolution of this level.
    pub fn resolution(&self) -> (f64, f64) {
        (self.x_res, self.y_res)
    }

    pub fn geo_transform(&self) -> GeoTransform {
        self.geo
    }

    pub fn band_count(&self) -> u8 {
        self.bands.len() as u8
    }

    /// Band by 1-based index.
    pub fn band(&self, index: u8) -> Option<&RasterBand> {
        index
            .checked_sub(1)
            .and_then(|i| self.bands.get(i as usize))
    }

    /// Mutable band access (needed for the lazily-built color table).
    pub fn band_mut(&mut self, index: u8) -> Option<&mut RasterBand> {
        index
            .checked_sub(1)
            .and_then(move |i| self.bands.get_mut(i as usize))
    }
}

/// An opened raster surface: the base level plus its overview chain.
///
/// The dataset owns the store handle, the resolved coverage definition and
/// every level; overview levels live exactly as long as the dataset.
pub struct RasterDataset {
    pub(crate) store: RasterStore,
    pub(crate) coverage: Coverage,
    pub(crate) connection: ConnectionId,
    pub(crate) section_id: Option<i64>,
    pub(crate) single_section: bool,
    pub(crate) promoted_1bit: bool,
    pub(crate) srs_wkt: Option<String>,
    pub(crate) metadata: BTreeMap<String, String>,
    pub(crate) image_structure: BTreeMap<String, String>,
    /// `levels[0]` is the base raster; the rest are overviews in chain order.
    pub(crate) levels: Vec<DatasetLevel>,
}

impl RasterDataset {
    /// Connection identifier this dataset was resolved from.
    pub fn connection(&self) -> &ConnectionId {
        &self.connection
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    /// Active section id, if the dataset is section-scoped.
    pub fn section_id(&self) -> Option<i64> {
        self.section_id
    }

    pub fn width(&self) -> u32 {
        self.levels[0].width
    }

    pub fn height(&self) -> u32 {
        self.levels[0].height
    }

    pub fn geo_transform(&self) -> GeoTransform {
        self.levels[0].geo
    }

    pub fn srs_wkt(&self) -> Option<&str> {
        self.srs_wkt.as_deref()
    }

    pub fn band_count(&self) -> u8 {
        self.levels[0].band_count()
    }

    /// Band of the base level by 1-based index.
    pub fn band(&self, index: u8) -> Option<&RasterBand> {
        self.levels[0].band(index)
    }

    /// Default-domain metadata.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Image-structure-domain metadata (COMPRESSION, QUALITY).
    pub fn image_structure_metadata(&self) -> &BTreeMap<String, String> {
        &self.image_structure
    }

    /// Number of overview levels (excluding the base).
    pub fn overview_count(&self) -> usize {
        self.levels.len() - 1
    }

    /// Level by index; 0 is the base, 1.. are overviews.
    pub fn level(&self, index: usize) -> Option<&DatasetLevel> {
        self.levels.get(index)
    }

    pub fn level_mut(&mut self, index: usize) -> Option<&mut DatasetLevel> {
        self.levels.get_mut(index)
    }

    /// Whether 1-bit monochrome is promoted to 8-bit on this dataset.
    pub fn promoted_1bit(&self) -> bool {
        self.promoted_1bit
    }

    /// Give the store handle back, closing the dataset.
    pub fn into_store(self) -> RasterStore {
        self.store
    }
}

impl std::fmt::Debug for RasterDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterDataset")
            .field("connection", &self.connection.to_string())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("bands", &self.band_count())
            .field("overviews", &self.overview_count())
            .finish_non_exhaustive()
    }
}
