//! Opaque raster primitives backed by the native raster library.

use raster_common::{Extent, Pixel, RasterResult, SampleType};

use crate::types::{BandStatistics, Coverage, SectionGeometry};

/// One raw pixel extraction request.
///
/// The buffer returned for it is band-interleaved-by-pixel, exactly
/// `width * height * bands * sample-size` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataRequest<'a> {
    pub coverage: &'a str,
    /// Restrict the extraction to one section's tiles.
    pub section: Option<i64>,
    /// World rectangle to extract.
    pub extent: Extent,
    pub width: u32,
    pub height: u32,
    /// Resolution of the level being read.
    pub x_res: f64,
    pub y_res: f64,
    pub sample_type: SampleType,
    pub bands: u8,
    /// Fill for pixels not covered by any tile.
    pub no_data: Option<&'a Pixel>,
    /// Decode worker hint; block reads always pass 1.
    pub max_workers: u32,
}

/// Target of one section ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLoadJob {
    pub coverage: String,
    pub section: String,
    pub width: u32,
    pub height: u32,
    pub extent: Extent,
    pub srid: i32,
}

/// One tile the engine asks the ingestion callback to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    /// Tile column, row-major order.
    pub tile_x: u32,
    /// Tile row, row-major order.
    pub tile_y: u32,
    /// Pixel offset of the tile's top-left corner in the section.
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Opaque raster-library primitives: coverage introspection, raw pixel
/// extraction, tile ingestion and transaction control.
pub trait TileEngine {
    /// Decode the full coverage definition, if the coverage exists.
    fn coverage(&self, name: &str) -> RasterResult<Option<Coverage>>;

    /// Base resolution and full extent of one section.
    fn section_geometry(
        &self,
        coverage: &str,
        section: i64,
    ) -> RasterResult<Option<SectionGeometry>>;

    /// Extract a raw pixel window. The result must be exactly
    /// `width * height * bands * sample-size` bytes, band-interleaved.
    fn read_raw(&self, request: &RawDataRequest) -> RasterResult<Vec<u8>>;

    /// Decode per-band statistics from the coverage's statistics blob.
    fn coverage_statistics(&self, coverage: &str) -> RasterResult<Option<Vec<BandStatistics>>>;

    fn begin(&mut self) -> RasterResult<()>;

    fn commit(&mut self) -> RasterResult<()>;

    fn rollback(&mut self) -> RasterResult<()>;

    /// Create an empty coverage definition.
    fn create_coverage(&mut self, definition: &Coverage) -> RasterResult<()>;

    /// Stream one section's tiles into the store, returning the new
    /// section's id.
    ///
    /// The engine walks tiles row-major and calls `fill` once per tile; the
    /// callback returns the tile's band-interleaved pixel buffer, zero-padded
    /// past the section edge. An error from the callback aborts the run.
    fn ingest_section(
        &mut self,
        job: &TileLoadJob,
        fill: &mut dyn FnMut(&TileRequest) -> RasterResult<Vec<u8>>,
    ) -> RasterResult<i64>;

    /// Build or refresh the pyramid for a coverage, or one section of it.
    fn build_pyramid(
        &mut self,
        coverage: &str,
        section: Option<&str>,
        strict_resolution: bool,
    ) -> RasterResult<()>;
}
