//! Seam for the raster being ingested.

use raster_common::{ColorInterp, DataType, RasterResult};

/// A readable source raster for [`crate::create_copy`].
///
/// Pixel windows are delivered band-interleaved-by-pixel, matching the
/// layout the tile engine ingests.
pub trait SourceRaster {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn band_count(&self) -> usize;

    /// Data type shared by all bands.
    fn data_type(&self) -> DataType;

    /// The generic 6-coefficient geotransform.
    fn geo_transform(&self) -> [f64; 6];

    /// Spatial reference id, when the source carries one.
    fn srid(&self) -> Option<i32> {
        None
    }

    /// Color interpretation of one band (0-based), used for RGB inference.
    fn color_interp(&self, band: usize) -> ColorInterp {
        let _ = band;
        ColorInterp::Undefined
    }

    /// Read a pixel window into `dest`, band-interleaved.
    ///
    /// The window is guaranteed to lie fully inside the raster; `dest` is
    /// exactly `width * height * band_count * sample-size` bytes.
    fn read_window(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        dest: &mut [u8],
    ) -> RasterResult<()>;
}
