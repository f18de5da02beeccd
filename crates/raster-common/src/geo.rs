//! Affine geotransforms without rotation or shear.

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, RasterResult};
use crate::extent::Extent;

/// Axis-aligned affine geotransform.
///
/// `pixel_height` is negative for the usual north-up rasters. The rotation
/// and shear coefficients of the generic 6-term form are always zero in
/// this model; [`GeoTransform::from_coefficients`] rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// World X of the top-left corner.
    pub origin_x: f64,
    /// Pixel width in world units (positive).
    pub pixel_width: f64,
    /// World Y of the top-left corner.
    pub origin_y: f64,
    /// Pixel height in world units (negative for north-up).
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Derive the geotransform covering `extent` with the given raster size.
    pub fn from_extent(extent: &Extent, width: u32, height: u32) -> Self {
        Self {
            origin_x: extent.min_x,
            pixel_width: extent.width() / width as f64,
            origin_y: extent.max_y,
            pixel_height: -(extent.height() / height as f64),
        }
    }

    /// Build from the generic 6-coefficient form, rejecting rotation/shear.
    pub fn from_coefficients(c: &[f64; 6]) -> RasterResult<Self> {
        if c[2] != 0.0 || c[4] != 0.0 {
            return Err(RasterError::RotatedGeoTransform);
        }
        Ok(Self {
            origin_x: c[0],
            pixel_width: c[1],
            origin_y: c[3],
            pixel_height: c[5],
        })
    }

    /// The generic 6-coefficient form (rotation/shear terms zero).
    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            self.pixel_height,
        ]
    }

    /// Absolute x/y resolution.
    pub fn resolution(&self) -> (f64, f64) {
        (self.pixel_width, self.pixel_height.abs())
    }

    /// The world extent covered by a raster of the given size.
    pub fn extent(&self, width: u32, height: u32) -> Extent {
        let max_x = self.origin_x + self.pixel_width * width as f64;
        let min_y = self.origin_y + self.pixel_height * height as f64;
        Extent::new(self.origin_x, min_y, max_x, self.origin_y)
    }

    /// World rectangle of one block, given block index and block size.
    pub fn block_extent(&self, block_x: u32, block_y: u32, block_w: u32, block_h: u32) -> Extent {
        let min_x =
            self.origin_x + (block_x as f64) * (block_w as f64) * self.pixel_width;
        let max_x = min_x + block_w as f64 * self.pixel_width;
        let max_y =
            self.origin_y + (block_y as f64) * (block_h as f64) * self.pixel_height;
        let min_y = max_y + block_h as f64 * self.pixel_height;
        Extent::new(min_x, min_y, max_x, max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extent() {
        let e = Extent::new(0.0, 0.0, 100.0, 50.0);
        let gt = GeoTransform::from_extent(&e, 200, 100);
        assert_eq!(gt.origin_x, 0.0);
        assert_eq!(gt.origin_y, 50.0);
        assert!((gt.pixel_width - 0.5).abs() < 1e-12);
        assert!((gt.pixel_height + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_rotation() {
        let c = [0.0, 1.0, 0.1, 0.0, 0.0, -1.0];
        assert!(matches!(
            GeoTransform::from_coefficients(&c),
            Err(RasterError::RotatedGeoTransform)
        ));
    }

    #[test]
    fn test_coefficients_roundtrip() {
        let gt = GeoTransform {
            origin_x: 10.0,
            pixel_width: 2.0,
            origin_y: 20.0,
            pixel_height: -2.0,
        };
        let back = GeoTransform::from_coefficients(&gt.coefficients()).unwrap();
        assert_eq!(gt, back);
    }

    #[test]
    fn test_block_extent() {
        let gt = GeoTransform {
            origin_x: 0.0,
            pixel_width: 1.0,
            origin_y: 100.0,
            pixel_height: -1.0,
        };
        let e = gt.block_extent(1, 2, 32, 32);
        assert_eq!(e.min_x, 32.0);
        assert_eq!(e.max_x, 64.0);
        assert_eq!(e.max_y, 36.0);
        assert_eq!(e.min_y, 4.0);
    }

    #[test]
    fn test_extent_roundtrip() {
        let e = Extent::new(5.0, -10.0, 25.0, 30.0);
        let gt = GeoTransform::from_extent(&e, 40, 80);
        let back = gt.extent(40, 80);
        assert!((back.min_x - e.min_x).abs() < 1e-9);
        assert!((back.max_y - e.max_y).abs() < 1e-9);
        assert!((back.min_y - e.min_y).abs() < 1e-9);
    }
}
