//! Deterministic in-memory source rasters.

use ingestion::SourceRaster;
use raster_common::{ColorInterp, DataType, RasterError, RasterResult};

/// An in-memory raster usable as an ingestion source.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    width: u32,
    height: u32,
    bands: usize,
    data_type: DataType,
    geo: [f64; 6],
    srid: Option<i32>,
    interps: Vec<ColorInterp>,
    data: Vec<u8>,
}

impl MemoryRaster {
    pub fn new(
        width: u32,
        height: u32,
        bands: usize,
        data_type: DataType,
        geo: [f64; 6],
        data: Vec<u8>,
    ) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * bands * data_type.size_bytes(),
            "pixel buffer does not match raster shape"
        );
        Self {
            width,
            height,
            bands,
            data_type,
            geo,
            srid: None,
            interps: vec![ColorInterp::Undefined; bands],
            data,
        }
    }

    /// Single-band 8-bit raster with value `(x + y) % 256`, north-up with
    /// unit pixels anchored at the origin.
    pub fn gradient_u8(width: u32, height: u32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(((x + y) % 256) as u8);
            }
        }
        Self::new(width, height, 1, DataType::U8, north_up(width, height), data)
    }

    /// Single-band u16 raster with value `(x * 31 + y * 17) % 4096`; pixels
    /// on the main diagonal step of 13 are forced to zero.
    pub fn sparse_u16(width: u32, height: u32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 2);
        for y in 0..height {
            for x in 0..width {
                let value = if (x + y) % 13 == 0 {
                    0u16
                } else {
                    ((x * 31 + y * 17) % 4096) as u16
                };
                data.extend_from_slice(&value.to_ne_bytes());
            }
        }
        Self::new(width, height, 1, DataType::U16, north_up(width, height), data)
    }

    /// Three-band 8-bit RGB raster with channel-distinct ramps.
    pub fn rgb_u8(width: u32, height: u32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                data.push((x % 256) as u8);
                data.push((y % 256) as u8);
                data.push(((x + y) % 256) as u8);
            }
        }
        let mut raster = Self::new(width, height, 3, DataType::U8, north_up(width, height), data);
        raster.interps = vec![ColorInterp::Red, ColorInterp::Green, ColorInterp::Blue];
        raster
    }

    pub fn with_geo_transform(mut self, geo: [f64; 6]) -> Self {
        self.geo = geo;
        self
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn with_color_interps(mut self, interps: Vec<ColorInterp>) -> Self {
        assert_eq!(interps.len(), self.bands);
        self.interps = interps;
        self
    }

    /// Raw sample bytes of one pixel/band, for assertions.
    pub fn sample_bytes(&self, x: u32, y: u32, band: usize) -> &[u8] {
        let size = self.data_type.size_bytes();
        let offset = ((y as usize * self.width as usize + x as usize) * self.bands + band) * size;
        &self.data[offset..offset + size]
    }

    pub fn value_u8(&self, x: u32, y: u32, band: usize) -> u8 {
        self.sample_bytes(x, y, band)[0]
    }

    pub fn value_u16(&self, x: u32, y: u32, band: usize) -> u16 {
        let bytes = self.sample_bytes(x, y, band);
        u16::from_ne_bytes([bytes[0], bytes[1]])
    }
}

/// North-up unit-pixel geotransform with the raster's top-left at (0, height).
fn north_up(_width: u32, height: u32) -> [f64; 6] {
    [0.0, 1.0, 0.0, height as f64, 0.0, -1.0]
}

impl SourceRaster for MemoryRaster {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn geo_transform(&self) -> [f64; 6] {
        self.geo
    }

    fn srid(&self) -> Option<i32> {
        self.srid
    }

    fn color_interp(&self, band: usize) -> ColorInterp {
        self.interps.get(band).copied().unwrap_or(ColorInterp::Undefined)
    }

    fn read_window(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        dest: &mut [u8],
    ) -> RasterResult<()> {
        if x + width > self.width || y + height > self.height {
            return Err(RasterError::read_failed(format!(
                "window {}x{}+{}+{} outside raster {}x{}",
                width, height, x, y, self.width, self.height
            )));
        }
        let pixel_size = self.bands * self.data_type.size_bytes();
        let row_bytes = width as usize * pixel_size;
        for row in 0..height as usize {
            let src =
                ((y as usize + row) * self.width as usize + x as usize) * pixel_size;
            dest[row * row_bytes..(row + 1) * row_bytes]
                .copy_from_slice(&self.data[src..src + row_bytes]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_values() {
        let raster = MemoryRaster::gradient_u8(10, 10);
        assert_eq!(raster.value_u8(0, 0, 0), 0);
        assert_eq!(raster.value_u8(3, 4, 0), 7);
    }

    #[test]
    fn test_read_window() {
        let raster = MemoryRaster::gradient_u8(8, 8);
        let mut dest = vec![0u8; 4];
        raster.read_window(2, 3, 2, 2, &mut dest).unwrap();
        assert_eq!(dest, vec![5, 6, 6, 7]);
    }

    #[test]
    fn test_read_window_rejects_out_of_bounds() {
        let raster = MemoryRaster::gradient_u8(8, 8);
        let mut dest = vec![0u8; 4];
        assert!(raster.read_window(7, 7, 2, 2, &mut dest).is_err());
    }

    #[test]
    fn test_rgb_band_order() {
        let raster = MemoryRaster::rgb_u8(4, 4);
        assert_eq!(raster.color_interp(0), ColorInterp::Red);
        assert_eq!(raster.value_u8(2, 1, 0), 2);
        assert_eq!(raster.value_u8(2, 1, 1), 1);
        assert_eq!(raster.value_u8(2, 1, 2), 3);
    }
}
