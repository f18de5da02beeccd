//! Block-level reads with sibling-band cache fill.

use tracing::{debug, error};

use coverage_store::RawDataRequest;
use raster_common::{PixelType, RasterError, RasterResult, SampleType};

use crate::dataset::RasterDataset;

/// Which raw-extraction primitive a block fetch goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchScope {
    Section(i64),
    WholeCoverage,
}

/// Section-scoped fetch applies only when a section is active and the level
/// is either the top-level section raster or any level of a
/// mixed-resolutions coverage.
fn fetch_scope(section_id: Option<i64>, mixed_resolutions: bool, is_base: bool) -> FetchScope {
    match section_id {
        Some(id) if mixed_resolutions || is_base => FetchScope::Section(id),
        _ => FetchScope::WholeCoverage,
    }
}

impl RasterDataset {
    /// Read one block of one band at the given level.
    ///
    /// Satisfying a miss fetches the full multi-band tile once and also
    /// populates the cache for every sibling band not already present;
    /// sibling inserts that do not fit the budget are silently skipped.
    pub fn read_block(
        &mut self,
        level: usize,
        band: u8,
        block_x: u32,
        block_y: u32,
    ) -> RasterResult<Vec<u8>> {
        if level >= self.levels.len() {
            return Err(RasterError::read_failed(format!(
                "no such resolution level: {}",
                level
            )));
        }
        let band_count = self.coverage.bands;
        if band == 0 || band > band_count {
            return Err(RasterError::read_failed(format!(
                "no such band: {}",
                band
            )));
        }

        let key = (band, block_x, block_y);
        if let Some(cached) = self.levels[level].cache.get(&key) {
            return Ok(cached.clone());
        }

        let lvl = &self.levels[level];
        let (block_w, block_h) = (self.coverage.tile_width, self.coverage.tile_height);
        let extent = lvl.geo.block_extent(block_x, block_y, block_w, block_h);
        let is_base = level == 0;
        let monochrome = self.coverage.pixel_type == PixelType::Monochrome
            && self.coverage.sample_type == SampleType::U1;
        // Monochrome storage is requested as grayscale for consistent byte
        // expansion, except on the un-promoted base level.
        let request_sample = if monochrome && (self.promoted_1bit || !is_base) {
            SampleType::U8
        } else {
            self.coverage.sample_type
        };
        let sample_size = request_sample.format().data_type.size_bytes();

        let scope = fetch_scope(self.section_id, self.coverage.mixed_resolutions, is_base);
        let request = RawDataRequest {
            coverage: &self.coverage.name,
            section: match scope {
                FetchScope::Section(id) => Some(id),
                FetchScope::WholeCoverage => None,
            },
            extent,
            width: block_w,
            height: block_h,
            x_res: lvl.x_res,
            y_res: lvl.y_res,
            sample_type: request_sample,
            bands: band_count,
            no_data: self.coverage.no_data.as_ref(),
            max_workers: 1,
        };
        debug!(level, band, block_x, block_y, ?scope, "fetching block");
        let buffer = self.store.engine().read_raw(&request)?;

        let expected =
            block_w as usize * block_h as usize * sample_size * band_count as usize;
        if buffer.len() != expected {
            error!(
                expected,
                actual = buffer.len(),
                "discarding tile buffer with mismatched size"
            );
            return Err(RasterError::BlockSizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }

        let collapse = monochrome && !self.promoted_1bit && !is_base;
        let requested = extract_band(&buffer, band, band_count, sample_size, collapse);

        let cache = &mut self.levels[level].cache;
        for sibling in 1..=band_count {
            if sibling == band {
                continue;
            }
            let sibling_key = (sibling, block_x, block_y);
            if cache.contains(&sibling_key) {
                continue;
            }
            cache.insert(
                sibling_key,
                extract_band(&buffer, sibling, band_count, sample_size, collapse),
            );
        }
        cache.insert(key, requested.clone());
        Ok(requested)
    }
}

/// De-interleave one band from a band-minor buffer.
fn extract_band(
    buffer: &[u8],
    band: u8,
    bands: u8,
    sample_size: usize,
    collapse_1bit: bool,
) -> Vec<u8> {
    let stride = bands as usize * sample_size;
    let offset = (band as usize - 1) * sample_size;
    let pixels = buffer.len() / stride;
    let mut out = Vec::with_capacity(pixels * sample_size);
    if collapse_1bit {
        // Storage expanded the bits to 0/255; the caller opted out of
        // promotion, so fold back to strict 0/1.
        for pixel in 0..pixels {
            let value = buffer[pixel * stride + offset];
            out.push(if value > 127 { 1 } else { 0 });
        }
    } else {
        for pixel in 0..pixels {
            let start = pixel * stride + offset;
            out.extend_from_slice(&buffer[start..start + sample_size]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_scope_decision() {
        assert_eq!(fetch_scope(None, false, true), FetchScope::WholeCoverage);
        assert_eq!(fetch_scope(None, true, false), FetchScope::WholeCoverage);
        assert_eq!(fetch_scope(Some(4), false, true), FetchScope::Section(4));
        assert_eq!(fetch_scope(Some(4), true, false), FetchScope::Section(4));
        // Overview of a section on a uniform coverage reads whole-coverage.
        assert_eq!(fetch_scope(Some(4), false, false), FetchScope::WholeCoverage);
    }

    #[test]
    fn test_extract_band_strided() {
        // Two pixels, three u16 bands, band-minor layout.
        let buffer: Vec<u8> = vec![
            1, 0, 2, 0, 3, 0, // pixel 0: bands 1..3
            4, 0, 5, 0, 6, 0, // pixel 1
        ];
        assert_eq!(extract_band(&buffer, 1, 3, 2, false), vec![1, 0, 4, 0]);
        assert_eq!(extract_band(&buffer, 2, 3, 2, false), vec![2, 0, 5, 0]);
        assert_eq!(extract_band(&buffer, 3, 3, 2, false), vec![3, 0, 6, 0]);
    }

    #[test]
    fn test_extract_band_collapses_expanded_bits() {
        let buffer = vec![0u8, 255, 128, 127, 200, 3];
        assert_eq!(
            extract_band(&buffer, 1, 1, 1, true),
            vec![0, 1, 1, 0, 1, 0]
        );
    }
}
