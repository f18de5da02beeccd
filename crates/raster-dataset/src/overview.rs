//! Overview chain selection from pyramid level rows.

use tracing::debug;

use coverage_store::PyramidRow;
use raster_common::Extent;

/// Relative tolerance under which two resolutions count as equal.
const RESOLUTION_TOLERANCE: f64 = 1e-5;

/// Minimum pixel floor below which an overview is pruned (both dimensions).
const MIN_OVERVIEW_SIZE: u32 = 64;

/// Geometry of one retained overview level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OverviewSpec {
    pub x_res: f64,
    pub y_res: f64,
    pub width: u32,
    pub height: u32,
}

pub(crate) fn resolutions_equal(a: f64, b: f64) -> bool {
    ((a - b) / b).abs() < RESOLUTION_TOLERANCE
}

/// Select the overview chain for a dataset.
///
/// Candidates are taken in row order, up to four resolution pairs per row.
/// A candidate is skipped when its x-resolution matches the base or any
/// already-retained overview within the relative tolerance, when its
/// recomputed size degenerates to a single row or column, or when both
/// dimensions fall under the 64-pixel floor and `show_all` is not set.
pub(crate) fn build_chain(
    rows: &[PyramidRow],
    base_x_res: f64,
    base_extent: &Extent,
    show_all: bool,
) -> Vec<OverviewSpec> {
    let mut chain: Vec<OverviewSpec> = Vec::new();

    for row in rows {
        for &(x_res, y_res) in &row.resolutions {
            if x_res <= 0.0 || y_res <= 0.0 {
                continue;
            }
            if resolutions_equal(x_res, base_x_res) {
                continue;
            }
            if chain.iter().any(|o| resolutions_equal(x_res, o.x_res)) {
                continue;
            }

            let width = (base_extent.width() / x_res + 0.5) as i64;
            let height = (base_extent.height() / y_res + 0.5) as i64;
            if width <= 1 || height <= 1 {
                debug!(x_res, y_res, "pruning degenerate pyramid level");
                continue;
            }
            let (width, height) = (width as u32, height as u32);
            if width < MIN_OVERVIEW_SIZE && height < MIN_OVERVIEW_SIZE && !show_all {
                debug!(width, height, "pruning pyramid level under size floor");
                continue;
            }

            chain.push(OverviewSpec {
                x_res,
                y_res,
                width,
                height,
            });
        }
    }
    chain
}
