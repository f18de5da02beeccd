//! Tabular metadata lookups against the relational store.

use raster_common::{Extent, RasterResult};

use crate::types::{CoverageEntry, PyramidRow, SectionEntry};

/// Generic relational lookups: catalog rows, extents, reference systems,
/// pyramid level tables. Everything here is plain tabular data; opaque
/// raster operations live on [`crate::TileEngine`].
pub trait CoverageRegistry {
    /// All raster coverages present in the store.
    fn list_coverages(&self) -> RasterResult<Vec<CoverageEntry>>;

    /// Catalog row for one coverage, if present.
    fn coverage_entry(&self, coverage: &str) -> RasterResult<Option<CoverageEntry>>;

    /// Registered full extent of a coverage. `None` until the coverage has
    /// been populated.
    fn coverage_extent(&self, coverage: &str) -> RasterResult<Option<Extent>>;

    /// Spatial reference text for a numeric reference-system id.
    fn srs_wkt(&self, srid: i32) -> RasterResult<Option<String>>;

    /// Whether a reference-system id is registered at all.
    fn srid_exists(&self, srid: i32) -> RasterResult<bool>;

    /// Coverage-global pyramid level rows, ordered by decreasing detail.
    fn pyramid_rows(&self, coverage: &str) -> RasterResult<Vec<PyramidRow>>;

    /// Per-section pyramid level rows, ordered by decreasing detail.
    fn section_pyramid_rows(&self, coverage: &str, section: i64)
        -> RasterResult<Vec<PyramidRow>>;

    /// Sections of a coverage, in catalog order.
    fn sections(&self, coverage: &str) -> RasterResult<Vec<SectionEntry>>;

    /// Free-text summary stored for one section, if any.
    fn section_summary(&self, coverage: &str, section: i64) -> RasterResult<Option<String>>;

    /// Resolution pairs of externally-installed overviews persisted in the
    /// store's metadata tables. Used only when the coverage itself yields no
    /// pyramid rows.
    fn persisted_overviews(&self, coverage: &str) -> RasterResult<Vec<(f64, f64)>>;
}
