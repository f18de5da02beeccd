//! Storage seams for the rasterdb access layer.
//!
//! The relational engine and the native raster library are external
//! collaborators; this crate defines them as traits ([`CoverageRegistry`]
//! for tabular metadata lookups, [`TileEngine`] for the opaque raster
//! primitives) together with the resolved data model they exchange.

pub mod engine;
pub mod registry;
pub mod store;
pub mod types;

pub use engine::{RawDataRequest, TileEngine, TileLoadJob, TileRequest};
pub use registry::CoverageRegistry;
pub use store::RasterStore;
pub use types::{
    BandStatistics, Coverage, CoverageEntry, Palette, PaletteEntry, PyramidRow, SectionEntry,
    SectionGeometry, MISSING_ABSTRACT, MISSING_TITLE,
};
