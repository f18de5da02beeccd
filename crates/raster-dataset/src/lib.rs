//! Consumer-side raster model over a rasterdb store.
//!
//! Resolves connection identifiers into [`RasterDataset`] objects: base
//! geometry, per-band descriptors, a deduplicated overview chain, and
//! cached block-level reads.

pub mod band;
pub mod cache;
pub mod dataset;
pub mod open;
pub mod options;
mod overview;
mod read;

pub use band::{ColorEntry, ColorTable, RasterBand};
pub use cache::{BlockCache, BlockKey};
pub use dataset::{DatasetLevel, RasterDataset};
pub use open::{
    open_subdataset, probe_store, subdataset_metadata, OpenOutcome, ProbeOutcome, SubdatasetEntry,
};
pub use options::OpenOptions;
