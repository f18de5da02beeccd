//! Write path: bulk-copy a source raster into a rasterdb coverage.

pub mod options;
pub mod pipeline;
pub mod source;

pub use options::CreateOptions;
pub use pipeline::create_copy;
pub use source::SourceRaster;
