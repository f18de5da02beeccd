//! Shared types for the rasterdb access layer.
//!
//! Leaf crate with no I/O: error taxonomy, world-space extents and
//! geotransforms, the connection-identifier grammar, and the pixel format
//! translation tables shared by the read and write paths.

pub mod connection;
pub mod error;
pub mod extent;
pub mod fmt;
pub mod geo;
pub mod pixel;

pub use connection::{ConnectionId, SectionRef, SCHEME};
pub use error::{RasterError, RasterResult};
pub use extent::Extent;
pub use fmt::fmt_significant;
pub use geo::GeoTransform;
pub use pixel::{
    ColorInterp, Compression, DataType, Pixel, PixelType, SampleFormat, SampleType,
};
