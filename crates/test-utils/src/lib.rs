//! Test fixtures: an in-memory store implementing both storage seams and
//! deterministic source rasters.

pub mod memory_store;
pub mod raster;

pub use memory_store::{coverage_definition, uniform_no_data, CoverageData, MemoryStore, SectionData};
pub use raster::MemoryRaster;
