//! Handle pairing a store path with its two seams.

use crate::engine::TileEngine;
use crate::registry::CoverageRegistry;

/// An opened raster store: the file path plus the registry and engine
/// implementations bound to it.
pub struct RasterStore {
    path: String,
    registry: Box<dyn CoverageRegistry>,
    engine: Box<dyn TileEngine>,
}

impl RasterStore {
    pub fn new(
        path: impl Into<String>,
        registry: Box<dyn CoverageRegistry>,
        engine: Box<dyn TileEngine>,
    ) -> Self {
        Self {
            path: path.into(),
            registry,
            engine,
        }
    }

    /// Path of the underlying store file.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn registry(&self) -> &dyn CoverageRegistry {
        self.registry.as_ref()
    }

    pub fn engine(&self) -> &dyn TileEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn TileEngine {
        self.engine.as_mut()
    }
}

impl std::fmt::Debug for RasterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
