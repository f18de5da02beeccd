//! World-space extents.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Create a new extent.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Width of the extent in world units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the extent in world units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if a point is contained within this extent.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Check if this extent intersects another.
    pub fn intersects(&self, other: &Extent) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y)
    }

    /// Return a copy with min/max Y swapped into ascending order.
    ///
    /// Source geotransforms with a positive pixel height produce inverted
    /// Y bounds; storage always expects min_y <= max_y.
    pub fn normalized_y(&self) -> Self {
        if self.min_y > self.max_y {
            Self {
                min_x: self.min_x,
                min_y: self.max_y,
                max_x: self.max_x,
                max_y: self.min_y,
            }
        } else {
            *self
        }
    }
}
