use crate::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable coordinate in the plane.
///
/// Points compare by value. The `Display` form `"(x, y)"` is the canonical text
/// used both for diagnostics and for comparing cluster memberships between rounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Reads the first two entries of a matrix row.
    ///
    /// The caller is expected to have checked the row has exactly two columns.
    pub fn from_row(row: ArrayView1<f64>) -> Self {
        Self::new(row[0], row[1])
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance between two points.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
