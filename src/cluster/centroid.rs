use crate::Point;
use std::fmt;

/// A group of points represented by its centroid.
///
/// Membership is transient: the engine clears it at the start of every round and
/// rebuilds it during assignment. The centroid is replaced, never mutated in place.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    id: usize,
    centroid: Point,
    members: Vec<Point>,
}

impl Cluster {
    pub fn new(id: usize, centroid: Point) -> Self {
        Self {
            id,
            centroid,
            members: Vec::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn centroid(&self) -> Point {
        self.centroid
    }

    pub fn members(&self) -> &[Point] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear_members(&mut self) {
        self.members.clear();
    }

    pub fn add_member(&mut self, point: Point) {
        self.members.push(point);
    }

    pub fn distance_to(&self, point: &Point) -> f64 {
        self.centroid.distance(point)
    }

    /// Moves the centroid to the mean of the current members.
    ///
    /// An empty cluster keeps its previous centroid.
    pub fn recompute_centroid(&mut self) {
        if self.members.is_empty() {
            return;
        }

        let (sum_x, sum_y) = self
            .members
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x(), sy + p.y()));
        let n = self.members.len() as f64;

        self.centroid = Point::new(sum_x / n, sum_y / n);
    }

    /// Canonical text of each member, in insertion order.
    pub fn list_members(&self) -> Vec<String> {
        self.members.iter().map(Point::to_string).collect()
    }

    pub fn centroid_label(&self) -> String {
        format!("Centroid {}: {}", self.id, self.centroid)
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cluster {}", self.id)?;
        writeln!(f, "  centroid: {}", self.centroid)?;
        write!(f, "  points: {}", self.list_members().join(", "))
    }
}
