pub mod shapes;
pub mod stitch;

pub use stitch::stitch;

use crate::geometry::{Envelope, Position};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathSegment {
    points: Vec<Position>,
}

impl PathSegment {
    pub fn new(points: Vec<Position>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Position] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Position> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Position> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Position> {
        self.points.last()
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 1 && self.first() == self.last()
    }

    pub fn clamped(&self, envelope: &Envelope) -> PathSegment {
        PathSegment::new(self.points.iter().map(|p| envelope.clamp(*p)).collect())
    }
}

impl From<Vec<Position>> for PathSegment {
    fn from(points: Vec<Position>) -> Self {
        Self::new(points)
    }
}

impl From<Vec<(f64, f64)>> for PathSegment {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Self::new(points.into_iter().map(Position::from).collect())
    }
}
