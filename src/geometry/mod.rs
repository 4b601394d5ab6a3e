use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in the drawing-surface frame, in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Exact equality when `tolerance` is zero, Euclidean distance otherwise.
    pub fn coincides(&self, other: &Position, tolerance: f64) -> bool {
        if tolerance <= 0.0 {
            self == other
        } else {
            self.distance(other) <= tolerance
        }
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min: Position,
    pub max: Position,
}

impl Envelope {
    pub fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: &Position) -> bool {
        (self.min.x..=self.max.x).contains(&p.x) && (self.min.y..=self.max.y).contains(&p.y)
    }

    pub fn clamp(&self, p: Position) -> Position {
        Position {
            x: p.x.clamp(self.min.x, self.max.x),
            y: p.y.clamp(self.min.y, self.max.y),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(Position::ORIGIN, Position::new(5.0, 5.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_is_component_wise() {
        let envelope = Envelope::default();
        assert_eq!(
            envelope.clamp(Position::new(-1.0, 7.5)),
            Position::new(0.0, 5.0)
        );
        assert_eq!(
            envelope.clamp(Position::new(6.0, 2.0)),
            Position::new(5.0, 2.0)
        );
        let inside = Position::new(1.25, 4.0);
        assert_eq!(envelope.clamp(inside), inside);
        assert!(envelope.contains(&inside));
    }

    #[test]
    fn test_coincides_exact_and_tolerant() {
        let a = Position::new(1.0, 1.0);
        let b = Position::new(1.0 + 1e-9, 1.0);
        assert!(!a.coincides(&b, 0.0));
        assert!(a.coincides(&b, 1e-6));
        assert!(a.coincides(&a, 0.0));
    }
}
