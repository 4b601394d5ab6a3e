use super::PathSegment;
use crate::geometry::Position;

/// Closed rectangle traced counter-clockwise from its bottom-left corner.
pub fn rectangle(bottom_left: Position, width: f64, height: f64) -> PathSegment {
    let Position { x, y } = bottom_left;
    PathSegment::new(vec![
        bottom_left,
        Position::new(x + width, y),
        Position::new(x + width, y + height),
        Position::new(x, y + height),
        bottom_left,
    ])
}

pub fn square(bottom_left: Position, side: f64) -> PathSegment {
    rectangle(bottom_left, side, side)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_corners() {
        let rect = rectangle(Position::new(1.0, 2.0), 3.0, 0.5);
        assert_eq!(
            rect,
            PathSegment::from(vec![
                (1.0, 2.0),
                (4.0, 2.0),
                (4.0, 2.5),
                (1.0, 2.5),
                (1.0, 2.0)
            ])
        );
        assert!(rect.is_closed());
    }
}
