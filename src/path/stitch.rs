use std::collections::VecDeque;

use super::PathSegment;

enum Join {
    Append,
    Prepend,
}

/// `tolerance` of `0.0` requires exact coordinate equality; anything larger
/// joins endpoints within that distance. Empty segments are dropped.
pub fn stitch<I>(segments: I, tolerance: f64) -> Vec<PathSegment>
where
    I: IntoIterator<Item = PathSegment>,
{
    let mut pending: VecDeque<PathSegment> =
        segments.into_iter().filter(|s| !s.is_empty()).collect();
    let mut chains = Vec::new();

    while let Some(mut chain) = pending.pop_front() {
        while let Some((index, join)) = find_join(&chain, &pending, tolerance) {
            let Some(other) = pending.remove(index) else {
                break;
            };

            match join {
                Join::Append => chain.points.extend(other.points.into_iter().skip(1)),
                Join::Prepend => {
                    let mut points = other.points;
                    points.pop();
                    points.append(&mut chain.points);
                    chain.points = points;
                }
            }
        }
        chains.push(chain);
    }

    chains
}

fn find_join(
    chain: &PathSegment,
    pending: &VecDeque<PathSegment>,
    tolerance: f64,
) -> Option<(usize, Join)> {
    let (head, tail) = (chain.first()?, chain.last()?);

    pending.iter().enumerate().find_map(|(index, other)| {
        let (first, last) = (other.first()?, other.last()?);
        if tail.coincides(first, tolerance) {
            Some((index, Join::Append))
        } else if head.coincides(last, tolerance) {
            Some((index, Join::Prepend))
        } else {
            None
        }
    })
}
