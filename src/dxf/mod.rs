pub mod error;

use std::collections::BTreeMap;

use crate::{geometry::Position, path::PathSegment};
pub use error::DxfError;

pub const ENTITY_START: i32 = 0;
pub const X_COORDINATE: i32 = 10;
pub const Y_COORDINATE: i32 = 20;
pub const FLAGS: i32 = 70;
pub const VERTEX_COUNT: i32 = 90;

pub const LWPOLYLINE: &str = "LWPOLYLINE";

const CLOSED_FLAG: i64 = 1;

/// Untyped entity: every group code with the values seen for it, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEntity {
    pub kind: String,
    /// Line of the entity's `0` group code, 1-based.
    pub line: usize,
    pub groups: BTreeMap<i32, Vec<String>>,
}

impl RawEntity {
    pub fn values(&self, code: i32) -> &[String] {
        self.groups.get(&code).map(Vec::as_slice).unwrap_or(&[])
    }

    fn required(&self, code: i32) -> Result<&[String], DxfError> {
        self.groups
            .get(&code)
            .map(Vec::as_slice)
            .ok_or_else(|| DxfError::MissingGroup {
                line: self.line,
                kind: self.kind.clone(),
                code,
            })
    }

    fn parse_value<T: std::str::FromStr>(&self, code: i32, value: &str) -> Result<T, DxfError> {
        value.trim().parse().map_err(|_| DxfError::InvalidValue {
            line: self.line,
            code,
            value: value.to_string(),
        })
    }

    fn parse_coordinate(&self, code: i32, value: &str) -> Result<f64, DxfError> {
        let coordinate: f64 = self.parse_value(code, value)?;
        if !coordinate.is_finite() {
            return Err(DxfError::InvalidValue {
                line: self.line,
                code,
                value: value.to_string(),
            });
        }
        Ok(coordinate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LwPolyline {
    pub vertices: Vec<Position>,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    LwPolyline(LwPolyline),
    Other(RawEntity),
}

impl TryFrom<RawEntity> for Entity {
    type Error = DxfError;

    fn try_from(raw: RawEntity) -> Result<Self, Self::Error> {
        if raw.kind != LWPOLYLINE {
            return Ok(Entity::Other(raw));
        }

        let count_values = raw.required(VERTEX_COUNT)?;
        let expected: usize = raw.parse_value(VERTEX_COUNT, &count_values[0])?;

        let xs = raw.values(X_COORDINATE);
        let ys = raw.values(Y_COORDINATE);
        if expected > 0 {
            raw.required(X_COORDINATE)?;
            raw.required(Y_COORDINATE)?;
        }
        if xs.len() != expected || ys.len() != expected {
            return Err(DxfError::VertexCountMismatch {
                line: raw.line,
                kind: raw.kind.clone(),
                expected,
                x: xs.len(),
                y: ys.len(),
            });
        }

        let vertices = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| {
                Ok(Position::new(
                    raw.parse_coordinate(X_COORDINATE, x)?,
                    raw.parse_coordinate(Y_COORDINATE, y)?,
                ))
            })
            .collect::<Result<Vec<_>, DxfError>>()?;

        let flags: i64 = match raw.values(FLAGS).first() {
            Some(value) => raw.parse_value(FLAGS, value)?,
            None => 0,
        };

        Ok(Entity::LwPolyline(LwPolyline {
            vertices,
            closed: flags & CLOSED_FLAG != 0,
        }))
    }
}

fn split_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = content;
    while let Some(pos) = rest.find(['\r', '\n']) {
        lines.push(&rest[..pos]);
        let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + skip..];
    }
    if !rest.is_empty() {
        lines.push(rest);
    }

    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines
}

pub fn parse_raw(content: &str) -> Result<Vec<RawEntity>, DxfError> {
    let lines = split_lines(content);
    let mut entities = Vec::new();
    let mut current: Option<RawEntity> = None;

    for (index, pair) in lines.chunks(2).enumerate() {
        let line = index * 2 + 1;
        let [code, value] = pair else {
            return Err(DxfError::DanglingGroupCode { line });
        };

        let code: i32 = code
            .trim()
            .parse()
            .map_err(|_| DxfError::InvalidGroupCode {
                line,
                code: code.to_string(),
            })?;
        let value = value.trim();

        if code == ENTITY_START {
            if let Some(entity) = current.take() {
                entities.push(entity);
            }
            current = Some(RawEntity {
                kind: value.to_string(),
                line,
                groups: BTreeMap::new(),
            });
        } else {
            current
                .get_or_insert_with(|| RawEntity {
                    line,
                    ..Default::default()
                })
                .groups
                .entry(code)
                .or_default()
                .push(value.to_string());
        }
    }

    entities.extend(current);
    Ok(entities)
}

pub fn parse(content: &str) -> Result<Vec<Entity>, DxfError> {
    parse_raw(content)?
        .into_iter()
        .map(Entity::try_from)
        .collect()
}

/// Polyline vertex lists, one path per non-empty polyline. Closed polylines
/// repeat their first vertex at the end.
pub fn extract_paths(entities: &[Entity]) -> Vec<PathSegment> {
    entities
        .iter()
        .filter_map(|entity| match entity {
            Entity::LwPolyline(polyline) if !polyline.vertices.is_empty() => {
                let mut points = polyline.vertices.clone();
                if polyline.closed && points.first() != points.last() {
                    points.push(points[0]);
                }
                Some(PathSegment::new(points))
            }
            _ => None,
        })
        .collect()
}

pub fn load_paths(content: &str) -> Result<Vec<PathSegment>, DxfError> {
    Ok(extract_paths(&parse(content)?))
}
