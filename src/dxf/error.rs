#[derive(Debug, thiserror::Error)]
pub enum DxfError {
    #[error("Group code on line {line} has no value line")]
    DanglingGroupCode { line: usize },

    #[error("Invalid group code {code:?} on line {line}")]
    InvalidGroupCode { line: usize, code: String },

    #[error("{kind} entity at line {line} is missing group {code}")]
    MissingGroup {
        line: usize,
        kind: String,
        code: i32,
    },

    #[error("Invalid value {value:?} for group {code} in entity at line {line}")]
    InvalidValue {
        line: usize,
        code: i32,
        value: String,
    },

    #[error(
        "{kind} entity at line {line} declares {expected} vertices but has {x} x and {y} y values"
    )]
    VertexCountMismatch {
        line: usize,
        kind: String,
        expected: usize,
        x: usize,
        y: usize,
    },
}
