#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    MissingField(String),
    InvalidNumber(String),
    UnexpectedField(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::MissingField(field) => write!(f, "Missing required field: {}", field),
            ProtocolError::InvalidNumber(value) => write!(f, "Invalid number: {}", value),
            ProtocolError::UnexpectedField(value) => write!(f, "Unexpected field: {}", value),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<std::num::ParseFloatError> for ProtocolError {
    fn from(err: std::num::ParseFloatError) -> Self {
        ProtocolError::InvalidNumber(err.to_string())
    }
}
