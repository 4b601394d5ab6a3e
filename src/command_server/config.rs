use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandServerConfig {
    pub bind_address: String,
    pub max_connections: usize,
    pub max_line_length: usize,
}

impl Default for CommandServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:10002".to_string(),
            max_connections: 4,
            max_line_length: 8192,
        }
    }
}
