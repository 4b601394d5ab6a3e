use std::fmt;

use crate::geometry::Position;

pub const PEN_UP: &str = "UP";
pub const PEN_DOWN: &str = "DOWN";
pub const CLEAR: &str = "CLEAR";
pub const GOTO_PREFIX: &str = "GOTO:";
pub const GOTO_SEPARATOR: char = '|';
pub const RESTART_PERIPHERAL: &str = "RPI:RESTART";
pub const RESTART_BRIDGE: &str = "RPI:RESTART_BRIDGE";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    PenUp,
    PenDown,
    MoveTo(Position),
    Clear,
    RestartPeripheral,
    RestartBridge,
}

impl Command {
    pub fn move_to(x: f64, y: f64) -> Self {
        Command::MoveTo(Position::new(x, y))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PenUp => f.write_str(PEN_UP),
            Command::PenDown => f.write_str(PEN_DOWN),
            Command::MoveTo(target) => write!(
                f,
                "{}{}{}{}",
                GOTO_PREFIX, target.x, GOTO_SEPARATOR, target.y
            ),
            Command::Clear => f.write_str(CLEAR),
            Command::RestartPeripheral => f.write_str(RESTART_PERIPHERAL),
            Command::RestartBridge => f.write_str(RESTART_BRIDGE),
        }
    }
}
