pub mod command;
pub mod error;

use command::{
    Command, CLEAR, GOTO_PREFIX, GOTO_SEPARATOR, PEN_DOWN, PEN_UP, RESTART_BRIDGE,
    RESTART_PERIPHERAL,
};
use error::ProtocolError;

/// Unknown verbs decode to `Ok(None)`; a known verb with a malformed payload
/// is an error.
pub fn parse_command(line: &str) -> Result<Option<Command>, ProtocolError> {
    let line = line.trim();

    let command = match line {
        PEN_UP => Command::PenUp,
        PEN_DOWN => Command::PenDown,
        CLEAR => Command::Clear,
        RESTART_PERIPHERAL => Command::RestartPeripheral,
        RESTART_BRIDGE => Command::RestartBridge,
        _ => match line.strip_prefix(GOTO_PREFIX) {
            Some(payload) => parse_goto(payload)?,
            None => return Ok(None),
        },
    };

    Ok(Some(command))
}

fn parse_goto(payload: &str) -> Result<Command, ProtocolError> {
    let mut fields = payload.split(GOTO_SEPARATOR);
    let x = fields
        .next()
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ProtocolError::MissingField("x".to_string()))?;
    let y = fields
        .next()
        .ok_or_else(|| ProtocolError::MissingField("y".to_string()))?;
    if let Some(extra) = fields.next() {
        return Err(ProtocolError::UnexpectedField(extra.to_string()));
    }

    let x: f64 = x.trim().parse()?;
    let y: f64 = y.trim().parse()?;
    if !x.is_finite() || !y.is_finite() {
        return Err(ProtocolError::InvalidNumber(payload.to_string()));
    }

    Ok(Command::move_to(x, y))
}

pub fn serialize_command(command: &Command) -> String {
    command.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_goto_command() {
        let cmd = parse_command("GOTO:1.5|2.25").unwrap();
        assert_eq!(cmd, Some(Command::move_to(1.5, 2.25)));
    }

    #[test]
    fn test_parse_pen_commands() {
        assert_eq!(parse_command("UP").unwrap(), Some(Command::PenUp));
        assert_eq!(parse_command("DOWN").unwrap(), Some(Command::PenDown));
        assert_eq!(parse_command("CLEAR\r").unwrap(), Some(Command::Clear));
    }

    #[test]
    fn test_parse_restart_commands() {
        assert_eq!(
            parse_command("RPI:RESTART").unwrap(),
            Some(Command::RestartPeripheral)
        );
        assert_eq!(
            parse_command("RPI:RESTART_BRIDGE").unwrap(),
            Some(Command::RestartBridge)
        );
    }

    #[test]
    fn test_unrecognized_line_is_ignored() {
        assert_eq!(parse_command("HELLO").unwrap(), None);
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("UPWARDS").unwrap(), None);
    }

    #[test]
    fn test_malformed_goto_is_an_error() {
        assert!(matches!(
            parse_command("GOTO:1.0"),
            Err(ProtocolError::MissingField(_))
        ));
        assert!(matches!(
            parse_command("GOTO:a|2"),
            Err(ProtocolError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_command("GOTO:1|2|3"),
            Err(ProtocolError::UnexpectedField(_))
        ));
        assert!(parse_command("GOTO:NaN|1").is_err());
    }

    #[test]
    fn test_serialize_matches_wire_format() {
        assert_eq!(serialize_command(&Command::move_to(1.5, 2.25)), "GOTO:1.5|2.25");
        assert_eq!(serialize_command(&Command::RestartBridge), "RPI:RESTART_BRIDGE");
        let line = serialize_command(&Command::move_to(0.1, 4.0));
        assert_eq!(parse_command(&line).unwrap(), Some(Command::move_to(0.1, 4.0)));
    }
}
