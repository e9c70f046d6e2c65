//! Line protocol spoken by the rotary encoder box.
//!
//! Lines are ASCII and end in CR LF.
//!
//! Controller to host:
//!
//! - `READY` controller initialized and ready
//! - `RVAL.n=i` encoder `n` turned by `i` detents (signed)
//! - `RBTN.n=b` encoder `n` button changed, `b` is 0 or 1
//! - `?> line` the controller rejected a host line
//!
//! Host to controller:
//!
//! - `RLED.n=c` set encoder LEDs, `c` one of `0`, `G`, `R`, `Y`
//! - `RST` reset the controller

use std::fmt;
use thiserror::Error;

/// Highest encoder index the LED command can address (single digit).
pub const MAX_ENCODER: u8 = 9;

/// Protocol error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Unknown message: {0:?}")]
    UnknownMessage(String),

    #[error("Malformed {kind} message: {line:?}")]
    Malformed { kind: &'static str, line: String },
}

/// A line received from the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// Controller (re)started.
    Ready,

    /// Encoder turned by a number of detents.
    Rotated { encoder: u8, delta: i16 },

    /// Encoder button pressed or released.
    Button { encoder: u8, pressed: bool },

    /// Controller echoed back a line it did not understand.
    Rejected(String),
}

impl DeviceMessage {
    /// Parse one line. Returns `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        if line == "READY" {
            return Ok(Some(DeviceMessage::Ready));
        }
        if let Some(rest) = line.strip_prefix("?> ") {
            return Ok(Some(DeviceMessage::Rejected(rest.to_string())));
        }
        if let Some(rest) = line.strip_prefix("RVAL.") {
            let (encoder, delta) = indexed_value(rest).ok_or_else(|| malformed("RVAL", line))?;
            let delta = delta.parse().map_err(|_| malformed("RVAL", line))?;
            return Ok(Some(DeviceMessage::Rotated { encoder, delta }));
        }
        if let Some(rest) = line.strip_prefix("RBTN.") {
            let (encoder, state) = indexed_value(rest).ok_or_else(|| malformed("RBTN", line))?;
            let pressed = match state {
                "0" => false,
                "1" => true,
                _ => return Err(malformed("RBTN", line)),
            };
            return Ok(Some(DeviceMessage::Button { encoder, pressed }));
        }

        Err(ProtocolError::UnknownMessage(line.to_string()))
    }
}

fn malformed(kind: &'static str, line: &str) -> ProtocolError {
    ProtocolError::Malformed {
        kind,
        line: line.to_string(),
    }
}

/// Split `n=value` into the encoder index and the raw value.
fn indexed_value(rest: &str) -> Option<(u8, &str)> {
    let (index, value) = rest.split_once('=')?;
    Some((index.parse().ok()?, value))
}

/// LED colour of an encoder ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Off,
    Green,
    Red,
    Yellow,
}

impl LedColor {
    fn code(self) -> char {
        match self {
            LedColor::Off => '0',
            LedColor::Green => 'G',
            LedColor::Red => 'R',
            LedColor::Yellow => 'Y',
        }
    }
}

/// A line sent to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Set the LEDs of one encoder.
    SetLeds { encoder: u8, color: LedColor },

    /// Reset the controller.
    Reset,
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::SetLeds { encoder, color } => {
                write!(f, "RLED.{}={}", encoder, color.code())
            }
            HostCommand::Reset => f.write_str("RST"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_controller_lines() {
        assert_eq!(DeviceMessage::parse("READY\r\n").unwrap(), Some(DeviceMessage::Ready));
        assert_eq!(
            DeviceMessage::parse("RVAL.1=-3").unwrap(),
            Some(DeviceMessage::Rotated { encoder: 1, delta: -3 })
        );
        assert_eq!(
            DeviceMessage::parse("RVAL.0=12\r").unwrap(),
            Some(DeviceMessage::Rotated { encoder: 0, delta: 12 })
        );
        assert_eq!(
            DeviceMessage::parse("RBTN.0=1").unwrap(),
            Some(DeviceMessage::Button { encoder: 0, pressed: true })
        );
        assert_eq!(
            DeviceMessage::parse("?> RLED.7=Q").unwrap(),
            Some(DeviceMessage::Rejected("RLED.7=Q".to_string()))
        );
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(DeviceMessage::parse("\r\n").unwrap(), None);
        assert_eq!(DeviceMessage::parse("").unwrap(), None);
    }

    #[test]
    fn test_malformed_lines() {
        for line in ["RVAL.x=1", "RVAL.0=", "RVAL.0", "RBTN.0=2", "RBTN.=1"] {
            assert!(
                matches!(DeviceMessage::parse(line), Err(ProtocolError::Malformed { .. })),
                "{line}"
            );
        }
        assert!(matches!(
            DeviceMessage::parse("HELLO"),
            Err(ProtocolError::UnknownMessage(_))
        ));
    }

    #[test]
    fn test_host_commands() {
        let set = HostCommand::SetLeds {
            encoder: 1,
            color: LedColor::Red,
        };
        assert_eq!(set.to_string(), "RLED.1=R");
        assert_eq!(
            HostCommand::SetLeds { encoder: 0, color: LedColor::Off }.to_string(),
            "RLED.0=0"
        );
        assert_eq!(HostCommand::Reset.to_string(), "RST");
    }
}
