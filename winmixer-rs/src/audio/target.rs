//! Logical targets a caller can control.

use super::device::AudioError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// What a mixer operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Target {
    /// The whole bound device.
    Device,

    /// The system sounds session (not owned by any process).
    System,

    /// Sessions owned by a process with this name, matched ignoring case.
    Process(String),
}

impl Target {
    /// Reserved identifier for [`Target::Device`].
    pub const DEVICE: &'static str = "DEVICE";

    /// Reserved identifier for [`Target::System`].
    pub const SYSTEM: &'static str = "SYSTEM";

    /// Target a process by name.
    pub fn process(name: impl Into<String>) -> Result<Self, AudioError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AudioError::InvalidTarget(name));
        }
        Ok(Target::Process(name))
    }

    /// True if `process_name` is the process this target names.
    pub fn matches_process(&self, process_name: &str) -> bool {
        match self {
            Target::Process(name) => names_match(name, process_name),
            _ => false,
        }
    }
}

/// Ordinal case-insensitive name comparison, char by char, no locale rules.
pub fn names_match(a: &str, b: &str) -> bool {
    a.chars().map(fold_case).eq(b.chars().map(fold_case))
}

/// Simple uppercase mapping. Chars that only uppercase to several chars
/// (`ß` -> `SS`) are left alone.
fn fold_case(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

impl FromStr for Target {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::DEVICE => Ok(Target::Device),
            Self::SYSTEM => Ok(Target::System),
            name => Target::process(name),
        }
    }
}

impl TryFrom<String> for Target {
    type Error = AudioError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            Self::DEVICE => Ok(Target::Device),
            Self::SYSTEM => Ok(Target::System),
            _ => Target::process(s),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Device => f.write_str(Self::DEVICE),
            Target::System => f.write_str(Self::SYSTEM),
            Target::Process(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words() {
        assert_eq!("DEVICE".parse::<Target>().unwrap(), Target::Device);
        assert_eq!("SYSTEM".parse::<Target>().unwrap(), Target::System);
        // Reserved words are exact; anything else is a process name
        assert_eq!(
            "system".parse::<Target>().unwrap(),
            Target::Process("system".to_string())
        );
    }

    #[test]
    fn test_empty_target_is_invalid() {
        assert!(matches!(
            "".parse::<Target>(),
            Err(AudioError::InvalidTarget(_))
        ));
        assert!(matches!(
            Target::try_from("  ".to_string()),
            Err(AudioError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_display_round_trip() {
        for id in ["DEVICE", "SYSTEM", "Spotify"] {
            assert_eq!(id.parse::<Target>().unwrap().to_string(), id);
        }
    }

    #[test]
    fn test_process_match_ignores_case() {
        let target = Target::process("spotify").unwrap();
        assert!(target.matches_process("Spotify"));
        assert!(target.matches_process("SPOTIFY"));
        assert!(!target.matches_process("Spotify2"));
        assert!(!Target::System.matches_process("spotify"));
    }

    #[test]
    fn test_non_ascii_names() {
        assert!(names_match("ÉCOUTE", "écoute"));
        assert!(!names_match("straße", "STRASSE"));
        assert!(names_match("straße", "STRAßE"));
        // Kelvin sign is already uppercase and does not fold to 'K'
        assert!(!names_match("\u{212A}odi", "kodi"));
        assert!(names_match("KODI", "kodi"));
    }
}
