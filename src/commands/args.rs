//! Command arguments
//!
//! A command line is split into typed tokens. Positions and sizes accept
//! either absolute pixels or a fraction in (0, 1] of the workspace.

use tracing::warn;
use x11rb::protocol::xproto::Window;

use super::CommandError;
use crate::shared::Geometry;
use crate::wm::state::TabComp;

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Arg {
    fn from_bare(token: &str) -> Self {
        if let Ok(value) = token.parse::<i64>() {
            return Self::Int(value);
        }
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Self::Float(value),
            _ => Self::Str(token.to_string()),
        }
    }

    /// String form of any argument
    pub fn text(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Str(value) => value.clone(),
        }
    }
}

/// Split on whitespace; double quotes group words and always yield `Arg::Str`
pub fn tokenize(line: &str) -> Result<Vec<Arg>, CommandError> {
    let mut args = Vec::new();
    let mut chars = line.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut quoted = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped) => quoted.push(escaped),
                        None => return Err(CommandError::Malformed(line.to_string())),
                    },
                    Some(other) => quoted.push(other),
                    None => return Err(CommandError::Malformed(line.to_string())),
                }
            }
            args.push(Arg::Str(quoted));
        } else {
            let mut bare = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                bare.push(c);
                chars.next();
            }
            args.push(Arg::from_bare(&bare));
        }
    }
    Ok(args)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn span(self, workspace: Geometry) -> (i32, u32) {
        match self {
            Self::Horizontal => (workspace.x, workspace.width),
            Self::Vertical => (workspace.y, workspace.height),
        }
    }
}

fn fraction(value: f64) -> Option<f64> {
    if value > 0.0 && value <= 1.0 {
        Some(value)
    } else {
        warn!("Fractional geometry {} is outside (0, 1]", value);
        None
    }
}

/// Absolute position, or a fraction of the workspace offset by its origin
pub fn parse_pos(arg: &Arg, axis: Axis, workspace: Geometry) -> Option<i32> {
    match arg {
        Arg::Int(value) => match i16::try_from(*value) {
            Ok(value) => Some(value as i32),
            Err(_) => {
                warn!("Position {} is out of range", value);
                None
            }
        },
        Arg::Float(value) => {
            let (origin, size) = axis.span(workspace);
            fraction(*value).map(|f| origin + (f * size as f64) as i32)
        }
        Arg::Str(value) => {
            warn!("Expected a position, got '{}'", value);
            None
        }
    }
}

/// Absolute size, or a fraction of the workspace size
pub fn parse_dim(arg: &Arg, axis: Axis, workspace: Geometry) -> Option<u32> {
    match arg {
        Arg::Int(value) => match u16::try_from(*value) {
            Ok(value) => Some(value as u32),
            Err(_) => {
                warn!("Size {} is out of range", value);
                None
            }
        },
        Arg::Float(value) => {
            let (_, size) = axis.span(workspace);
            fraction(*value).map(|f| (f * size as f64) as u32)
        }
        Arg::Str(value) => {
            warn!("Expected a size, got '{}'", value);
            None
        }
    }
}

/// "yes"/"y" in any case is true; everything else is false
pub fn string_bool(value: &str) -> bool {
    match value.to_lowercase().as_str() {
        "yes" | "y" => true,
        "no" | "n" => false,
        other => {
            warn!("'{}' is not a boolean, treating it as 'no'", other);
            false
        }
    }
}

/// Exactly "Prefix" or "Any"; anything else falls back to prefix matching
pub fn string_tab_comp(value: &str) -> TabComp {
    match value {
        "Prefix" => TabComp::Prefix,
        "Any" => TabComp::Any,
        other => {
            warn!("Unknown completion mode '{}', using Prefix", other);
            TabComp::Prefix
        }
    }
}

/// Which client a command applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSelector {
    /// A client window id; 0 means the focused client
    Id(Window),
    Active,
    Mouse,
    Void,
}

impl ClientSelector {
    pub fn parse(arg: &Arg) -> Result<Self, CommandError> {
        match arg {
            Arg::Int(0) => Ok(Self::Active),
            Arg::Int(id) => Window::try_from(*id)
                .map(Self::Id)
                .map_err(|_| CommandError::Malformed(id.to_string())),
            Arg::Str(value) => match value.as_str() {
                ":active:" => Ok(Self::Active),
                ":mouse:" => Ok(Self::Mouse),
                ":void:" => Ok(Self::Void),
                other => Err(CommandError::UnknownSelector(other.to_string())),
            },
            Arg::Float(value) => Err(CommandError::UnknownSelector(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKSPACE: Geometry = Geometry {
        x: 0,
        y: 0,
        width: 1000,
        height: 800,
    };

    #[test]
    fn test_tokenize() {
        let args = tokenize(r#"Move :active: 0.5 "12" "two words""#).unwrap();
        assert_eq!(
            args,
            vec![
                Arg::Str("Move".into()),
                Arg::Str(":active:".into()),
                Arg::Float(0.5),
                Arg::Str("12".into()),
                Arg::Str("two words".into()),
            ]
        );
        assert_eq!(tokenize("  7  -3 ").unwrap(), vec![Arg::Int(7), Arg::Int(-3)]);
        assert!(tokenize(r#"Focus "open"#).is_err());
    }

    #[test]
    fn test_fractional_position() {
        assert_eq!(parse_pos(&Arg::Float(0.5), Axis::Horizontal, WORKSPACE), Some(500));
        assert_eq!(parse_pos(&Arg::Float(1.5), Axis::Horizontal, WORKSPACE), None);
        assert_eq!(parse_pos(&Arg::Float(0.0), Axis::Horizontal, WORKSPACE), None);
        assert_eq!(parse_pos(&Arg::Float(1.0), Axis::Vertical, WORKSPACE), Some(800));

        let offset = Geometry::new(100, 50, 1000, 800);
        assert_eq!(parse_pos(&Arg::Float(0.5), Axis::Horizontal, offset), Some(600));
        assert_eq!(parse_pos(&Arg::Float(0.25), Axis::Vertical, offset), Some(250));
    }

    #[test]
    fn test_integer_position_is_absolute() {
        assert_eq!(parse_pos(&Arg::Int(-20), Axis::Horizontal, WORKSPACE), Some(-20));
        assert_eq!(parse_pos(&Arg::Str("left".into()), Axis::Horizontal, WORKSPACE), None);
        assert_eq!(parse_pos(&Arg::Int(-32768), Axis::Vertical, WORKSPACE), Some(-32768));
        assert_eq!(parse_pos(&Arg::Int(100000), Axis::Horizontal, WORKSPACE), None);
    }

    #[test]
    fn test_dimensions() {
        let offset = Geometry::new(100, 50, 1000, 800);
        assert_eq!(parse_dim(&Arg::Float(0.5), Axis::Horizontal, offset), Some(500));
        assert_eq!(parse_dim(&Arg::Int(320), Axis::Vertical, offset), Some(320));
        assert_eq!(parse_dim(&Arg::Int(-1), Axis::Vertical, offset), None);
        assert_eq!(parse_dim(&Arg::Float(2.0), Axis::Vertical, offset), None);
        assert_eq!(parse_dim(&Arg::Int(65535), Axis::Vertical, offset), Some(65535));
        assert_eq!(parse_dim(&Arg::Int(4294967295), Axis::Horizontal, offset), None);
    }

    #[test]
    fn test_string_bool() {
        assert!(string_bool("yes"));
        assert!(string_bool("Y"));
        assert!(!string_bool("no"));
        assert!(!string_bool("maybe"));
    }

    #[test]
    fn test_tab_comp_falls_back_to_prefix() {
        assert_eq!(string_tab_comp("Any"), TabComp::Any);
        assert_eq!(string_tab_comp("Prefix"), TabComp::Prefix);
        assert_eq!(string_tab_comp("fuzzy"), TabComp::Prefix);
        assert_eq!(string_tab_comp("any"), TabComp::Prefix);
    }

    #[test]
    fn test_selectors() {
        assert_eq!(ClientSelector::parse(&Arg::Int(0)), Ok(ClientSelector::Active));
        assert_eq!(ClientSelector::parse(&Arg::Int(66)), Ok(ClientSelector::Id(66)));
        assert_eq!(
            ClientSelector::parse(&Arg::Str(":mouse:".into())),
            Ok(ClientSelector::Mouse)
        );
        assert_eq!(
            ClientSelector::parse(&Arg::Str(":void:".into())),
            Ok(ClientSelector::Void)
        );
        assert_eq!(
            ClientSelector::parse(&Arg::Str(":nope:".into())),
            Err(CommandError::UnknownSelector(":nope:".into()))
        );
        assert!(ClientSelector::parse(&Arg::Int(-4)).is_err());
    }
}
