//! Command layer
//!
//! Text commands arriving over IPC are parsed into a `Command` and executed
//! against the manager state. A command names its client with a selector;
//! the result is the id of the client it acted on, or `:void:`.

pub mod args;

use anyhow::Result;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use x11rb::protocol::xproto::Window;

use crate::wm::frame::FrameStyle;
use crate::wm::protocol::Protocol;
use crate::wm::state::{TabComp, WmState};
use args::{Arg, Axis, ClientSelector, parse_dim, parse_pos, string_bool, string_tab_comp};

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("{command} takes {expected} arguments, got {got}")]
    Arity {
        command: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("malformed argument '{0}'")]
    Malformed(String),
    #[error("unsupported client selector '{0}'")]
    UnknownSelector(String),
}

/// Result handed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandValue {
    Client(Window),
    Void,
}

impl fmt::Display for CommandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(window) => write!(f, "{}", window),
            Self::Void => write!(f, ":void:"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move {
        client: ClientSelector,
        x: Arg,
        y: Arg,
    },
    Resize {
        client: ClientSelector,
        width: Arg,
        height: Arg,
    },
    MoveResize {
        client: ClientSelector,
        x: Arg,
        y: Arg,
        width: Arg,
        height: Arg,
    },
    Frame {
        client: ClientSelector,
        style: FrameStyle,
    },
    Maximize(ClientSelector),
    Unmaximize(ClientSelector),
    ToggleMaximize(ClientSelector),
    Focus {
        client: ClientSelector,
        raise: bool,
    },
    Close(ClientSelector),
    FindClient {
        title: String,
        mode: TabComp,
    },
}

fn arity(command: &'static str, args: &[Arg], expected: usize) -> Result<(), CommandError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CommandError::Arity {
            command,
            expected,
            got: args.len(),
        })
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = args::tokenize(line)?.into_iter();
        let name = match tokens.next() {
            Some(Arg::Str(name)) => name,
            Some(other) => return Err(CommandError::Unknown(other.text())),
            None => return Err(CommandError::Empty),
        };
        let args: Vec<Arg> = tokens.collect();

        let command = match name.as_str() {
            "Move" => {
                arity("Move", &args, 3)?;
                Self::Move {
                    client: ClientSelector::parse(&args[0])?,
                    x: args[1].clone(),
                    y: args[2].clone(),
                }
            }
            "Resize" => {
                arity("Resize", &args, 3)?;
                Self::Resize {
                    client: ClientSelector::parse(&args[0])?,
                    width: args[1].clone(),
                    height: args[2].clone(),
                }
            }
            "MoveResize" => {
                arity("MoveResize", &args, 5)?;
                Self::MoveResize {
                    client: ClientSelector::parse(&args[0])?,
                    x: args[1].clone(),
                    y: args[2].clone(),
                    width: args[3].clone(),
                    height: args[4].clone(),
                }
            }
            "FrameFull" | "FrameSlim" => {
                arity(if name == "FrameFull" { "FrameFull" } else { "FrameSlim" }, &args, 1)?;
                Self::Frame {
                    client: ClientSelector::parse(&args[0])?,
                    style: if name == "FrameFull" {
                        FrameStyle::Full
                    } else {
                        FrameStyle::Slim
                    },
                }
            }
            "Maximize" => {
                arity("Maximize", &args, 1)?;
                Self::Maximize(ClientSelector::parse(&args[0])?)
            }
            "Unmaximize" => {
                arity("Unmaximize", &args, 1)?;
                Self::Unmaximize(ClientSelector::parse(&args[0])?)
            }
            "ToggleMaximize" => {
                arity("ToggleMaximize", &args, 1)?;
                Self::ToggleMaximize(ClientSelector::parse(&args[0])?)
            }
            "Focus" => {
                arity("Focus", &args, 2)?;
                Self::Focus {
                    client: ClientSelector::parse(&args[0])?,
                    raise: string_bool(&args[1].text()),
                }
            }
            "Close" => {
                arity("Close", &args, 1)?;
                Self::Close(ClientSelector::parse(&args[0])?)
            }
            "FindClient" => {
                arity("FindClient", &args, 2)?;
                Self::FindClient {
                    title: args[0].text(),
                    mode: string_tab_comp(&args[1].text()),
                }
            }
            _ => return Err(CommandError::Unknown(name)),
        };
        Ok(command)
    }

    pub fn execute(self, state: &mut WmState, conn: &dyn Protocol) -> CommandValue {
        debug!("Executing {:?}", self);
        let workspace = state.workspace.geometry();

        match self {
            Self::Move { client, x, y } => with_client(state, client, |state, window| {
                let Some(window) = window else { return Ok(()) };
                match (
                    parse_pos(&x, Axis::Horizontal, workspace),
                    parse_pos(&y, Axis::Vertical, workspace),
                ) {
                    (Some(x), Some(y)) => state.move_client(conn, window, x, y),
                    _ => Ok(()),
                }
            }),
            Self::Resize {
                client,
                width,
                height,
            } => with_client(state, client, |state, window| {
                let Some(window) = window else { return Ok(()) };
                match (
                    parse_dim(&width, Axis::Horizontal, workspace),
                    parse_dim(&height, Axis::Vertical, workspace),
                ) {
                    (Some(width), Some(height)) => state.resize_client(conn, window, width, height),
                    _ => Ok(()),
                }
            }),
            Self::MoveResize {
                client,
                x,
                y,
                width,
                height,
            } => with_client(state, client, |state, window| {
                let Some(window) = window else { return Ok(()) };
                match (
                    parse_pos(&x, Axis::Horizontal, workspace),
                    parse_pos(&y, Axis::Vertical, workspace),
                    parse_dim(&width, Axis::Horizontal, workspace),
                    parse_dim(&height, Axis::Vertical, workspace),
                ) {
                    (Some(x), Some(y), Some(width), Some(height)) => {
                        state.move_client(conn, window, x, y)?;
                        state.resize_client(conn, window, width, height)
                    }
                    _ => Ok(()),
                }
            }),
            Self::Frame { client, style } => with_client(state, client, |state, window| {
                match window {
                    Some(window) => state.switch_frame(conn, window, style),
                    None => Ok(()),
                }
            }),
            Self::Maximize(client) => with_client(state, client, |state, window| match window {
                Some(window) => state.maximize(conn, window),
                None => Ok(()),
            }),
            Self::Unmaximize(client) => with_client(state, client, |state, window| match window {
                Some(window) => state.unmaximize(conn, window),
                None => Ok(()),
            }),
            Self::ToggleMaximize(client) => {
                with_client(state, client, |state, window| match window {
                    Some(window) => state.toggle_maximize(conn, window),
                    None => Ok(()),
                })
            }
            Self::Focus { client, raise } => with_client(state, client, |state, window| {
                match window {
                    Some(window) => state.focus(conn, window, raise),
                    None => Ok(()),
                }
            }),
            Self::Close(client) => with_client(state, client, |state, window| match window {
                Some(window) => state.close(conn, window),
                None => Ok(()),
            }),
            Self::FindClient { title, mode } => match state.find_client(&title, mode) {
                Some(window) => CommandValue::Client(window),
                None => CommandValue::Void,
            },
        }
    }
}

/// Resolve `selector` and run `f` with the client.
///
/// `:mouse:` with nothing under the pointer still calls `f` with `None`;
/// any other unresolved selector skips it. Failures inside `f` are logged.
pub fn with_client<F>(state: &mut WmState, selector: ClientSelector, f: F) -> CommandValue
where
    F: FnOnce(&mut WmState, Option<Window>) -> Result<()>,
{
    let resolved = match selector {
        ClientSelector::Active => state.focus.focused(),
        ClientSelector::Id(id) => state.is_managed(id).then_some(id),
        ClientSelector::Mouse => state.mouse_client(),
        ClientSelector::Void => None,
    };

    match resolved {
        Some(window) => {
            if let Err(e) = f(state, Some(window)) {
                warn!("Command on 0x{:x} failed: {}", window, e);
            }
            CommandValue::Client(window)
        }
        None => {
            if selector == ClientSelector::Mouse {
                if let Err(e) = f(state, None) {
                    warn!("Command on :mouse: failed: {}", e);
                }
            }
            debug!("Selector {:?} matched no client", selector);
            CommandValue::Void
        }
    }
}

/// Parse and run one command line, producing the reply line
pub fn run_line(line: &str, state: &mut WmState, conn: &dyn Protocol) -> String {
    match Command::parse(line) {
        Ok(command) => command.execute(state, conn).to_string(),
        Err(e) => {
            warn!("Rejected command '{}': {}", line.trim(), e);
            format!("error: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::frame::test_support::{CLIENT, themes};
    use crate::wm::hints::{SizeHints, SizeHintsFlags};
    use crate::wm::protocol::testing::{Recorder, Request};
    use crate::wm::state::Press;

    fn managed(conn: &Recorder, hints: SizeHints) -> WmState {
        let mut state = WmState::new(themes(), false, Geometry::new(0, 0, 1000, 800));
        state
            .manage(conn, CLIENT, "xterm".into(), hints, Geometry::new(100, 100, 400, 300))
            .unwrap();
        state
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert_eq!(
            Command::parse("Explode 0"),
            Err(CommandError::Unknown("Explode".into()))
        );
        assert_eq!(
            Command::parse("Move 0 1"),
            Err(CommandError::Arity {
                command: "Move",
                expected: 3,
                got: 2
            })
        );
        assert_eq!(
            Command::parse("Close :focused:"),
            Err(CommandError::UnknownSelector(":focused:".into()))
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("Focus :mouse: Yes").unwrap(),
            Command::Focus {
                client: ClientSelector::Mouse,
                raise: true
            }
        );
        assert_eq!(
            Command::parse("FrameSlim 0").unwrap(),
            Command::Frame {
                client: ClientSelector::Active,
                style: FrameStyle::Slim
            }
        );
        assert_eq!(
            Command::parse("FindClient \"my term\" Whatever").unwrap(),
            Command::FindClient {
                title: "my term".into(),
                mode: TabComp::Prefix
            }
        );
    }

    #[test]
    fn test_move_with_fractions() {
        let conn = Recorder::new();
        let mut state = managed(&conn, SizeHints::default());

        assert_eq!(run_line("Move :active: 0.5 10", &mut state, &conn), CLIENT.to_string());
        assert_eq!(state.clients[&CLIENT].frame.geometry().x, 500);
        assert_eq!(state.clients[&CLIENT].frame.geometry().y, 10);

        // out of range fractions are ignored, the client is still reported
        assert_eq!(run_line("Move 0 1.5 20", &mut state, &conn), CLIENT.to_string());
        assert_eq!(state.clients[&CLIENT].frame.geometry().x, 500);
    }

    #[test]
    fn test_out_of_range_integers_are_rejected() {
        let conn = Recorder::new();
        let mut state = managed(&conn, SizeHints::default());
        let before = state.clients[&CLIENT].frame.geometry();

        assert_eq!(
            run_line("Resize 0 4294967295 100", &mut state, &conn),
            CLIENT.to_string()
        );
        assert_eq!(run_line("Resize 0 70000 100", &mut state, &conn), CLIENT.to_string());
        assert_eq!(run_line("Move 0 100000 0", &mut state, &conn), CLIENT.to_string());
        assert_eq!(state.clients[&CLIENT].frame.geometry(), before);
    }

    #[test]
    fn test_fractional_size_clamps_to_min_hint() {
        let conn = Recorder::new();
        let hints = SizeHints {
            flags: SizeHintsFlags::P_MIN_SIZE,
            min_width: 300,
            min_height: 200,
            ..SizeHints::default()
        };
        let mut state = managed(&conn, hints);

        run_line(&format!("Resize {} 0.1 0.1", CLIENT), &mut state, &conn);
        let client = state.clients[&CLIENT].frame.client_geometry();
        assert_eq!((client.width, client.height), (300, 200));

        run_line(&format!("Resize {} 0.5 0.5", CLIENT), &mut state, &conn);
        let client = state.clients[&CLIENT].frame.client_geometry();
        assert_eq!((client.width, client.height), (500, 400));
    }

    #[test]
    fn test_unresolved_selectors_are_void() {
        let conn = Recorder::new();
        let mut state = managed(&conn, SizeHints::default());

        assert_eq!(run_line("Close 12345", &mut state, &conn), ":void:");
        assert_eq!(run_line("Close :void:", &mut state, &conn), ":void:");
        assert_eq!(run_line("Maximize :mouse:", &mut state, &conn), ":void:");
        assert!(!conn.requests().contains(&Request::Close(CLIENT)));
    }

    #[test]
    fn test_mouse_selector_calls_back_with_none() {
        let conn = Recorder::new();
        let mut state = managed(&conn, SizeHints::default());

        let mut seen = None;
        let value = with_client(&mut state, ClientSelector::Mouse, |_, window| {
            seen = Some(window);
            Ok(())
        });
        assert_eq!(value, CommandValue::Void);
        assert_eq!(seen, Some(None));

        state
            .button_press(
                &conn,
                Press {
                    window: CLIENT,
                    button: 1,
                    modifier: false,
                    root_x: 200,
                    root_y: 200,
                },
            )
            .unwrap();
        assert_eq!(run_line("Close :mouse:", &mut state, &conn), CLIENT.to_string());
        assert!(conn.requests().contains(&Request::Close(CLIENT)));
    }

    #[test]
    fn test_frame_and_maximize_commands() {
        let conn = Recorder::new();
        let mut state = managed(&conn, SizeHints::default());

        run_line("FrameSlim :active:", &mut state, &conn);
        assert_eq!(state.clients[&CLIENT].frame.style(), FrameStyle::Slim);
        run_line("ToggleMaximize 0", &mut state, &conn);
        assert!(state.clients[&CLIENT].is_maximized());
        run_line("Unmaximize 0", &mut state, &conn);
        assert_eq!(
            state.clients[&CLIENT].frame.client_geometry(),
            Geometry::new(100, 100, 400, 300)
        );
    }

    #[test]
    fn test_find_client_and_errors_as_replies() {
        let conn = Recorder::new();
        let mut state = managed(&conn, SizeHints::default());

        assert_eq!(run_line("FindClient xt Prefix", &mut state, &conn), CLIENT.to_string());
        assert_eq!(run_line("FindClient zz Any", &mut state, &conn), ":void:");
        assert_eq!(
            run_line("Frobnicate", &mut state, &conn),
            "error: unknown command 'Frobnicate'"
        );
    }
}
