//! Window Manager Module
//!
//! Owns the X connection side of the manager: becomes the WM on the root
//! window, translates X events into `WmState` operations and runs IPC
//! commands against the same state.

pub mod client;
pub mod ewmh;
pub mod focus;
pub mod frame;
pub mod hints;
pub mod moveresize;
pub mod protocol;
pub mod state;
pub mod workspace;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::{CURRENT_TIME, NONE};

use crate::commands;
use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::frame::{ConfigureRequest, Teardown};
use crate::wm::hints::SizeHints;
use crate::wm::protocol::{ConfigureFlags, Protocol, X11Protocol};
use crate::wm::state::{Press, WmState};

/// Modifier for move/resize from anywhere in a window
pub fn parse_modifier(name: &str) -> ModMask {
    match name.to_lowercase().as_str() {
        "mod1" | "alt" => ModMask::M1,
        "mod4" | "super" => ModMask::M4,
        "control" | "ctrl" => ModMask::CONTROL,
        "shift" => ModMask::SHIFT,
        other => {
            warn!("Unknown mouse modifier '{}', using Mod1", other);
            ModMask::M1
        }
    }
}

pub struct WindowManager {
    conn: Arc<RustConnection>,
    protocol: X11Protocol,
    root: Window,
    /// Holds `_NET_SUPPORTING_WM_CHECK`; lives as long as the manager
    check_window: Window,
    modifier: ModMask,
    pub state: WmState,
}

impl WindowManager {
    pub fn new(conn: Arc<RustConnection>, screen_num: usize, config: &Config) -> Result<Self> {
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let workspace = Geometry::new(
            0,
            0,
            screen.width_in_pixels as u32,
            screen.height_in_pixels as u32,
        );
        info!("Initializing window manager on root 0x{:x} ({:?})", root, workspace);

        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(
                EventMask::SUBSTRUCTURE_REDIRECT
                    | EventMask::SUBSTRUCTURE_NOTIFY
                    | EventMask::PROPERTY_CHANGE,
            ),
        )?
        .check()
        .context("Failed to select events on root window - is another WM running?")?;

        let protocol = X11Protocol::new(conn.clone(), screen_num)?;

        let check_window = conn.generate_id()?;
        conn.create_window(
            screen.root_depth,
            check_window,
            root,
            -1000, // Off-screen
            -1000,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new().override_redirect(1),
        )?;
        protocol
            .atoms()
            .setup_supported(conn.as_ref(), root, check_window)?;
        conn.flush()?;

        let state = WmState::new(
            config.frames.clone(),
            config.behavior.raise_on_focus,
            workspace,
        );

        info!("Successfully became window manager");
        Ok(Self {
            modifier: parse_modifier(&config.behavior.mouse_modifier),
            conn,
            protocol,
            root,
            check_window,
            state,
        })
    }

    /// Adopt windows that were mapped before the manager started
    pub fn scan_existing(&mut self) -> Result<()> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        info!("Scanning {} existing windows", tree.children.len());

        for window in tree.children {
            if window == self.check_window {
                continue;
            }
            let Ok(attrs) = self.conn.get_window_attributes(window)?.reply() else {
                continue;
            };
            if attrs.override_redirect || attrs.map_state != MapState::VIEWABLE {
                continue;
            }
            if let Err(e) = self.manage(window) {
                warn!("Failed to adopt existing window 0x{:x}: {}", window, e);
            }
        }
        Ok(())
    }

    fn read_title(&self, window: Window) -> Result<String> {
        let atoms = self.protocol.atoms();
        let reply = self
            .conn
            .get_property(false, window, atoms.net_wm_name, atoms.utf8_string, 0, 1024)?
            .reply()?;
        if !reply.value.is_empty() {
            return Ok(String::from_utf8_lossy(&reply.value).into_owned());
        }

        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_NAME, AtomEnum::STRING, 0, 1024)?
            .reply()?;
        Ok(String::from_utf8_lossy(&reply.value).into_owned())
    }

    /// Frame and map a new top-level window
    fn manage(&mut self, window: Window) -> Result<()> {
        if self.state.is_managed(window) || self.state.client_by_parent(window).is_some() {
            return Ok(());
        }

        let attrs = match self.conn.get_window_attributes(window)?.reply() {
            Ok(attrs) => attrs,
            Err(e) => {
                debug!("Window 0x{:x} disappeared before it was managed: {}", window, e);
                return Ok(());
            }
        };
        if attrs.override_redirect {
            debug!("Window 0x{:x} is override-redirect, skipping", window);
            return Ok(());
        }
        let geom = match self.conn.get_geometry(window)?.reply() {
            Ok(geom) => geom,
            Err(e) => {
                debug!("Window 0x{:x} disappeared before it was managed: {}", window, e);
                return Ok(());
            }
        };

        let hints = SizeHints::read(&self.conn, window).unwrap_or_default();
        let title = self.read_title(window).unwrap_or_default();

        self.conn.change_save_set(SetMode::INSERT, window)?;
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY),
        )?;
        // Click-to-focus: presses are held until we decide whether to replay them
        self.conn.grab_button(
            false,
            window,
            EventMask::BUTTON_PRESS,
            GrabMode::SYNC,
            GrabMode::ASYNC,
            NONE,
            NONE,
            ButtonIndex::ANY,
            ModMask::ANY,
        )?;

        let geometry = Geometry::new(
            geom.x as i32,
            geom.y as i32,
            geom.width as u32,
            geom.height as u32,
        );
        self.state
            .manage(&self.protocol, window, title, hints, geometry)
    }

    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::MapRequest(e) => self.manage(e.window),
            Event::ConfigureRequest(e) => self.handle_configure_request(e),
            Event::UnmapNotify(e) => {
                // Only the notification reported through the frame parent is a withdrawal
                match self.state.client_by_parent(e.event) {
                    Some(client) if client == e.window => {
                        self.state
                            .unmanage(&self.protocol, client, Teardown::KeepClient)
                    }
                    _ => Ok(()),
                }
            }
            Event::DestroyNotify(e) => {
                self.state
                    .unmanage(&self.protocol, e.window, Teardown::ClientGone)
            }
            Event::ButtonPress(e) => self.handle_button_press(e),
            Event::MotionNotify(e) => {
                self.state
                    .motion(&self.protocol, e.root_x as i32, e.root_y as i32)
            }
            Event::ButtonRelease(_) => self.state.button_release(&self.protocol),
            Event::PropertyNotify(e) => self.handle_property(e),
            Event::ClientMessage(e) => self.handle_client_message(e),
            Event::ConfigureNotify(e) if e.window == self.root => {
                let workspace = Geometry::new(0, 0, e.width as u32, e.height as u32);
                info!("Root resized, workspace is now {:?}", workspace);
                self.state.workspace.set_geometry(workspace);
                Ok(())
            }
            Event::Error(e) => {
                debug!("X11 error: {:?}", e);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_configure_request(&mut self, e: ConfigureRequestEvent) -> Result<()> {
        if !self.state.is_managed(e.window) {
            self.conn
                .configure_window(e.window, &ConfigureWindowAux::from_configure_request(&e))?;
            return Ok(());
        }

        let flags = ConfigureFlags::from_value_mask(e.value_mask);
        let request = ConfigureRequest {
            flags,
            geometry: Geometry::new(e.x as i32, e.y as i32, e.width as u32, e.height as u32),
            sibling: flags.contains(ConfigureFlags::SIBLING).then_some(e.sibling),
            stack_mode: flags
                .contains(ConfigureFlags::STACK_MODE)
                .then_some(e.stack_mode),
            ignore_hints: false,
        };
        self.state
            .configure_request(&self.protocol, e.window, request)
    }

    fn handle_button_press(&mut self, e: ButtonPressEvent) -> Result<()> {
        let press = Press {
            window: e.event,
            button: e.detail,
            modifier: u16::from(e.state) & u16::from(self.modifier) != 0,
            root_x: e.root_x as i32,
            root_y: e.root_y as i32,
        };
        let result = self.state.button_press(&self.protocol, press);

        // Presses on a client arrive through our synchronous grab
        if self.state.is_managed(e.event) {
            let mode = match result {
                Ok(true) => Allow::ASYNC_POINTER,
                _ => Allow::REPLAY_POINTER,
            };
            self.conn.allow_events(mode, e.time)?;
        }
        result.map(|_| ())
    }

    fn handle_property(&mut self, e: PropertyNotifyEvent) -> Result<()> {
        if !self.state.is_managed(e.window) {
            return Ok(());
        }
        if e.atom == u32::from(AtomEnum::WM_NORMAL_HINTS) {
            let hints = SizeHints::read(&self.conn, e.window)?;
            self.state.set_hints(e.window, hints);
        } else if e.atom == u32::from(AtomEnum::WM_NAME)
            || e.atom == self.protocol.atoms().net_wm_name
        {
            let title = self.read_title(e.window)?;
            self.state.set_title(e.window, title);
        }
        Ok(())
    }

    fn handle_client_message(&mut self, e: ClientMessageEvent) -> Result<()> {
        let atoms = self.protocol.atoms();
        let data = e.data.as_data32();

        if e.type_ == atoms.net_wm_moveresize {
            self.state.moveresize_request(
                &self.protocol,
                e.window,
                data[2],
                data[0] as i32,
                data[1] as i32,
            )
        } else if e.type_ == atoms.net_active_window {
            self.state.focus(&self.protocol, e.window, true)
        } else if e.type_ == atoms.net_close_window {
            self.state.close(&self.protocol, e.window)
        } else {
            Ok(())
        }
    }

    /// Execute one IPC command line and format the reply
    pub fn run_command(&mut self, line: &str) -> String {
        commands::run_line(line, &mut self.state, &self.protocol)
    }

    /// Hand every client back to the root and drop the check window
    pub fn shutdown(&mut self) -> Result<()> {
        let result = self.state.shutdown(&self.protocol);
        self.conn.destroy_window(self.check_window)?;
        self.conn.set_input_focus(InputFocus::POINTER_ROOT, NONE, CURRENT_TIME)?;
        self.protocol.set_active_window(None)?;
        self.conn.flush()?;
        info!("Window manager shut down");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modifier() {
        assert_eq!(parse_modifier("Mod4"), ModMask::M4);
        assert_eq!(parse_modifier("control"), ModMask::CONTROL);
        assert_eq!(parse_modifier("Hyper"), ModMask::M1);
    }
}
