//! Window manager state
//!
//! Everything the manager does to its clients, independent of how events
//! arrive. All requests go through a `Protocol`, so the whole flow can be
//! driven from tests.

use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::config::FramesConfig;
use crate::shared::Geometry;
use crate::wm::client::Client;
use crate::wm::ewmh::{
    MOVERESIZE_CANCEL, MOVERESIZE_MOVE, MOVERESIZE_MOVE_KEYBOARD, MOVERESIZE_SIZE_KEYBOARD,
};
use crate::wm::focus::FocusManager;
use crate::wm::frame::{
    self, ConfigureRequest, FrameClient, FrameStyle, PieceKind, Teardown, frame_moveresize,
};
use crate::wm::hints::SizeHints;
use crate::wm::moveresize::{self, ResizeDirection};
use crate::wm::protocol::{ConfigureFlags, Protocol};
use crate::wm::workspace::WorkspaceManager;

/// Title matching used by `find_client`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabComp {
    Prefix,
    Any,
}

/// A button press, already resolved to the window it landed on
#[derive(Debug, Clone, Copy)]
pub struct Press {
    pub window: Window,
    pub button: u8,
    /// The configured move/resize modifier was held
    pub modifier: bool,
    pub root_x: i32,
    pub root_y: i32,
}

pub struct WmState {
    pub clients: HashMap<Window, Client>,
    pub focus: FocusManager,
    pub workspace: WorkspaceManager,
    frames: FramesConfig,
    /// Client under the last button press
    mouse_client: Option<Window>,
    /// Client with a move or resize in progress
    dragging: Option<Window>,
}

impl WmState {
    pub fn new(frames: FramesConfig, raise_on_focus: bool, workspace: Geometry) -> Self {
        Self {
            clients: HashMap::new(),
            focus: FocusManager::new(raise_on_focus),
            workspace: WorkspaceManager::new(workspace),
            frames,
            mouse_client: None,
            dragging: None,
        }
    }

    pub fn mouse_client(&self) -> Option<Window> {
        self.mouse_client
    }

    pub fn is_managed(&self, window: Window) -> bool {
        self.clients.contains_key(&window)
    }

    /// Client owning `window` (the client itself, its parent or a piece)
    pub fn client_for(&self, window: Window) -> Option<Window> {
        if self.clients.contains_key(&window) {
            return Some(window);
        }
        self.clients
            .values()
            .find(|client| client.owns(window))
            .map(|client| client.id)
    }

    /// Frame parent -> client
    pub fn client_by_parent(&self, parent: Window) -> Option<Window> {
        self.clients
            .values()
            .find(|client| client.frame.parent_window() == parent)
            .map(|client| client.id)
    }

    /// Frame a client currently at `geometry` and show it
    pub fn manage(
        &mut self,
        conn: &dyn Protocol,
        window: Window,
        title: String,
        hints: SizeHints,
        geometry: Geometry,
    ) -> Result<()> {
        if self.is_managed(window) {
            return Ok(());
        }

        let client = FrameClient { window, hints };
        let style = self.frames.default_style;
        let mut frame = frame::new_frame(style, conn, client, geometry, &self.frames)?;

        let parent = frame.geometry();
        let visible = self.workspace.keep_origin_visible(parent);
        if visible != parent {
            frame.configure_frame(
                conn,
                ConfigureRequest::new(ConfigureFlags::POSITION, visible),
            )?;
        }
        frame.on(conn)?;
        frame.map(conn)?;

        info!("Managing 0x{:x} '{}' ({:?} frame)", window, title, style);
        self.clients.insert(window, Client::new(window, title, frame));
        let raise = self.focus.raise_on_focus;
        self.focus(conn, window, raise)
    }

    /// Stop managing a client and destroy its frame
    pub fn unmanage(&mut self, conn: &dyn Protocol, window: Window, teardown: Teardown) -> Result<()> {
        let Some(mut client) = self.clients.remove(&window) else {
            return Ok(());
        };
        if self.dragging == Some(window) {
            self.dragging = None;
            moveresize::end(client.frame.as_mut(), conn)?;
        }
        if self.mouse_client == Some(window) {
            self.mouse_client = None;
        }
        self.focus.forget(conn, window)?;

        info!("Unmanaging 0x{:x} ({:?})", window, teardown);
        client.frame.destroy(conn, teardown)
    }

    pub fn focus(&mut self, conn: &dyn Protocol, window: Window, raise: bool) -> Result<()> {
        self.focus.set_focus(conn, &mut self.clients, window, raise)
    }

    pub fn set_title(&mut self, window: Window, title: String) {
        if let Some(client) = self.clients.get_mut(&window) {
            client.title = title;
        }
    }

    pub fn set_hints(&mut self, window: Window, hints: SizeHints) {
        if let Some(client) = self.clients.get_mut(&window) {
            client.frame.core_mut().set_hints(hints);
        }
    }

    /// Replace the client's frame with one of `style`
    pub fn switch_frame(&mut self, conn: &dyn Protocol, window: Window, style: FrameStyle) -> Result<()> {
        let Some(mut client) = self.clients.remove(&window) else {
            return Ok(());
        };
        if client.frame.style() == style {
            self.clients.insert(window, client);
            return Ok(());
        }
        if self.dragging == Some(window) {
            self.dragging = None;
            moveresize::end(client.frame.as_mut(), conn)?;
        }

        match frame::switch_style(client.frame, style, conn, &self.frames) {
            Ok(frame) => client.frame = frame,
            Err(e) => {
                warn!("Lost 0x{:x} while switching frames", window);
                self.focus.forget(conn, window)?;
                return Err(e);
            }
        }
        if client.is_maximized() {
            client.frame.maximize(conn)?;
        }
        self.clients.insert(window, client);
        Ok(())
    }

    /// Hand a configure request from the client to its frame
    pub fn configure_request(
        &mut self,
        conn: &dyn Protocol,
        window: Window,
        request: ConfigureRequest,
    ) -> Result<()> {
        match self.clients.get_mut(&window) {
            Some(client) => client.frame.configure_client(conn, request),
            None => Ok(()),
        }
    }

    /// Move the frame's outer corner to (x, y)
    pub fn move_client(&mut self, conn: &dyn Protocol, window: Window, x: i32, y: i32) -> Result<()> {
        self.ensure_unmaximized(conn, window)?;
        if let Some(client) = self.clients.get_mut(&window) {
            client.frame.configure_frame(
                conn,
                ConfigureRequest::new(ConfigureFlags::POSITION, Geometry::new(x, y, 0, 0)),
            )?;
        }
        Ok(())
    }

    /// Resize the client area, respecting its size hints
    pub fn resize_client(
        &mut self,
        conn: &dyn Protocol,
        window: Window,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.ensure_unmaximized(conn, window)?;
        if let Some(client) = self.clients.get_mut(&window) {
            frame_moveresize(
                client.frame.as_mut(),
                conn,
                ConfigureFlags::SIZE,
                Geometry::new(0, 0, width, height),
                false,
            )?;
        }
        Ok(())
    }

    pub fn maximize(&mut self, conn: &dyn Protocol, window: Window) -> Result<()> {
        let workspace = self.workspace.geometry();
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };
        if client.is_maximized() {
            return Ok(());
        }

        let restore = client.frame.client_geometry();
        client.frame.maximize(conn)?;
        client.frame.configure_frame(
            conn,
            ConfigureRequest::new(ConfigureFlags::GEOMETRY, workspace),
        )?;
        client.restore_geometry = Some(restore);
        debug!("Maximized 0x{:x} (restore {:?})", window, restore);
        Ok(())
    }

    pub fn unmaximize(&mut self, conn: &dyn Protocol, window: Window) -> Result<()> {
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };
        let Some(restore) = client.restore_geometry.take() else {
            return Ok(());
        };

        client.frame.unmaximize(conn)?;
        frame_moveresize(
            client.frame.as_mut(),
            conn,
            ConfigureFlags::GEOMETRY,
            restore,
            false,
        )?;
        debug!("Unmaximized 0x{:x} to {:?}", window, restore);
        Ok(())
    }

    pub fn toggle_maximize(&mut self, conn: &dyn Protocol, window: Window) -> Result<()> {
        match self.clients.get(&window) {
            Some(client) if client.is_maximized() => self.unmaximize(conn, window),
            Some(_) => self.maximize(conn, window),
            None => Ok(()),
        }
    }

    fn ensure_unmaximized(&mut self, conn: &dyn Protocol, window: Window) -> Result<()> {
        self.unmaximize(conn, window)
    }

    pub fn close(&mut self, conn: &dyn Protocol, window: Window) -> Result<()> {
        if self.is_managed(window) {
            conn.close_window(window)?;
        }
        Ok(())
    }

    /// First client whose title matches `needle`, case-insensitively
    pub fn find_client(&self, needle: &str, mode: TabComp) -> Option<Window> {
        let needle = needle.to_lowercase();
        let mut matches: Vec<&Client> = self
            .clients
            .values()
            .filter(|client| {
                let title = client.title.to_lowercase();
                match mode {
                    TabComp::Prefix => title.starts_with(&needle),
                    TabComp::Any => title.contains(&needle),
                }
            })
            .collect();
        matches.sort_by_key(|client| client.id);
        matches.first().map(|client| client.id)
    }

    /// A press landed on a client, its frame or a piece.
    ///
    /// Returns true when the press was consumed by the manager and must not
    /// be replayed to the client.
    pub fn button_press(&mut self, conn: &dyn Protocol, press: Press) -> Result<bool> {
        let Some(window) = self.client_for(press.window) else {
            self.mouse_client = None;
            return Ok(false);
        };
        self.mouse_client = Some(window);
        let raise = self.focus.raise_on_focus;
        self.focus(conn, window, raise)?;

        let Some(client) = self.clients.get(&window) else {
            return Ok(false);
        };
        if press.modifier {
            return match press.button {
                1 => self.begin_move(conn, window, press.root_x, press.root_y),
                3 => {
                    let direction =
                        ResizeDirection::infer(client.frame.geometry(), press.root_x, press.root_y);
                    self.begin_resize(conn, window, direction, press.root_x, press.root_y)
                }
                _ => Ok(false),
            };
        }

        match client.frame.piece_kind(press.window) {
            Some(kind) if press.button == 1 => match kind {
                PieceKind::Titlebar => self.begin_move(conn, window, press.root_x, press.root_y),
                PieceKind::CloseButton => {
                    self.close(conn, window)?;
                    Ok(true)
                }
                PieceKind::MaximizeButton => {
                    self.toggle_maximize(conn, window)?;
                    Ok(true)
                }
                border => match border.resize_direction() {
                    Some(direction) => {
                        self.begin_resize(conn, window, direction, press.root_x, press.root_y)
                    }
                    None => Ok(true),
                },
            },
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    fn begin_move(&mut self, conn: &dyn Protocol, window: Window, x: i32, y: i32) -> Result<bool> {
        if self.dragging.is_some() {
            return Ok(true);
        }
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(false);
        };
        if moveresize::move_begin(client.frame.as_mut(), conn, x, y)? {
            self.dragging = Some(window);
        }
        Ok(true)
    }

    fn begin_resize(
        &mut self,
        conn: &dyn Protocol,
        window: Window,
        direction: ResizeDirection,
        x: i32,
        y: i32,
    ) -> Result<bool> {
        if self.dragging.is_some() {
            return Ok(true);
        }
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(false);
        };
        if moveresize::resize_begin(client.frame.as_mut(), conn, direction, x, y)? {
            self.dragging = Some(window);
        }
        Ok(true)
    }

    /// Pointer motion while the pointer is grabbed
    pub fn motion(&mut self, conn: &dyn Protocol, root_x: i32, root_y: i32) -> Result<()> {
        let Some(window) = self.dragging else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(&window) else {
            self.dragging = None;
            return Ok(());
        };
        let frame = client.frame.as_mut();
        if frame.moving() {
            moveresize::move_step(frame, conn, root_x, root_y)
        } else {
            moveresize::resize_step(frame, conn, root_x, root_y)
        }
    }

    /// Button release ends whatever drag is in progress
    pub fn button_release(&mut self, conn: &dyn Protocol) -> Result<()> {
        let Some(window) = self.dragging.take() else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };
        let frame = client.frame.as_mut();
        if frame.moving() {
            moveresize::move_end(frame, conn)
        } else {
            moveresize::resize_end(frame, conn)
        }
    }

    /// `_NET_WM_MOVERESIZE` from a client
    pub fn moveresize_request(
        &mut self,
        conn: &dyn Protocol,
        window: Window,
        code: u32,
        root_x: i32,
        root_y: i32,
    ) -> Result<()> {
        if !self.is_managed(window) {
            return Ok(());
        }
        match code {
            MOVERESIZE_MOVE => {
                self.begin_move(conn, window, root_x, root_y)?;
            }
            MOVERESIZE_CANCEL => {
                if self.dragging == Some(window) {
                    self.dragging = None;
                    if let Some(client) = self.clients.get_mut(&window) {
                        let frame = client.frame.as_mut();
                        if frame.moving() {
                            moveresize::move_cancel(frame, conn)?;
                        } else {
                            moveresize::resize_end(frame, conn)?;
                        }
                    }
                }
            }
            MOVERESIZE_SIZE_KEYBOARD | MOVERESIZE_MOVE_KEYBOARD => {
                debug!("Keyboard move/resize is not supported, ignoring code {}", code);
            }
            code => match ResizeDirection::from_ewmh(code) {
                Some(direction) => {
                    self.begin_resize(conn, window, direction, root_x, root_y)?;
                }
                None => warn!("Unsupported _NET_WM_MOVERESIZE direction {}", code),
            },
        }
        Ok(())
    }

    /// Destroy every frame, handing clients back to the root
    pub fn shutdown(&mut self, conn: &dyn Protocol) -> Result<()> {
        let windows: Vec<Window> = self.clients.keys().copied().collect();
        info!("Releasing {} clients", windows.len());
        let mut result = Ok(());
        for window in windows {
            result = result.and(self.unmanage(conn, window, Teardown::KeepClient));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::frame::FrameState;
    use crate::wm::frame::test_support::{CLIENT, themes};
    use crate::wm::protocol::testing::{ROOT, Recorder, Request};

    const OTHER: Window = 0x43;

    fn state() -> WmState {
        WmState::new(themes(), true, Geometry::new(0, 0, 1000, 800))
    }

    fn managed(conn: &Recorder) -> WmState {
        let mut state = state();
        state
            .manage(
                conn,
                CLIENT,
                "xterm".into(),
                SizeHints::default(),
                Geometry::new(100, 100, 400, 300),
            )
            .unwrap();
        state
    }

    fn piece(state: &WmState, kind: PieceKind) -> Window {
        state.clients[&CLIENT]
            .frame
            .pieces()
            .iter()
            .find(|piece| piece.kind() == kind)
            .map(|piece| piece.window())
            .unwrap()
    }

    fn press(window: Window, button: u8, modifier: bool, root_x: i32, root_y: i32) -> Press {
        Press {
            window,
            button,
            modifier,
            root_x,
            root_y,
        }
    }

    #[test]
    fn test_manage_maps_and_focuses() {
        let conn = Recorder::new();
        let state = managed(&conn);

        assert!(state.is_managed(CLIENT));
        assert_eq!(state.focus.focused(), Some(CLIENT));
        let requests = conn.requests();
        assert!(requests.contains(&Request::Map(CLIENT)));
        assert!(requests.contains(&Request::Focus(CLIENT)));
        assert!(requests.contains(&Request::ActiveWindow(Some(CLIENT))));
        assert_eq!(
            state.clients[&CLIENT].frame.client_geometry(),
            Geometry::new(100, 100, 400, 300)
        );
    }

    #[test]
    fn test_manage_keeps_titlebar_on_screen() {
        let conn = Recorder::new();
        let mut state = state();
        state
            .manage(&conn, CLIENT, "a".into(), SizeHints::default(), Geometry::new(0, 0, 400, 300))
            .unwrap();

        let frame = &state.clients[&CLIENT].frame;
        assert_eq!(frame.geometry().x, 0);
        assert_eq!(frame.geometry().y, 0);
        assert_eq!(frame.client_geometry(), Geometry::new(2, 22, 400, 300));
    }

    #[test]
    fn test_focus_moves_active_state() {
        let conn = Recorder::new();
        let mut state = managed(&conn);
        state
            .manage(&conn, OTHER, "b".into(), SizeHints::default(), Geometry::new(10, 30, 50, 50))
            .unwrap();

        assert_eq!(state.focus.focused(), Some(OTHER));
        assert_eq!(state.clients[&CLIENT].frame.state(), FrameState::Inactive);
        assert_eq!(state.clients[&OTHER].frame.state(), FrameState::Active);

        state.unmanage(&conn, OTHER, Teardown::ClientGone).unwrap();
        assert_eq!(state.focus.focused(), None);
        assert!(matches!(conn.requests().last(), Some(Request::Destroy(_))));
    }

    #[test]
    fn test_maximize_round_trip() {
        let conn = Recorder::new();
        let mut state = managed(&conn);

        state.toggle_maximize(&conn, CLIENT).unwrap();
        let client = &state.clients[&CLIENT];
        assert!(client.is_maximized());
        assert_eq!(client.frame.geometry(), Geometry::new(0, 0, 1000, 800));
        assert_eq!(client.frame.client_geometry(), Geometry::new(0, 20, 1000, 780));

        state.toggle_maximize(&conn, CLIENT).unwrap();
        let client = &state.clients[&CLIENT];
        assert!(!client.is_maximized());
        assert_eq!(client.frame.client_geometry(), Geometry::new(100, 100, 400, 300));
        assert_eq!(client.frame.top(), 22);
    }

    #[test]
    fn test_switch_frame_preserves_geometry() {
        let conn = Recorder::new();
        let mut state = managed(&conn);

        state.switch_frame(&conn, CLIENT, FrameStyle::Slim).unwrap();

        let frame = &state.clients[&CLIENT].frame;
        assert_eq!(frame.style(), FrameStyle::Slim);
        assert_eq!(frame.client_geometry(), Geometry::new(100, 100, 400, 300));
        assert_eq!(frame.state(), FrameState::Active);
        assert_eq!(conn.live_pixmaps(), 0);
    }

    #[test]
    fn test_close_button() {
        let conn = Recorder::new();
        let mut state = managed(&conn);
        let close = piece(&state, PieceKind::CloseButton);

        assert!(state.button_press(&conn, press(close, 1, false, 0, 0)).unwrap());
        assert!(conn.requests().contains(&Request::Close(CLIENT)));
        assert_eq!(state.mouse_client(), Some(CLIENT));
    }

    #[test]
    fn test_modifier_drag_moves() {
        let conn = Recorder::new();
        let mut state = managed(&conn);

        assert!(state.button_press(&conn, press(CLIENT, 1, true, 500, 500)).unwrap());
        state.motion(&conn, 510, 520).unwrap();
        state.button_release(&conn).unwrap();
        state.motion(&conn, 900, 900).unwrap();

        let frame = &state.clients[&CLIENT].frame;
        assert_eq!(frame.client_geometry(), Geometry::new(110, 120, 400, 300));
        assert!(!frame.moving());
        assert_eq!(conn.requests().last(), Some(&Request::UngrabPointer));
    }

    #[test]
    fn test_border_press_resizes() {
        let conn = Recorder::new();
        let mut state = managed(&conn);
        let right = piece(&state, PieceKind::BorderRight);

        assert!(state.button_press(&conn, press(right, 1, false, 501, 200)).unwrap());
        assert!(state.clients[&CLIENT].frame.resizing());
        state.motion(&conn, 551, 200).unwrap();
        state.button_release(&conn).unwrap();

        assert_eq!(
            state.clients[&CLIENT].frame.client_geometry(),
            Geometry::new(100, 100, 450, 300)
        );
    }

    #[test]
    fn test_plain_click_on_client_is_replayed() {
        let conn = Recorder::new();
        let mut state = managed(&conn);

        assert!(!state.button_press(&conn, press(CLIENT, 1, false, 150, 150)).unwrap());
        assert!(!state.button_press(&conn, press(ROOT, 1, false, 0, 0)).unwrap());
        assert_eq!(state.mouse_client(), None);
    }

    #[test]
    fn test_net_moveresize_and_cancel() {
        let conn = Recorder::new();
        let mut state = managed(&conn);

        state.moveresize_request(&conn, CLIENT, 4, 300, 300).unwrap();
        assert!(state.clients[&CLIENT].frame.resizing());
        // a second begin while busy is ignored
        state.moveresize_request(&conn, CLIENT, MOVERESIZE_MOVE, 300, 300).unwrap();
        assert!(!state.clients[&CLIENT].frame.moving());

        state.moveresize_request(&conn, CLIENT, MOVERESIZE_CANCEL, 0, 0).unwrap();
        assert!(!state.clients[&CLIENT].frame.resizing());
    }

    #[test]
    fn test_cancelled_move_returns_to_start() {
        let conn = Recorder::new();
        let mut state = managed(&conn);
        let before = state.clients[&CLIENT].frame.geometry();

        state.moveresize_request(&conn, CLIENT, MOVERESIZE_MOVE, 300, 300).unwrap();
        state.motion(&conn, 360, 340).unwrap();
        assert_ne!(state.clients[&CLIENT].frame.geometry(), before);

        state.moveresize_request(&conn, CLIENT, MOVERESIZE_CANCEL, 0, 0).unwrap();
        assert!(!state.clients[&CLIENT].frame.moving());
        assert_eq!(state.clients[&CLIENT].frame.geometry(), before);

        // keyboard codes are ignored without starting anything
        state.moveresize_request(&conn, CLIENT, MOVERESIZE_MOVE_KEYBOARD, 0, 0).unwrap();
        assert!(!state.clients[&CLIENT].frame.moving());
    }

    #[test]
    fn test_find_client() {
        let conn = Recorder::new();
        let mut state = managed(&conn);
        state
            .manage(&conn, OTHER, "Firefox".into(), SizeHints::default(), Geometry::new(10, 30, 50, 50))
            .unwrap();

        assert_eq!(state.find_client("fire", TabComp::Prefix), Some(OTHER));
        assert_eq!(state.find_client("term", TabComp::Prefix), None);
        assert_eq!(state.find_client("term", TabComp::Any), Some(CLIENT));
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let conn = Recorder::new();
        let mut state = managed(&conn);
        state
            .manage(&conn, OTHER, "b".into(), SizeHints::default(), Geometry::new(10, 30, 50, 50))
            .unwrap();
        state.button_press(&conn, press(OTHER, 1, true, 20, 40)).unwrap();

        state.shutdown(&conn).unwrap();

        assert!(state.clients.is_empty());
        assert_eq!(conn.live_windows(), 0);
        assert_eq!(conn.live_pixmaps(), 0);
        assert!(conn.requests().contains(&Request::Reparent {
            window: CLIENT,
            parent: ROOT,
            x: 100,
            y: 100,
        }));
    }
}
