//! EWMH/ICCCM atoms used by the frame manager

use anyhow::Result;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::wrapper::ConnectionExt as _;

/// `_NET_WM_MOVERESIZE` direction codes
pub const MOVERESIZE_MOVE: u32 = 8;
pub const MOVERESIZE_SIZE_KEYBOARD: u32 = 9;
pub const MOVERESIZE_MOVE_KEYBOARD: u32 = 10;
pub const MOVERESIZE_CANCEL: u32 = 11;

/// Holds all interned atoms
#[derive(Debug)]
pub struct Atoms {
    pub net_supported: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_active_window: Atom,
    pub net_close_window: Atom,
    pub net_frame_extents: Atom,
    pub net_wm_moveresize: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            net_supported: intern("_NET_SUPPORTED")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_close_window: intern("_NET_CLOSE_WINDOW")?,
            net_frame_extents: intern("_NET_FRAME_EXTENTS")?,
            net_wm_moveresize: intern("_NET_WM_MOVERESIZE")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            utf8_string: intern("UTF8_STRING")?,
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
        })
    }

    /// Advertise supported hints and the supporting WM check window
    pub fn setup_supported<C: Connection>(&self, conn: &C, root: Window, check: Window) -> Result<()> {
        let supported = [
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_active_window,
            self.net_close_window,
            self.net_frame_extents,
            self.net_wm_moveresize,
            self.net_wm_name,
        ];

        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_supported,
            AtomEnum::ATOM,
            &supported,
        )?;

        for window in [root, check] {
            conn.change_property32(
                PropMode::REPLACE,
                window,
                self.net_supporting_wm_check,
                AtomEnum::WINDOW,
                &[check],
            )?;
        }
        conn.change_property8(
            PropMode::REPLACE,
            check,
            self.net_wm_name,
            self.utf8_string,
            b"framewm",
        )?;

        debug!("Published _NET_SUPPORTED ({} atoms)", supported.len());
        Ok(())
    }
}
