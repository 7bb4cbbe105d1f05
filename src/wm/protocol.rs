//! Protocol Module
//!
//! Every request a frame issues goes through the `Protocol` trait, so frame
//! logic never touches the X connection directly. `X11Protocol` is the real
//! implementation on top of x11rb.

use std::sync::Arc;

use anyhow::{Context, Result};
use bitflags::bitflags;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::shared::{ClientOffset, Geometry, wire_coord, wire_extent};
use crate::wm::ewmh::Atoms;

bitflags! {
    /// Which fields of a configure request are meaningful.
    ///
    /// Bit values match the core protocol's `ConfigWindow` mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigureFlags: u16 {
        const X          = 1 << 0;
        const Y          = 1 << 1;
        const WIDTH      = 1 << 2;
        const HEIGHT     = 1 << 3;
        const SIBLING    = 1 << 5;
        const STACK_MODE = 1 << 6;
    }
}

impl ConfigureFlags {
    pub const POSITION: Self = Self::X.union(Self::Y);
    pub const SIZE: Self = Self::WIDTH.union(Self::HEIGHT);
    pub const GEOMETRY: Self = Self::POSITION.union(Self::SIZE);

    /// Flags from a ConfigureRequest's value mask (border width is dropped)
    pub fn from_value_mask(mask: ConfigWindow) -> Self {
        Self::from_bits_truncate(u16::from(mask))
    }
}

/// Low-level requests frames issue against the windowing system
pub trait Protocol {
    fn root(&self) -> Window;

    fn create_window(&self, parent: Window, geometry: Geometry, event_mask: EventMask)
        -> Result<Window>;

    fn reparent(&self, window: Window, parent: Window, x: i32, y: i32) -> Result<()>;

    /// Move/resize/restack; only fields selected by `flags` are sent
    fn configure(
        &self,
        window: Window,
        flags: ConfigureFlags,
        geometry: Geometry,
        sibling: Option<Window>,
        stack_mode: Option<StackMode>,
    ) -> Result<()>;

    fn map(&self, window: Window) -> Result<()>;

    fn unmap(&self, window: Window) -> Result<()>;

    fn destroy_window(&self, window: Window) -> Result<()>;

    fn set_background_pixel(&self, window: Window, pixel: u32) -> Result<()>;

    fn set_background_pixmap(&self, window: Window, pixmap: Pixmap) -> Result<()>;

    /// Repaint the window with its background
    fn clear(&self, window: Window) -> Result<()>;

    fn create_solid_pixmap(&self, width: u32, height: u32, color: u32) -> Result<Pixmap>;

    fn free_pixmap(&self, pixmap: Pixmap) -> Result<()>;

    /// Synthetic ConfigureNotify carrying the client's root-relative geometry
    fn send_configure_notify(&self, window: Window, geometry: Geometry) -> Result<()>;

    /// Publish `_NET_FRAME_EXTENTS` on the client
    fn set_frame_extents(&self, window: Window, offset: ClientOffset) -> Result<()>;

    fn set_input_focus(&self, window: Window) -> Result<()>;

    /// Publish `_NET_ACTIVE_WINDOW` on the root
    fn set_active_window(&self, window: Option<Window>) -> Result<()>;

    fn grab_pointer(&self) -> Result<()>;

    fn ungrab_pointer(&self) -> Result<()>;

    /// Politely close via WM_DELETE_WINDOW, or kill the client
    fn close_window(&self, window: Window) -> Result<()>;
}

/// `Protocol` over an x11rb connection
pub struct X11Protocol {
    conn: Arc<RustConnection>,
    root: Window,
    depth: u8,
    atoms: Atoms,
}

impl X11Protocol {
    pub fn new(conn: Arc<RustConnection>, screen_num: usize) -> Result<Self> {
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let depth = screen.root_depth;
        let atoms = Atoms::new(conn.as_ref()).context("Failed to intern atoms")?;

        Ok(Self {
            conn,
            root,
            depth,
            atoms,
        })
    }

    pub fn conn(&self) -> &RustConnection {
        &self.conn
    }

    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    fn supports_delete(&self, window: Window) -> Result<bool> {
        let reply = self
            .conn
            .get_property(
                false,
                window,
                self.atoms.wm_protocols,
                AtomEnum::ATOM,
                0,
                32,
            )?
            .reply()?;
        Ok(reply
            .value32()
            .map(|mut atoms| atoms.any(|atom| atom == self.atoms.wm_delete_window))
            .unwrap_or(false))
    }
}

impl Protocol for X11Protocol {
    fn root(&self) -> Window {
        self.root
    }

    fn create_window(
        &self,
        parent: Window,
        geometry: Geometry,
        event_mask: EventMask,
    ) -> Result<Window> {
        let window = self.conn.generate_id()?;
        self.conn.create_window(
            self.depth,
            window,
            parent,
            wire_coord(geometry.x),
            wire_coord(geometry.y),
            wire_extent(geometry.width),
            wire_extent(geometry.height),
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new().event_mask(event_mask),
        )?;
        Ok(window)
    }

    fn reparent(&self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        self.conn.reparent_window(window, parent, wire_coord(x), wire_coord(y))?;
        Ok(())
    }

    fn configure(
        &self,
        window: Window,
        flags: ConfigureFlags,
        geometry: Geometry,
        sibling: Option<Window>,
        stack_mode: Option<StackMode>,
    ) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        if flags.contains(ConfigureFlags::X) {
            aux = aux.x(i32::from(wire_coord(geometry.x)));
        }
        if flags.contains(ConfigureFlags::Y) {
            aux = aux.y(i32::from(wire_coord(geometry.y)));
        }
        if flags.contains(ConfigureFlags::WIDTH) {
            aux = aux.width(u32::from(wire_extent(geometry.width)));
        }
        if flags.contains(ConfigureFlags::HEIGHT) {
            aux = aux.height(u32::from(wire_extent(geometry.height)));
        }
        if flags.contains(ConfigureFlags::SIBLING) {
            aux = aux.sibling(sibling);
        }
        if flags.contains(ConfigureFlags::STACK_MODE) {
            aux = aux.stack_mode(stack_mode);
        }
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn map(&self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap(&self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn destroy_window(&self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn set_background_pixel(&self, window: Window, pixel: u32) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().background_pixel(pixel),
        )?;
        Ok(())
    }

    fn set_background_pixmap(&self, window: Window, pixmap: Pixmap) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().background_pixmap(pixmap),
        )?;
        Ok(())
    }

    fn clear(&self, window: Window) -> Result<()> {
        self.conn.clear_area(false, window, 0, 0, 0, 0)?;
        Ok(())
    }

    fn create_solid_pixmap(&self, width: u32, height: u32, color: u32) -> Result<Pixmap> {
        let pixmap = self.conn.generate_id()?;
        let width = wire_extent(width);
        let height = wire_extent(height);
        self.conn
            .create_pixmap(self.depth, pixmap, self.root, width, height)?;

        let gc = self.conn.generate_id()?;
        self.conn
            .create_gc(gc, pixmap, &CreateGCAux::new().foreground(color))?;
        self.conn.poly_fill_rectangle(
            pixmap,
            gc,
            &[Rectangle {
                x: 0,
                y: 0,
                width,
                height,
            }],
        )?;
        self.conn.free_gc(gc)?;
        Ok(pixmap)
    }

    fn free_pixmap(&self, pixmap: Pixmap) -> Result<()> {
        self.conn.free_pixmap(pixmap)?;
        Ok(())
    }

    fn send_configure_notify(&self, window: Window, geometry: Geometry) -> Result<()> {
        // ICCCM 4.1.5: root-relative coordinates, border width of zero
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: wire_coord(geometry.x),
            y: wire_coord(geometry.y),
            width: wire_extent(geometry.width),
            height: wire_extent(geometry.height),
            border_width: 0,
            override_redirect: false,
        };
        self.conn
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn set_frame_extents(&self, window: Window, offset: ClientOffset) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_frame_extents,
            AtomEnum::CARDINAL,
            &[offset.left, offset.right(), offset.top, offset.bottom()],
        )?;
        Ok(())
    }

    fn set_input_focus(&self, window: Window) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME)?;
        Ok(())
    }

    fn set_active_window(&self, window: Option<Window>) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_active_window,
            AtomEnum::WINDOW,
            &[window.unwrap_or(NONE)],
        )?;
        Ok(())
    }

    fn grab_pointer(&self) -> Result<()> {
        self.conn
            .grab_pointer(
                false,
                self.root,
                EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                CURRENT_TIME,
            )?
            .reply()
            .context("Failed to grab pointer")?;
        Ok(())
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        Ok(())
    }

    fn close_window(&self, window: Window) -> Result<()> {
        if self.supports_delete(window)? {
            debug!("Sending WM_DELETE_WINDOW to 0x{:x}", window);
            let event = ClientMessageEvent::new(
                32,
                window,
                self.atoms.wm_protocols,
                [self.atoms.wm_delete_window, CURRENT_TIME, 0, 0, 0],
            );
            self.conn
                .send_event(false, window, EventMask::NO_EVENT, event)?;
        } else {
            debug!("Killing client 0x{:x}", window);
            self.conn.kill_client(window)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_match_config_window_bits() {
        let mask = ConfigWindow::X | ConfigWindow::HEIGHT | ConfigWindow::STACK_MODE;
        let flags = ConfigureFlags::from_value_mask(mask);
        assert_eq!(
            flags,
            ConfigureFlags::X | ConfigureFlags::HEIGHT | ConfigureFlags::STACK_MODE
        );
    }

    #[test]
    fn test_border_width_is_dropped() {
        let flags = ConfigureFlags::from_value_mask(ConfigWindow::BORDER_WIDTH);
        assert!(flags.is_empty());
    }
}
