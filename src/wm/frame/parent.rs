//! The reparenting container that hosts a client and its decorations

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::{EventMask, Window};

use crate::shared::{ClientOffset, Geometry};
use crate::wm::protocol::Protocol;

/// How a frame is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The client stays alive: hand it back to the root window
    KeepClient,
    /// The client window is already gone
    ClientGone,
}

#[derive(Debug)]
pub struct FrameParent {
    window: Window,
    client: Window,
}

impl FrameParent {
    /// Create the parent at `geometry` and reparent `client` into it
    pub fn new(
        conn: &dyn Protocol,
        client: Window,
        geometry: Geometry,
        offset: ClientOffset,
    ) -> Result<Self> {
        let window = conn.create_window(
            conn.root(),
            geometry,
            EventMask::SUBSTRUCTURE_REDIRECT
                | EventMask::SUBSTRUCTURE_NOTIFY
                | EventMask::BUTTON_PRESS
                | EventMask::BUTTON_RELEASE,
        )?;

        if let Err(e) = conn.reparent(client, window, offset.left as i32, offset.top as i32) {
            let _ = conn.destroy_window(window);
            return Err(e);
        }
        debug!("Reparented 0x{:x} into frame 0x{:x}", client, window);

        Ok(Self { window, client })
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn client(&self) -> Window {
        self.client
    }

    /// Destroy the parent; a surviving client is placed at `client_geometry` on the root
    pub fn destroy(
        self,
        conn: &dyn Protocol,
        teardown: Teardown,
        client_geometry: Geometry,
    ) -> Result<()> {
        let reparent = match teardown {
            Teardown::KeepClient => conn.reparent(
                self.client,
                conn.root(),
                client_geometry.x,
                client_geometry.y,
            ),
            Teardown::ClientGone => Ok(()),
        };
        let destroy = conn.destroy_window(self.window);
        debug!("Destroyed frame 0x{:x} ({:?})", self.window, teardown);
        reparent.and(destroy)
    }
}
