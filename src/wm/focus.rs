//! Focus Module
//!
//! Click-to-focus tracking. The focused client's frame is painted active,
//! every other frame inactive.

use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;
use x11rb::protocol::xproto::{StackMode, Window};

use crate::wm::client::Client;
use crate::wm::frame::ConfigureRequest;
use crate::wm::protocol::Protocol;

/// Focus manager
#[derive(Debug, Default)]
pub struct FocusManager {
    /// Currently focused window
    focused_window: Option<Window>,

    /// Raise window when focused
    pub raise_on_focus: bool,
}

impl FocusManager {
    pub fn new(raise_on_focus: bool) -> Self {
        Self {
            focused_window: None,
            raise_on_focus,
        }
    }

    pub fn focused(&self) -> Option<Window> {
        self.focused_window
    }

    /// Focus a managed client; `raise` stacks it above its siblings
    pub fn set_focus(
        &mut self,
        conn: &dyn Protocol,
        clients: &mut HashMap<Window, Client>,
        window: Window,
        raise: bool,
    ) -> Result<()> {
        if !clients.contains_key(&window) {
            debug!("Ignoring focus request for unmanaged 0x{:x}", window);
            return Ok(());
        }

        if let Some(previous) = self.focused_window.filter(|previous| *previous != window) {
            if let Some(client) = clients.get_mut(&previous) {
                client.frame.state_inactive(conn)?;
            }
        }
        self.focused_window = Some(window);

        if let Some(client) = clients.get_mut(&window) {
            client.frame.state_active(conn)?;
            if raise {
                client
                    .frame
                    .configure_client(conn, ConfigureRequest::restack(StackMode::ABOVE, None))?;
            }
        }
        conn.set_input_focus(window)?;
        conn.set_active_window(Some(window))?;
        debug!("Focused 0x{:x} (raise={})", window, raise);
        Ok(())
    }

    /// Drop focus if it was on `window`
    pub fn forget(&mut self, conn: &dyn Protocol, window: Window) -> Result<()> {
        if self.focused_window == Some(window) {
            self.focused_window = None;
            conn.set_active_window(None)?;
        }
        Ok(())
    }
}
