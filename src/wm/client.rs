use x11rb::protocol::xproto::Window;

use crate::shared::Geometry;
use crate::wm::frame::Frame;

/// Window Manager client state
/// Represents a window being managed by the WM
pub struct Client {
    /// X11 window ID
    pub id: Window,

    /// Window title
    pub title: String,

    /// Decorated container the client lives in
    pub frame: Box<dyn Frame>,

    /// Restore geometry (for unmaximizing)
    pub restore_geometry: Option<Geometry>,
}

impl Client {
    pub fn new(id: Window, title: String, frame: Box<dyn Frame>) -> Self {
        Self {
            id,
            title,
            frame,
            restore_geometry: None,
        }
    }

    pub fn is_maximized(&self) -> bool {
        self.restore_geometry.is_some()
    }

    /// Whether `window` is this client, its frame parent or one of its pieces
    pub fn owns(&self, window: Window) -> bool {
        window == self.id
            || window == self.frame.parent_window()
            || self.frame.piece_kind(window).is_some()
    }
}
