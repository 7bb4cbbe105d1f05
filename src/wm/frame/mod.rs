//! Frames
//!
//! A frame owns the parent window a client is reparented into plus the
//! decoration pieces drawn around it. Every decoration style implements the
//! `Frame` trait; the geometry negotiation (`configure_client` and
//! `configure_frame`) is shared and parameterized only by the style's
//! `ClientOffset` and its pieces.
//!
//! The parent rectangle stored in `FrameCore` is the single authoritative
//! geometry record. The client rectangle is derived from it through the
//! offset that was last applied, and pieces are re-resolved from it after
//! every configure.

pub mod full;
pub mod parent;
pub mod piece;
pub mod slim;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;
use x11rb::protocol::xproto::{StackMode, Window};

use crate::config::FramesConfig;
use crate::shared::{ClientOffset, Geometry, MAX_COORD, MAX_EXTENT, MIN_COORD};
use crate::wm::hints::SizeHints;
use crate::wm::moveresize::Interaction;
use crate::wm::protocol::{ConfigureFlags, Protocol};

pub use full::FullFrame;
pub use parent::{FrameParent, Teardown};
pub use piece::{FramePiece, PieceKind};
pub use slim::SlimFrame;

/// Decoration style selected at frame construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStyle {
    #[default]
    Full,
    Slim,
}

/// Visual activation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Active,
    Inactive,
}

/// The client a frame decorates: its window and the constraints it declared
#[derive(Debug, Clone)]
pub struct FrameClient {
    pub window: Window,
    pub hints: SizeHints,
}

/// A geometry change request.
///
/// Only the fields selected by `flags` are meaningful; the rest are taken
/// from the frame's current geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigureRequest {
    pub flags: ConfigureFlags,
    pub geometry: Geometry,
    pub sibling: Option<Window>,
    pub stack_mode: Option<StackMode>,
    pub ignore_hints: bool,
}

impl ConfigureRequest {
    pub fn new(flags: ConfigureFlags, geometry: Geometry) -> Self {
        Self {
            flags,
            geometry,
            sibling: None,
            stack_mode: None,
            ignore_hints: false,
        }
    }

    /// Stacking change only
    pub fn restack(stack_mode: StackMode, sibling: Option<Window>) -> Self {
        let mut flags = ConfigureFlags::STACK_MODE;
        flags.set(ConfigureFlags::SIBLING, sibling.is_some());
        Self {
            flags,
            geometry: Geometry::default(),
            sibling,
            stack_mode: Some(stack_mode),
            ignore_hints: false,
        }
    }

    pub fn ignore_hints(mut self) -> Self {
        self.ignore_hints = true;
        self
    }
}

/// State shared by every frame variant
pub struct FrameCore {
    parent: FrameParent,
    client: FrameClient,
    geometry: Geometry,
    applied: ClientOffset,
    state: FrameState,
    interaction: Interaction,
}

impl FrameCore {
    /// Create the parent around a client currently at `client_geometry`
    pub fn new(
        conn: &dyn Protocol,
        client: FrameClient,
        client_geometry: Geometry,
        offset: ClientOffset,
    ) -> Result<Self> {
        let geometry = offset.to_parent(client_geometry);
        let parent = FrameParent::new(conn, client.window, geometry, offset)?;
        conn.set_frame_extents(client.window, offset)?;

        Ok(Self {
            parent,
            client,
            geometry,
            applied: offset,
            state: FrameState::Inactive,
            interaction: Interaction::Idle,
        })
    }

    pub fn parent(&self) -> &FrameParent {
        &self.parent
    }

    pub fn client(&self) -> &FrameClient {
        &self.client
    }

    pub fn set_hints(&mut self, hints: SizeHints) {
        self.client.hints = hints;
    }

    /// Parent rectangle, root-relative
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Client rectangle, root-relative
    pub fn client_geometry(&self) -> Geometry {
        self.applied.to_client(self.geometry)
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn set_interaction(&mut self, interaction: Interaction) {
        self.interaction = interaction;
    }

    pub fn destroy(self, conn: &dyn Protocol, teardown: Teardown) -> Result<()> {
        let client_geometry = self.client_geometry();
        self.parent.destroy(conn, teardown, client_geometry)
    }
}

/// Uniform contract of every decoration style
pub trait Frame {
    fn core(&self) -> &FrameCore;

    fn core_mut(&mut self) -> &mut FrameCore;

    fn style(&self) -> FrameStyle;

    /// Offset model currently in effect
    fn offset(&self) -> ClientOffset;

    fn pieces(&self) -> &[FramePiece];

    fn pieces_mut(&mut self) -> &mut [FramePiece];

    /// Show decorations and re-derive geometry
    fn on(&mut self, conn: &dyn Protocol) -> Result<()>;

    /// Hide decorations
    fn off(&mut self, conn: &dyn Protocol) -> Result<()>;

    /// Paint the focused look
    fn active(&mut self, conn: &dyn Protocol) -> Result<()>;

    /// Paint the unfocused look
    fn inactive(&mut self, conn: &dyn Protocol) -> Result<()>;

    fn maximize(&mut self, conn: &dyn Protocol) -> Result<()>;

    fn unmaximize(&mut self, conn: &dyn Protocol) -> Result<()>;

    /// Destroy the parent and every piece, releasing their images once
    fn destroy(self: Box<Self>, conn: &dyn Protocol, teardown: Teardown) -> Result<()>;

    fn top(&self) -> u32 {
        self.offset().top
    }

    fn bottom(&self) -> u32 {
        self.offset().bottom()
    }

    fn left(&self) -> u32 {
        self.offset().left
    }

    fn right(&self) -> u32 {
        self.offset().right()
    }

    fn client(&self) -> &FrameClient {
        self.core().client()
    }

    fn parent(&self) -> &FrameParent {
        self.core().parent()
    }

    fn parent_window(&self) -> Window {
        self.core().parent().window()
    }

    fn geometry(&self) -> Geometry {
        self.core().geometry()
    }

    fn client_geometry(&self) -> Geometry {
        self.core().client_geometry()
    }

    fn state(&self) -> FrameState {
        self.core().state()
    }

    fn moving(&self) -> bool {
        matches!(self.core().interaction(), Interaction::Moving(_))
    }

    fn resizing(&self) -> bool {
        matches!(self.core().interaction(), Interaction::Resizing(_))
    }

    /// Which decoration piece `window` is, if any
    fn piece_kind(&self, window: Window) -> Option<PieceKind> {
        self.pieces()
            .iter()
            .find(|piece| piece.window() == window)
            .map(|piece| piece.kind())
    }

    fn validate_width(&self, width: u32) -> u32 {
        self.client().hints.constrain_width(width)
    }

    fn validate_height(&self, height: u32) -> u32 {
        self.client().hints.constrain_height(height)
    }

    fn configure_client(&mut self, conn: &dyn Protocol, request: ConfigureRequest) -> Result<()> {
        configure_client(self, conn, request)
    }

    fn configure_frame(&mut self, conn: &dyn Protocol, request: ConfigureRequest) -> Result<()> {
        configure_frame(self, conn, request)
    }

    fn map(&self, conn: &dyn Protocol) -> Result<()> {
        conn.map(self.client().window)?;
        conn.map(self.parent_window())
    }

    fn unmap(&self, conn: &dyn Protocol) -> Result<()> {
        conn.unmap(self.parent_window())
    }

    fn state_active(&mut self, conn: &dyn Protocol) -> Result<()> {
        self.core_mut().state = FrameState::Active;
        self.active(conn)
    }

    fn state_inactive(&mut self, conn: &dyn Protocol) -> Result<()> {
        self.core_mut().state = FrameState::Inactive;
        self.inactive(conn)
    }

    /// Paint whatever the current state calls for
    fn repaint(&mut self, conn: &dyn Protocol) -> Result<()> {
        match self.state() {
            FrameState::Active => self.active(conn),
            FrameState::Inactive => self.inactive(conn),
        }
    }
}

fn merge(current: Geometry, flags: ConfigureFlags, requested: Geometry) -> Geometry {
    Geometry {
        x: if flags.contains(ConfigureFlags::X) { requested.x } else { current.x },
        y: if flags.contains(ConfigureFlags::Y) { requested.y } else { current.y },
        width: if flags.contains(ConfigureFlags::WIDTH) {
            requested.width
        } else {
            current.width
        },
        height: if flags.contains(ConfigureFlags::HEIGHT) {
            requested.height
        } else {
            current.height
        },
    }
}

/// Configure from a client-relative rectangle.
///
/// Width/height are clamped to the size hints unless `ignore_hints` is set,
/// then the parent rectangle is derived through the frame's offset.
pub fn configure_client<F: Frame + ?Sized>(
    frame: &mut F,
    conn: &dyn Protocol,
    request: ConfigureRequest,
) -> Result<()> {
    let mut target = merge(frame.client_geometry(), request.flags, request.geometry);
    if !request.ignore_hints {
        if request.flags.contains(ConfigureFlags::WIDTH) {
            target.width = frame.validate_width(target.width);
        }
        if request.flags.contains(ConfigureFlags::HEIGHT) {
            target.height = frame.validate_height(target.height);
        }
    }

    // The whole parent rectangle is resolved here; a changed offset can move
    // the parent even when only the size was requested
    let geometry = frame.offset().to_parent(target);
    let flags = (request.flags - ConfigureFlags::GEOMETRY) | ConfigureFlags::GEOMETRY;
    configure_frame(
        frame,
        conn,
        ConfigureRequest {
            flags,
            geometry,
            ignore_hints: true,
            ..request
        },
    )
}

/// Configure from a parent-relative rectangle.
///
/// Issues the parent configure, the client configure when its size or
/// position inside the parent changed, re-lays out the pieces and commits
/// the new geometry record. A client whose size did not change gets a
/// synthetic ConfigureNotify instead.
pub fn configure_frame<F: Frame + ?Sized>(
    frame: &mut F,
    conn: &dyn Protocol,
    request: ConfigureRequest,
) -> Result<()> {
    let offset = frame.offset();
    let current = frame.geometry();
    let mut parent = merge(current, request.flags, request.geometry);

    let mut client_width = offset.client_width(parent.width);
    let mut client_height = offset.client_height(parent.height);
    if !request.ignore_hints {
        if request.flags.contains(ConfigureFlags::WIDTH) {
            client_width = frame.validate_width(client_width);
        }
        if request.flags.contains(ConfigureFlags::HEIGHT) {
            client_height = frame.validate_height(client_height);
        }
    }
    // The record must match what the server applies to its 16-bit fields
    let max_width = MAX_EXTENT.saturating_sub(offset.margin_width).max(1);
    let max_height = MAX_EXTENT.saturating_sub(offset.margin_height).max(1);
    parent.x = parent.x.clamp(MIN_COORD, MAX_COORD);
    parent.y = parent.y.clamp(MIN_COORD, MAX_COORD);
    parent.width = client_width.clamp(1, max_width) + offset.margin_width;
    parent.height = client_height.clamp(1, max_height) + offset.margin_height;
    let client = offset.to_client(parent);

    let core = frame.core();
    let previous = core.client_geometry();
    let shifted = offset != core.applied;
    let resized = client.width != previous.width || client.height != previous.height;
    let parent_window = core.parent.window();
    let client_window = core.client.window;

    let mut flags = ConfigureFlags::empty();
    flags.set(ConfigureFlags::X, parent.x != current.x);
    flags.set(ConfigureFlags::Y, parent.y != current.y);
    flags.set(ConfigureFlags::WIDTH, parent.width != current.width);
    flags.set(ConfigureFlags::HEIGHT, parent.height != current.height);
    flags.set(
        ConfigureFlags::SIBLING,
        request.flags.contains(ConfigureFlags::SIBLING) && request.sibling.is_some(),
    );
    flags.set(
        ConfigureFlags::STACK_MODE,
        request.flags.contains(ConfigureFlags::STACK_MODE) && request.stack_mode.is_some(),
    );

    if !flags.is_empty() {
        conn.configure(
            parent_window,
            flags,
            parent,
            request.sibling,
            request.stack_mode,
        )?;
    }
    if resized || shifted {
        conn.configure(
            client_window,
            ConfigureFlags::GEOMETRY,
            Geometry::new(
                offset.left as i32,
                offset.top as i32,
                client.width,
                client.height,
            ),
            None,
            None,
        )?;
    }
    for piece in frame.pieces_mut() {
        piece.layout_to(conn, parent.width, parent.height)?;
    }
    if shifted {
        conn.set_frame_extents(client_window, offset)?;
    }

    let core = frame.core_mut();
    core.geometry = parent;
    core.applied = offset;
    debug!(
        "Configured frame 0x{:x}: parent={:?} client={:?} (flags={:?})",
        parent_window, parent, client, flags
    );

    if !resized {
        conn.send_configure_notify(client_window, client)?;
    }
    Ok(())
}

/// Re-apply the client's current size, re-deriving everything else
pub fn frame_reset<F: Frame + ?Sized>(frame: &mut F, conn: &dyn Protocol) -> Result<()> {
    let geometry = frame.client_geometry();
    frame_moveresize(frame, conn, ConfigureFlags::SIZE, geometry, false)
}

/// Client-relative move/resize without any stacking change
pub fn frame_moveresize<F: Frame + ?Sized>(
    frame: &mut F,
    conn: &dyn Protocol,
    flags: ConfigureFlags,
    geometry: Geometry,
    ignore_hints: bool,
) -> Result<()> {
    let mut request = ConfigureRequest::new(flags, geometry);
    request.ignore_hints = ignore_hints;
    configure_client(frame, conn, request)
}

/// Build a frame of `style` around a client currently at `client_geometry`
pub fn new_frame(
    style: FrameStyle,
    conn: &dyn Protocol,
    client: FrameClient,
    client_geometry: Geometry,
    theme: &FramesConfig,
) -> Result<Box<dyn Frame>> {
    Ok(match style {
        FrameStyle::Slim => Box::new(SlimFrame::new(conn, client, client_geometry, &theme.slim)?),
        FrameStyle::Full => Box::new(FullFrame::new(conn, client, client_geometry, &theme.full)?),
    })
}

/// Replace a frame with one of another style around the same client.
///
/// The client rectangle and the activation state carry over.
pub fn switch_style(
    mut frame: Box<dyn Frame>,
    style: FrameStyle,
    conn: &dyn Protocol,
    theme: &FramesConfig,
) -> Result<Box<dyn Frame>> {
    let client = frame.client().clone();
    let geometry = frame.client_geometry();
    let state = frame.state();
    debug!(
        "Switching 0x{:x} from {:?} to {:?}",
        client.window,
        frame.style(),
        style
    );

    frame.off(conn)?;
    frame.destroy(conn, Teardown::KeepClient)?;

    let mut next = new_frame(style, conn, client, geometry, theme)?;
    next.core_mut().state = state;
    next.on(conn)?;
    next.map(conn)?;
    Ok(next)
}

/// Destroy pieces before their parent, attempting every release
fn destroy_parts(
    conn: &dyn Protocol,
    core: FrameCore,
    pieces: Vec<FramePiece>,
    teardown: Teardown,
) -> Result<()> {
    let mut result = Ok(());
    for piece in pieces {
        result = result.and(piece.destroy(conn));
    }
    result.and(core.destroy(conn, teardown))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::{FullTheme, SlimTheme};

    pub const CLIENT: Window = 0x42;

    pub fn frame_client(hints: SizeHints) -> FrameClient {
        FrameClient {
            window: CLIENT,
            hints,
        }
    }

    pub fn slim_theme(border_size: u32) -> SlimTheme {
        SlimTheme {
            border_size,
            active_color: 0x00aa00,
            inactive_color: 0x555555,
        }
    }

    pub fn full_theme() -> FullTheme {
        FullTheme {
            border_size: 2,
            titlebar_height: 20,
            button_size: 12,
            button_padding: 4,
            ..FullTheme::default()
        }
    }

    pub fn themes() -> FramesConfig {
        FramesConfig {
            default_style: FrameStyle::Full,
            slim: slim_theme(2),
            full: full_theme(),
        }
    }
}
