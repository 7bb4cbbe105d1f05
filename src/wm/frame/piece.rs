//! Decoration pieces: border strips, titlebar and buttons.
//!
//! A piece owns its window and two background pixmaps (active/inactive).
//! Its placement is a `PieceLayout` resolved against the parent size, so
//! pieces are recomputed from the frame geometry instead of tracking it.

use anyhow::Result;
use x11rb::protocol::xproto::{EventMask, Pixmap, Window};

use crate::shared::Geometry;
use crate::wm::moveresize::ResizeDirection;
use crate::wm::protocol::{ConfigureFlags, Protocol};

/// What a piece is for; decides how a press on it is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    BorderTop,
    BorderBottom,
    BorderLeft,
    BorderRight,
    Titlebar,
    CloseButton,
    MaximizeButton,
}

impl PieceKind {
    pub fn is_border(&self) -> bool {
        self.resize_direction().is_some()
    }

    /// Edge a press on this piece resizes
    pub fn resize_direction(&self) -> Option<ResizeDirection> {
        match self {
            Self::BorderTop => Some(ResizeDirection::Top),
            Self::BorderBottom => Some(ResizeDirection::Bottom),
            Self::BorderLeft => Some(ResizeDirection::Left),
            Self::BorderRight => Some(ResizeDirection::Right),
            _ => None,
        }
    }
}

/// Position along one axis, measured from the start or the end edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start(i32),
    End(i32),
}

/// Size along one axis: fixed, or the parent size minus a margin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    Fixed(u32),
    Fill(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceLayout {
    pub x: Anchor,
    pub y: Anchor,
    pub width: Extent,
    pub height: Extent,
}

impl PieceLayout {
    /// Geometry relative to a parent of `width` x `height`
    pub fn resolve(&self, width: u32, height: u32) -> Geometry {
        let axis = |anchor: Anchor, size: u32| match anchor {
            Anchor::Start(offset) => offset,
            Anchor::End(offset) => size as i32 - offset,
        };
        let extent = |extent: Extent, size: u32| match extent {
            Extent::Fixed(value) => value,
            Extent::Fill(margin) => size.saturating_sub(margin),
        };
        Geometry {
            x: axis(self.x, width),
            y: axis(self.y, height),
            width: extent(self.width, width),
            height: extent(self.height, height),
        }
    }
}

pub struct FramePiece {
    kind: PieceKind,
    window: Window,
    img_active: Pixmap,
    img_inactive: Pixmap,
    layout: PieceLayout,
    geometry: Geometry,
}

impl FramePiece {
    /// Create the piece window inside `parent` along with both images
    pub fn new(
        conn: &dyn Protocol,
        parent: Window,
        parent_size: (u32, u32),
        kind: PieceKind,
        layout: PieceLayout,
        colors: (u32, u32),
    ) -> Result<Self> {
        let geometry = layout.resolve(parent_size.0, parent_size.1);
        let window = conn.create_window(
            parent,
            geometry,
            EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
        )?;

        // Solid pixmaps tile, so the initial size only needs to be non-zero
        let (width, height) = (geometry.width.max(1), geometry.height.max(1));
        let img_active = match conn.create_solid_pixmap(width, height, colors.0) {
            Ok(pixmap) => pixmap,
            Err(e) => {
                let _ = conn.destroy_window(window);
                return Err(e);
            }
        };
        let img_inactive = match conn.create_solid_pixmap(width, height, colors.1) {
            Ok(pixmap) => pixmap,
            Err(e) => {
                let _ = conn.free_pixmap(img_active);
                let _ = conn.destroy_window(window);
                return Err(e);
            }
        };

        Ok(Self {
            kind,
            window,
            img_active,
            img_inactive,
            layout,
            geometry,
        })
    }

    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Last geometry sent to the server, relative to the parent
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn set_layout(&mut self, layout: PieceLayout) {
        self.layout = layout;
    }

    pub fn active(&self, conn: &dyn Protocol) -> Result<()> {
        conn.set_background_pixmap(self.window, self.img_active)?;
        conn.clear(self.window)
    }

    pub fn inactive(&self, conn: &dyn Protocol) -> Result<()> {
        conn.set_background_pixmap(self.window, self.img_inactive)?;
        conn.clear(self.window)
    }

    pub fn map(&self, conn: &dyn Protocol) -> Result<()> {
        conn.map(self.window)
    }

    pub fn unmap(&self, conn: &dyn Protocol) -> Result<()> {
        conn.unmap(self.window)
    }

    /// Re-resolve against a parent of the given size; only changed fields are sent
    pub fn layout_to(&mut self, conn: &dyn Protocol, width: u32, height: u32) -> Result<()> {
        let target = self.layout.resolve(width, height);
        let mut flags = ConfigureFlags::empty();
        flags.set(ConfigureFlags::X, target.x != self.geometry.x);
        flags.set(ConfigureFlags::Y, target.y != self.geometry.y);
        flags.set(ConfigureFlags::WIDTH, target.width != self.geometry.width);
        flags.set(ConfigureFlags::HEIGHT, target.height != self.geometry.height);
        if flags.is_empty() {
            return Ok(());
        }

        conn.configure(self.window, flags, target, None, None)?;
        self.geometry = target;
        Ok(())
    }

    /// Destroy the window and release both images
    pub fn destroy(self, conn: &dyn Protocol) -> Result<()> {
        let window = conn.destroy_window(self.window);
        let active = conn.free_pixmap(self.img_active);
        let inactive = conn.free_pixmap(self.img_inactive);
        window.and(active).and(inactive)
    }
}
