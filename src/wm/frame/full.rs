//! Full frame: four borders, a titlebar and close/maximize buttons
//!
//! Pieces are laid out from the theme and the current border width, which
//! drops to zero while maximized so the offset collapses to the titlebar.

use anyhow::Result;
use tracing::debug;

use super::piece::{Anchor, Extent, PieceLayout};
use super::{
    Frame, FrameClient, FrameCore, FramePiece, FrameStyle, PieceKind, Teardown, destroy_parts,
    frame_reset,
};
use crate::config::FullTheme;
use crate::shared::{ClientOffset, Geometry};
use crate::wm::protocol::Protocol;

const KINDS: [PieceKind; 7] = [
    PieceKind::BorderTop,
    PieceKind::BorderBottom,
    PieceKind::BorderLeft,
    PieceKind::BorderRight,
    PieceKind::Titlebar,
    PieceKind::CloseButton,
    PieceKind::MaximizeButton,
];

fn layout(kind: PieceKind, theme: &FullTheme, border: u32) -> PieceLayout {
    let b = border as i32;
    let button_slot = (theme.button_size + theme.button_padding) as i32;
    let button_y = b + theme.titlebar_height.saturating_sub(theme.button_size) as i32 / 2;
    let button = |slots: i32| PieceLayout {
        x: Anchor::End(b + button_slot * slots),
        y: Anchor::Start(button_y),
        width: Extent::Fixed(theme.button_size),
        height: Extent::Fixed(theme.button_size),
    };

    match kind {
        PieceKind::BorderTop => PieceLayout {
            x: Anchor::Start(0),
            y: Anchor::Start(0),
            width: Extent::Fill(0),
            height: Extent::Fixed(border),
        },
        PieceKind::BorderBottom => PieceLayout {
            x: Anchor::Start(0),
            y: Anchor::End(b),
            width: Extent::Fill(0),
            height: Extent::Fixed(border),
        },
        PieceKind::BorderLeft => PieceLayout {
            x: Anchor::Start(0),
            y: Anchor::Start(b),
            width: Extent::Fixed(border),
            height: Extent::Fill(2 * border),
        },
        PieceKind::BorderRight => PieceLayout {
            x: Anchor::End(b),
            y: Anchor::Start(b),
            width: Extent::Fixed(border),
            height: Extent::Fill(2 * border),
        },
        PieceKind::Titlebar => PieceLayout {
            x: Anchor::Start(b),
            y: Anchor::Start(b),
            width: Extent::Fill(2 * border),
            height: Extent::Fixed(theme.titlebar_height),
        },
        PieceKind::CloseButton => button(1),
        PieceKind::MaximizeButton => button(2),
    }
}

fn colors(kind: PieceKind, theme: &FullTheme) -> (u32, u32) {
    match kind {
        PieceKind::Titlebar => (theme.active_titlebar, theme.inactive_titlebar),
        PieceKind::CloseButton => (theme.close_button, theme.inactive_button),
        PieceKind::MaximizeButton => (theme.maximize_button, theme.inactive_button),
        _ => (theme.active_border, theme.inactive_border),
    }
}

pub struct FullFrame {
    core: FrameCore,
    pieces: Vec<FramePiece>,
    theme: FullTheme,
    maximized: bool,
    visible: bool,
}

impl FullFrame {
    pub fn new(
        conn: &dyn Protocol,
        client: FrameClient,
        client_geometry: Geometry,
        theme: &FullTheme,
    ) -> Result<Self> {
        let offset = Self::offset_for(theme, theme.border_size);
        let core = FrameCore::new(conn, client, client_geometry, offset)?;
        let parent = core.parent().window();
        let size = (core.geometry().width, core.geometry().height);

        let mut pieces = Vec::with_capacity(KINDS.len());
        for kind in KINDS {
            let layout = layout(kind, theme, theme.border_size);
            match FramePiece::new(conn, parent, size, kind, layout, colors(kind, theme)) {
                Ok(piece) => pieces.push(piece),
                Err(e) => {
                    let _ = destroy_parts(conn, core, pieces, Teardown::KeepClient);
                    return Err(e);
                }
            }
        }

        Ok(Self {
            core,
            pieces,
            theme: theme.clone(),
            maximized: false,
            visible: false,
        })
    }

    fn offset_for(theme: &FullTheme, border: u32) -> ClientOffset {
        ClientOffset::from_margins(border, border, border + theme.titlebar_height, border)
    }

    fn border(&self) -> u32 {
        if self.maximized { 0 } else { self.theme.border_size }
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized
    }

    fn relayout(&mut self) {
        let border = self.border();
        for piece in &mut self.pieces {
            piece.set_layout(layout(piece.kind(), &self.theme, border));
        }
    }

    fn map_pieces(&self, conn: &dyn Protocol) -> Result<()> {
        for piece in &self.pieces {
            if !(self.maximized && piece.kind().is_border()) {
                piece.map(conn)?;
            }
        }
        Ok(())
    }
}

impl Frame for FullFrame {
    fn core(&self) -> &FrameCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FrameCore {
        &mut self.core
    }

    fn style(&self) -> FrameStyle {
        FrameStyle::Full
    }

    fn offset(&self) -> ClientOffset {
        Self::offset_for(&self.theme, self.border())
    }

    fn pieces(&self) -> &[FramePiece] {
        &self.pieces
    }

    fn pieces_mut(&mut self) -> &mut [FramePiece] {
        &mut self.pieces
    }

    fn on(&mut self, conn: &dyn Protocol) -> Result<()> {
        self.visible = true;
        self.map_pieces(conn)?;
        frame_reset(self, conn)?;
        self.repaint(conn)
    }

    fn off(&mut self, conn: &dyn Protocol) -> Result<()> {
        self.visible = false;
        for piece in &self.pieces {
            piece.unmap(conn)?;
        }
        Ok(())
    }

    fn active(&mut self, conn: &dyn Protocol) -> Result<()> {
        for piece in &self.pieces {
            piece.active(conn)?;
        }
        Ok(())
    }

    fn inactive(&mut self, conn: &dyn Protocol) -> Result<()> {
        for piece in &self.pieces {
            piece.inactive(conn)?;
        }
        Ok(())
    }

    fn maximize(&mut self, conn: &dyn Protocol) -> Result<()> {
        if self.maximized {
            return Ok(());
        }
        debug!("Hiding borders of 0x{:x}", self.core.client().window);
        self.maximized = true;
        for piece in self.pieces.iter().filter(|piece| piece.kind().is_border()) {
            piece.unmap(conn)?;
        }
        self.relayout();
        frame_reset(self, conn)
    }

    fn unmaximize(&mut self, conn: &dyn Protocol) -> Result<()> {
        if !self.maximized {
            return Ok(());
        }
        debug!("Restoring borders of 0x{:x}", self.core.client().window);
        self.maximized = false;
        self.relayout();
        frame_reset(self, conn)?;
        if self.visible {
            for piece in self.pieces.iter().filter(|piece| piece.kind().is_border()) {
                piece.map(conn)?;
            }
        }
        Ok(())
    }

    fn destroy(self: Box<Self>, conn: &dyn Protocol, teardown: Teardown) -> Result<()> {
        let this = *self;
        destroy_parts(conn, this.core, this.pieces, teardown)
    }
}
