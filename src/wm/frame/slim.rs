//! Slim frame: a uniform border painted with the parent's background pixel

use anyhow::Result;

use super::{
    Frame, FrameClient, FrameCore, FramePiece, FrameStyle, Teardown, destroy_parts, frame_reset,
};
use crate::config::SlimTheme;
use crate::shared::{ClientOffset, Geometry};
use crate::wm::protocol::Protocol;

pub struct SlimFrame {
    core: FrameCore,
    offset: ClientOffset,
    active_color: u32,
    inactive_color: u32,
}

impl SlimFrame {
    pub fn new(
        conn: &dyn Protocol,
        client: FrameClient,
        client_geometry: Geometry,
        theme: &SlimTheme,
    ) -> Result<Self> {
        let offset = ClientOffset::uniform(theme.border_size);
        let core = FrameCore::new(conn, client, client_geometry, offset)?;
        Ok(Self {
            core,
            offset,
            active_color: theme.active_color,
            inactive_color: theme.inactive_color,
        })
    }

    fn paint(&self, conn: &dyn Protocol, color: u32) -> Result<()> {
        let parent = self.core.parent().window();
        conn.set_background_pixel(parent, color)?;
        conn.clear(parent)
    }
}

impl Frame for SlimFrame {
    fn core(&self) -> &FrameCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FrameCore {
        &mut self.core
    }

    fn style(&self) -> FrameStyle {
        FrameStyle::Slim
    }

    fn offset(&self) -> ClientOffset {
        self.offset
    }

    fn pieces(&self) -> &[FramePiece] {
        &[]
    }

    fn pieces_mut(&mut self) -> &mut [FramePiece] {
        &mut []
    }

    fn on(&mut self, conn: &dyn Protocol) -> Result<()> {
        frame_reset(self, conn)?;
        self.repaint(conn)
    }

    fn off(&mut self, _conn: &dyn Protocol) -> Result<()> {
        Ok(())
    }

    fn active(&mut self, conn: &dyn Protocol) -> Result<()> {
        self.paint(conn, self.active_color)
    }

    fn inactive(&mut self, conn: &dyn Protocol) -> Result<()> {
        self.paint(conn, self.inactive_color)
    }

    fn maximize(&mut self, _conn: &dyn Protocol) -> Result<()> {
        Ok(())
    }

    fn unmaximize(&mut self, _conn: &dyn Protocol) -> Result<()> {
        Ok(())
    }

    fn destroy(self: Box<Self>, conn: &dyn Protocol, teardown: Teardown) -> Result<()> {
        destroy_parts(conn, self.core, Vec::new(), teardown)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::wm::frame::FrameState;
    use crate::wm::hints::SizeHints;
    use crate::wm::protocol::testing::{Recorder, Request};

    #[test]
    fn test_margins_are_uniform() {
        let conn = Recorder::new();
        let frame = SlimFrame::new(
            &conn,
            frame_client(SizeHints::default()),
            Geometry::new(10, 10, 100, 50),
            &slim_theme(3),
        )
        .unwrap();

        assert_eq!((frame.top(), frame.bottom(), frame.left(), frame.right()), (3, 3, 3, 3));
        assert_eq!(frame.geometry(), Geometry::new(7, 7, 106, 56));
        assert!(frame.pieces().is_empty());
    }

    #[test]
    fn test_activation_paints_background_pixel() {
        let conn = Recorder::new();
        let theme = slim_theme(2);
        let mut frame = SlimFrame::new(
            &conn,
            frame_client(SizeHints::default()),
            Geometry::new(0, 0, 10, 10),
            &theme,
        )
        .unwrap();
        let parent = frame.parent_window();
        conn.clear_requests();

        frame.state_active(&conn).unwrap();
        assert_eq!(frame.state(), FrameState::Active);
        assert_eq!(
            conn.requests(),
            vec![
                Request::BackgroundPixel(parent, theme.active_color),
                Request::Clear(parent),
            ]
        );

        conn.clear_requests();
        frame.state_inactive(&conn).unwrap();
        assert_eq!(
            conn.requests()[0],
            Request::BackgroundPixel(parent, theme.inactive_color)
        );
    }

    #[test]
    fn test_toggles_leave_geometry_alone() {
        let conn = Recorder::new();
        let mut frame = SlimFrame::new(
            &conn,
            frame_client(SizeHints::default()),
            Geometry::new(10, 10, 100, 50),
            &slim_theme(2),
        )
        .unwrap();
        conn.clear_requests();

        frame.off(&conn).unwrap();
        frame.maximize(&conn).unwrap();
        frame.unmaximize(&conn).unwrap();

        assert!(conn.requests().is_empty());
        assert_eq!(frame.client_geometry(), Geometry::new(10, 10, 100, 50));
    }
}
