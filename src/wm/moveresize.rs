//! MoveResize Module
//!
//! Pointer-driven move and resize. A frame holds at most one `Interaction`;
//! `Begin` only succeeds from `Idle`, `Step` is ignored in any other state,
//! and `End` always returns to `Idle`.

use anyhow::Result;
use bitflags::bitflags;
use tracing::debug;

use crate::shared::Geometry;
use crate::wm::frame::{ConfigureRequest, Frame};
use crate::wm::protocol::{ConfigureFlags, Protocol};

/// In-progress pointer operation of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Moving(MoveState),
    Resizing(ResizeState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveState {
    /// Last pointer position seen, root coordinates
    pub last_root_x: i32,
    pub last_root_y: i32,
    /// Parent geometry when the move began
    pub start: Geometry,
}

bitflags! {
    /// Edges a resize drag affects
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResizeEdges: u8 {
        /// The left edge moves; x follows the width change
        const LEFT   = 1 << 0;
        /// The top edge moves; y follows the height change
        const TOP    = 1 << 1;
        const WIDTH  = 1 << 2;
        const HEIGHT = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeState {
    /// Pointer position when the resize began
    pub root_x: i32,
    pub root_y: i32,
    /// Parent geometry when the resize began
    pub anchor: Geometry,
    pub edges: ResizeEdges,
}

/// Resize direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeDirection {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeDirection {
    pub fn edges(self) -> ResizeEdges {
        match self {
            Self::TopLeft => ResizeEdges::all(),
            Self::Top => ResizeEdges::TOP | ResizeEdges::HEIGHT,
            Self::TopRight => ResizeEdges::TOP | ResizeEdges::WIDTH | ResizeEdges::HEIGHT,
            Self::Right => ResizeEdges::WIDTH,
            Self::BottomRight => ResizeEdges::WIDTH | ResizeEdges::HEIGHT,
            Self::Bottom => ResizeEdges::HEIGHT,
            Self::BottomLeft => ResizeEdges::LEFT | ResizeEdges::WIDTH | ResizeEdges::HEIGHT,
            Self::Left => ResizeEdges::LEFT | ResizeEdges::WIDTH,
        }
    }

    /// `_NET_WM_MOVERESIZE_SIZE_*` direction codes 0-7
    pub fn from_ewmh(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::TopLeft),
            1 => Some(Self::Top),
            2 => Some(Self::TopRight),
            3 => Some(Self::Right),
            4 => Some(Self::BottomRight),
            5 => Some(Self::Bottom),
            6 => Some(Self::BottomLeft),
            7 => Some(Self::Left),
            _ => None,
        }
    }

    /// Pick the direction from where the pointer sits in a 3x3 grid over `geometry`
    pub fn infer(geometry: Geometry, root_x: i32, root_y: i32) -> Self {
        let column = third(root_x - geometry.x, geometry.width);
        let row = third(root_y - geometry.y, geometry.height);
        match (column, row) {
            (0, 0) => Self::TopLeft,
            (1, 0) => Self::Top,
            (2, 0) => Self::TopRight,
            (0, 1) => Self::Left,
            (2, 1) => Self::Right,
            (0, 2) => Self::BottomLeft,
            (1, 2) => Self::Bottom,
            // the center grows toward the bottom-right too
            _ => Self::BottomRight,
        }
    }
}

fn third(offset: i32, size: u32) -> u8 {
    let size = size.max(1) as i64;
    let offset = offset as i64;
    if offset < size / 3 {
        0
    } else if offset < size * 2 / 3 {
        1
    } else {
        2
    }
}

fn is_idle<F: Frame + ?Sized>(frame: &F) -> bool {
    matches!(frame.core().interaction(), Interaction::Idle)
}

/// Start moving; returns false when another operation is in progress
pub fn move_begin<F: Frame + ?Sized>(
    frame: &mut F,
    conn: &dyn Protocol,
    root_x: i32,
    root_y: i32,
) -> Result<bool> {
    if !is_idle(frame) {
        return Ok(false);
    }
    conn.grab_pointer()?;

    let start = frame.geometry();
    frame.core_mut().set_interaction(Interaction::Moving(MoveState {
        last_root_x: root_x,
        last_root_y: root_y,
        start,
    }));
    debug!("Move begin 0x{:x} at ({}, {})", frame.client().window, root_x, root_y);
    Ok(true)
}

/// Apply the pointer delta since the previous report
pub fn move_step<F: Frame + ?Sized>(
    frame: &mut F,
    conn: &dyn Protocol,
    root_x: i32,
    root_y: i32,
) -> Result<()> {
    let Interaction::Moving(state) = *frame.core().interaction() else {
        return Ok(());
    };
    let (dx, dy) = (root_x - state.last_root_x, root_y - state.last_root_y);
    if dx == 0 && dy == 0 {
        return Ok(());
    }

    let geometry = frame.geometry();
    frame.configure_frame(
        conn,
        ConfigureRequest::new(
            ConfigureFlags::POSITION,
            Geometry::new(geometry.x + dx, geometry.y + dy, 0, 0),
        ),
    )?;

    frame.core_mut().set_interaction(Interaction::Moving(MoveState {
        last_root_x: root_x,
        last_root_y: root_y,
        ..state
    }));
    Ok(())
}

pub fn move_end<F: Frame + ?Sized>(frame: &mut F, conn: &dyn Protocol) -> Result<()> {
    if frame.moving() {
        end(frame, conn)?;
    }
    Ok(())
}

/// Abort a move and put the frame back where it started
pub fn move_cancel<F: Frame + ?Sized>(frame: &mut F, conn: &dyn Protocol) -> Result<()> {
    let Interaction::Moving(state) = *frame.core().interaction() else {
        return Ok(());
    };
    end(frame, conn)?;
    frame.configure_frame(
        conn,
        ConfigureRequest::new(ConfigureFlags::POSITION, state.start),
    )
}

/// Start resizing the edges of `direction`; returns false when busy
pub fn resize_begin<F: Frame + ?Sized>(
    frame: &mut F,
    conn: &dyn Protocol,
    direction: ResizeDirection,
    root_x: i32,
    root_y: i32,
) -> Result<bool> {
    if !is_idle(frame) {
        return Ok(false);
    }
    conn.grab_pointer()?;

    let anchor = frame.geometry();
    frame.core_mut().set_interaction(Interaction::Resizing(ResizeState {
        root_x,
        root_y,
        anchor,
        edges: direction.edges(),
    }));
    debug!(
        "Resize begin 0x{:x} {:?} at ({}, {})",
        frame.client().window,
        direction,
        root_x,
        root_y
    );
    Ok(true)
}

/// Resize from the anchor rectangle by the pointer delta since `resize_begin`.
///
/// Sizes go through the client's hints and never drop below one pixel of
/// client area; a moving left/top edge keeps the opposite edge fixed.
pub fn resize_step<F: Frame + ?Sized>(
    frame: &mut F,
    conn: &dyn Protocol,
    root_x: i32,
    root_y: i32,
) -> Result<()> {
    let Interaction::Resizing(state) = *frame.core().interaction() else {
        return Ok(());
    };
    let (dx, dy) = (
        (root_x - state.root_x) as i64,
        (root_y - state.root_y) as i64,
    );
    let anchor = state.anchor;
    let offset = frame.offset();
    let mut target = anchor;

    if state.edges.contains(ResizeEdges::WIDTH) {
        let dx = if state.edges.contains(ResizeEdges::LEFT) { -dx } else { dx };
        let client = (anchor.width as i64 + dx - offset.margin_width as i64).max(1);
        target.width = frame.validate_width(client as u32) + offset.margin_width;
        if state.edges.contains(ResizeEdges::LEFT) {
            target.x = anchor.right() - target.width as i32;
        }
    }
    if state.edges.contains(ResizeEdges::HEIGHT) {
        let dy = if state.edges.contains(ResizeEdges::TOP) { -dy } else { dy };
        let client = (anchor.height as i64 + dy - offset.margin_height as i64).max(1);
        target.height = frame.validate_height(client as u32) + offset.margin_height;
        if state.edges.contains(ResizeEdges::TOP) {
            target.y = anchor.bottom() - target.height as i32;
        }
    }

    let current = frame.geometry();
    let mut flags = ConfigureFlags::empty();
    flags.set(ConfigureFlags::X, target.x != current.x);
    flags.set(ConfigureFlags::Y, target.y != current.y);
    flags.set(ConfigureFlags::WIDTH, target.width != current.width);
    flags.set(ConfigureFlags::HEIGHT, target.height != current.height);
    if flags.is_empty() {
        return Ok(());
    }

    // sizes were validated above
    frame.configure_frame(conn, ConfigureRequest::new(flags, target).ignore_hints())
}

pub fn resize_end<F: Frame + ?Sized>(frame: &mut F, conn: &dyn Protocol) -> Result<()> {
    if frame.resizing() {
        end(frame, conn)?;
    }
    Ok(())
}

/// Abandon whatever operation is in progress
pub fn end<F: Frame + ?Sized>(frame: &mut F, conn: &dyn Protocol) -> Result<()> {
    if is_idle(frame) {
        return Ok(());
    }
    frame.core_mut().set_interaction(Interaction::Idle);
    debug!("Interaction end 0x{:x}", frame.client().window);
    conn.ungrab_pointer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::frame::SlimFrame;
    use crate::wm::frame::test_support::*;
    use crate::wm::hints::{SizeHints, SizeHintsFlags};
    use crate::wm::protocol::testing::{Recorder, Request};

    fn slim(conn: &Recorder, hints: SizeHints) -> SlimFrame {
        SlimFrame::new(conn, frame_client(hints), Geometry::new(10, 10, 100, 50), &slim_theme(2))
            .unwrap()
    }

    #[test]
    fn test_move_follows_deltas() {
        let conn = Recorder::new();
        let mut frame = slim(&conn, SizeHints::default());

        assert!(move_begin(&mut frame, &conn, 500, 500).unwrap());
        assert!(frame.moving());
        move_step(&mut frame, &conn, 510, 495).unwrap();
        move_step(&mut frame, &conn, 515, 495).unwrap();

        assert_eq!(frame.geometry(), Geometry::new(23, 3, 104, 54));
        assert_eq!(frame.client_geometry(), Geometry::new(25, 5, 100, 50));

        move_end(&mut frame, &conn).unwrap();
        assert!(!frame.moving());
        assert_eq!(conn.requests().last(), Some(&Request::UngrabPointer));
    }

    #[test]
    fn test_move_cancel_restores_start() {
        let conn = Recorder::new();
        let mut frame = slim(&conn, SizeHints::default());
        let before = frame.geometry();

        move_begin(&mut frame, &conn, 500, 500).unwrap();
        move_step(&mut frame, &conn, 540, 520).unwrap();
        assert_ne!(frame.geometry(), before);

        move_cancel(&mut frame, &conn).unwrap();
        assert!(!frame.moving());
        assert_eq!(frame.geometry(), before);
        assert!(conn.requests().contains(&Request::UngrabPointer));
    }

    #[test]
    fn test_step_outside_operation_is_ignored() {
        let conn = Recorder::new();
        let mut frame = slim(&conn, SizeHints::default());
        let before = frame.geometry();
        conn.clear_requests();

        move_step(&mut frame, &conn, 100, 100).unwrap();
        resize_step(&mut frame, &conn, 100, 100).unwrap();
        assert!(conn.requests().is_empty());

        move_begin(&mut frame, &conn, 0, 0).unwrap();
        move_end(&mut frame, &conn).unwrap();
        move_step(&mut frame, &conn, 40, 40).unwrap();
        assert_eq!(frame.geometry(), before);
    }

    #[test]
    fn test_begin_while_busy_is_a_noop() {
        let conn = Recorder::new();
        let mut frame = slim(&conn, SizeHints::default());

        assert!(move_begin(&mut frame, &conn, 0, 0).unwrap());
        let state = *frame.core().interaction();
        assert!(!move_begin(&mut frame, &conn, 50, 50).unwrap());
        assert!(!resize_begin(&mut frame, &conn, ResizeDirection::Left, 50, 50).unwrap());

        assert_eq!(*frame.core().interaction(), state);
        assert!(frame.moving() && !frame.resizing());
        // resize_end does not end a move
        resize_end(&mut frame, &conn).unwrap();
        assert!(frame.moving());
    }

    #[test]
    fn test_resize_bottom_right() {
        let conn = Recorder::new();
        let mut frame = slim(&conn, SizeHints::default());

        resize_begin(&mut frame, &conn, ResizeDirection::BottomRight, 200, 200).unwrap();
        conn.clear_requests();
        resize_step(&mut frame, &conn, 220, 215).unwrap();

        assert_eq!(frame.client_geometry(), Geometry::new(10, 10, 120, 65));
        assert_eq!(
            conn.configures(frame.parent_window()),
            vec![(ConfigureFlags::SIZE, Geometry::new(8, 8, 124, 69))]
        );

        resize_step(&mut frame, &conn, 0, 215).unwrap();
        assert_eq!(frame.client_geometry().width, 1);
        assert_eq!(frame.client_geometry().x, 10);
    }

    #[test]
    fn test_resize_left_keeps_right_edge() {
        let conn = Recorder::new();
        let mut frame = slim(&conn, SizeHints::default());
        let right = frame.geometry().right();

        resize_begin(&mut frame, &conn, ResizeDirection::Left, 8, 30).unwrap();
        resize_step(&mut frame, &conn, 18, 30).unwrap();
        assert_eq!(frame.client_geometry().width, 90);
        assert_eq!(frame.geometry().right(), right);

        // dragging far past the right edge collapses to one pixel, not an inversion
        resize_step(&mut frame, &conn, 1000, 30).unwrap();
        assert_eq!(frame.client_geometry().width, 1);
        assert_eq!(frame.geometry().right(), right);
        assert_eq!(frame.geometry().x, right - 5);
    }

    #[test]
    fn test_resize_respects_hints() {
        let conn = Recorder::new();
        let hints = SizeHints {
            flags: SizeHintsFlags::P_MIN_SIZE | SizeHintsFlags::P_RESIZE_INC,
            min_width: 50,
            min_height: 20,
            width_inc: 10,
            height_inc: 10,
            ..SizeHints::default()
        };
        let mut frame = slim(&conn, hints);

        resize_begin(&mut frame, &conn, ResizeDirection::Right, 0, 0).unwrap();
        resize_step(&mut frame, &conn, 7, 0).unwrap();
        // 107 snaps down to 100 (min 50 + 5 * 10)
        assert_eq!(frame.client_geometry().width, 100);
        resize_step(&mut frame, &conn, -90, 0).unwrap();
        assert_eq!(frame.client_geometry().width, 50);
    }

    #[test]
    fn test_directions() {
        assert_eq!(ResizeDirection::from_ewmh(4), Some(ResizeDirection::BottomRight));
        assert_eq!(ResizeDirection::from_ewmh(8), None);

        let area = Geometry::new(0, 0, 300, 300);
        assert_eq!(ResizeDirection::infer(area, 10, 10), ResizeDirection::TopLeft);
        assert_eq!(ResizeDirection::infer(area, 150, 290), ResizeDirection::Bottom);
        assert_eq!(ResizeDirection::infer(area, 290, 150), ResizeDirection::Right);
        assert_eq!(ResizeDirection::infer(area, 150, 150), ResizeDirection::BottomRight);

        assert!(ResizeDirection::TopLeft.edges().contains(ResizeEdges::LEFT | ResizeEdges::TOP));
        assert!(!ResizeDirection::Bottom.edges().contains(ResizeEdges::WIDTH));
    }
}
