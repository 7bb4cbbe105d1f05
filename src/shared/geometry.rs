//! Rectangles and the frame offset model
//!
//! `Geometry` is the single rectangle type used across the manager. A
//! `ClientOffset` describes how a frame's outer (parent) rectangle relates to
//! the client rectangle it hosts, and converts between the two.

/// Smallest coordinate the core protocol can carry (INT16)
pub const MIN_COORD: i32 = i16::MIN as i32;
/// Largest coordinate the core protocol can carry (INT16)
pub const MAX_COORD: i32 = i16::MAX as i32;
/// Largest width or height the core protocol can carry (CARD16)
pub const MAX_EXTENT: u32 = u16::MAX as u32;

/// Coordinate as sent on the wire, saturated to INT16
pub fn wire_coord(value: i32) -> i16 {
    value.clamp(MIN_COORD, MAX_COORD) as i16
}

/// Width or height as sent on the wire, saturated to a non-zero CARD16
pub fn wire_extent(value: u32) -> u16 {
    value.clamp(1, MAX_EXTENT) as u16
}

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// First column to the right of the rectangle
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// First row below the rectangle
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// The relative geometry of the client inside its frame parent.
///
/// `left`/`top` place the client relative to the parent's top-left corner.
/// The margins satisfy:
/// - `parent_width = client_width + margin_width`
/// - `parent_height = client_height + margin_height`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientOffset {
    pub left: u32,
    pub top: u32,
    pub margin_width: u32,
    pub margin_height: u32,
}

impl ClientOffset {
    /// No decorations at all
    pub const NONE: Self = Self {
        left: 0,
        top: 0,
        margin_width: 0,
        margin_height: 0,
    };

    /// Same border on all four sides
    pub fn uniform(border: u32) -> Self {
        Self::from_margins(border, border, border, border)
    }

    pub fn from_margins(left: u32, right: u32, top: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            margin_width: left + right,
            margin_height: top + bottom,
        }
    }

    pub fn right(&self) -> u32 {
        self.margin_width.saturating_sub(self.left)
    }

    pub fn bottom(&self) -> u32 {
        self.margin_height.saturating_sub(self.top)
    }

    /// Parent rectangle hosting a client at `client`
    pub fn to_parent(&self, client: Geometry) -> Geometry {
        Geometry {
            x: client.x.saturating_sub(self.left as i32),
            y: client.y.saturating_sub(self.top as i32),
            width: client.width.saturating_add(self.margin_width),
            height: client.height.saturating_add(self.margin_height),
        }
    }

    /// Client rectangle inside a parent at `parent`.
    ///
    /// A parent smaller than the margins yields a zero-sized client; callers
    /// clamp before configuring.
    pub fn to_client(&self, parent: Geometry) -> Geometry {
        Geometry {
            x: parent.x.saturating_add(self.left as i32),
            y: parent.y.saturating_add(self.top as i32),
            width: parent.width.saturating_sub(self.margin_width),
            height: parent.height.saturating_sub(self.margin_height),
        }
    }

    /// Client width needed for a parent `width` wide
    pub fn client_width(&self, width: u32) -> u32 {
        width.saturating_sub(self.margin_width)
    }

    pub fn client_height(&self, height: u32) -> u32 {
        height.saturating_sub(self.margin_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets() -> Vec<ClientOffset> {
        vec![
            ClientOffset::NONE,
            ClientOffset::uniform(2),
            ClientOffset::from_margins(2, 2, 26, 2),
            ClientOffset::from_margins(0, 0, 24, 0),
        ]
    }

    #[test]
    fn test_round_trip_client_to_parent() {
        let rects = [
            Geometry::new(10, 10, 100, 50),
            Geometry::new(-40, 3, 1, 1),
            Geometry::new(0, 0, 1920, 1080),
        ];
        for offset in offsets() {
            for rect in rects {
                assert_eq!(offset.to_client(offset.to_parent(rect)), rect, "{offset:?}");
            }
        }
    }

    #[test]
    fn test_round_trip_parent_to_client() {
        for offset in offsets() {
            let parent = Geometry::new(
                5,
                -7,
                offset.margin_width + 300,
                offset.margin_height + 200,
            );
            assert_eq!(offset.to_parent(offset.to_client(parent)), parent, "{offset:?}");
        }
    }

    #[test]
    fn test_uniform_border_example() {
        let offset = ClientOffset::uniform(2);
        assert_eq!(offset.margin_width, 4);
        assert_eq!(offset.margin_height, 4);
        assert_eq!(
            offset.to_client(Geometry::new(8, 8, 104, 54)),
            Geometry::new(10, 10, 100, 50)
        );
    }

    #[test]
    fn test_margins() {
        let offset = ClientOffset::from_margins(3, 5, 20, 1);
        assert_eq!(offset.left, 3);
        assert_eq!(offset.right(), 5);
        assert_eq!(offset.top, 20);
        assert_eq!(offset.bottom(), 1);
    }

    #[test]
    fn test_parent_smaller_than_margins() {
        let offset = ClientOffset::uniform(4);
        let client = offset.to_client(Geometry::new(0, 0, 3, 3));
        assert_eq!(client.width, 0);
        assert_eq!(client.height, 0);
    }

    #[test]
    fn test_to_parent_saturates() {
        let offset = ClientOffset::uniform(2);
        let parent = offset.to_parent(Geometry::new(i32::MIN, 0, u32::MAX, 10));
        assert_eq!(parent.x, i32::MIN);
        assert_eq!(parent.width, u32::MAX);
        assert_eq!(parent.height, 14);
    }

    #[test]
    fn test_wire_values_saturate() {
        assert_eq!(wire_coord(100000), i16::MAX);
        assert_eq!(wire_coord(-40000), i16::MIN);
        assert_eq!(wire_coord(-5), -5);
        assert_eq!(wire_extent(70000), u16::MAX);
        assert_eq!(wire_extent(0), 1);
    }

    #[test]
    fn test_contains() {
        let g = Geometry::new(10, 10, 5, 5);
        assert!(g.contains(10, 10));
        assert!(g.contains(14, 14));
        assert!(!g.contains(15, 10));
        assert!(!g.contains(9, 12));
    }
}
