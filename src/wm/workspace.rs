//! Workspace Module
//!
//! The active workspace rectangle. Fractional command arguments and
//! maximization are measured against it.

use crate::shared::Geometry;

pub struct WorkspaceManager {
    geometry: Geometry,
}

impl WorkspaceManager {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    /// Shift `frame` so its top-left corner is inside the workspace
    pub fn keep_origin_visible(&self, frame: Geometry) -> Geometry {
        let max_x = (self.geometry.right() - 1).max(self.geometry.x);
        let max_y = (self.geometry.bottom() - 1).max(self.geometry.y);
        Geometry {
            x: frame.x.clamp(self.geometry.x, max_x),
            y: frame.y.clamp(self.geometry.y, max_y),
            ..frame
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_origin_visible() {
        let workspace = WorkspaceManager::new(Geometry::new(0, 0, 1000, 800));
        assert_eq!(
            workspace.keep_origin_visible(Geometry::new(-2, -22, 100, 100)),
            Geometry::new(0, 0, 100, 100)
        );
        assert_eq!(
            workspace.keep_origin_visible(Geometry::new(50, 60, 100, 100)),
            Geometry::new(50, 60, 100, 100)
        );
        assert_eq!(workspace.keep_origin_visible(Geometry::new(2000, 10, 5, 5)).x, 999);
    }
}
