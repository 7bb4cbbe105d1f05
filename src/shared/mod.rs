//! Plain geometry types shared by the frame, move/resize and command layers.

pub mod geometry;

pub use geometry::{
    ClientOffset, Geometry, MAX_COORD, MAX_EXTENT, MIN_COORD, wire_coord, wire_extent,
};
