//! Hints Module
//!
//! ICCCM `WM_NORMAL_HINTS` reading and size constraint application.

use anyhow::Result;
use bitflags::bitflags;
use tracing::debug;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

bitflags! {
    /// `WM_SIZE_HINTS.flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SizeHintsFlags: u32 {
        const US_POSITION  = 1 << 0;
        const US_SIZE      = 1 << 1;
        const P_POSITION   = 1 << 2;
        const P_SIZE       = 1 << 3;
        const P_MIN_SIZE   = 1 << 4;
        const P_MAX_SIZE   = 1 << 5;
        const P_RESIZE_INC = 1 << 6;
        const P_ASPECT     = 1 << 7;
        const P_BASE_SIZE  = 1 << 8;
        const P_WIN_GRAVITY = 1 << 9;
    }
}

/// Size constraints declared by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeHints {
    pub flags: SizeHintsFlags,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
    pub base_width: u32,
    pub base_height: u32,
}

impl SizeHints {
    /// Read `WM_NORMAL_HINTS`; a missing or short property means no constraints
    pub fn read(conn: &RustConnection, window: Window) -> Result<Self> {
        let reply = conn
            .get_property(
                false,
                window,
                AtomEnum::WM_NORMAL_HINTS,
                AtomEnum::WM_SIZE_HINTS,
                0,
                18, // XSizeHints has 18 32-bit values
            )?
            .reply()?;

        let hints = match reply.value32() {
            Some(values) => Self::from_values(&values.collect::<Vec<_>>()),
            None => Self::default(),
        };
        debug!("Size hints for 0x{:x}: {:?}", window, hints);
        Ok(hints)
    }

    /// Decode the raw property words
    pub fn from_values(values: &[u32]) -> Self {
        if values.len() < 17 {
            return Self::default();
        }
        Self {
            flags: SizeHintsFlags::from_bits_truncate(values[0]),
            min_width: values[5],
            min_height: values[6],
            max_width: values[7],
            max_height: values[8],
            width_inc: values[9],
            height_inc: values[10],
            base_width: values[15],
            base_height: values[16],
        }
    }

    /// Nearest legal client width
    pub fn constrain_width(&self, width: u32) -> u32 {
        let (min, base) = self.min_and_base(self.min_width, self.base_width);
        let max = self
            .flags
            .contains(SizeHintsFlags::P_MAX_SIZE)
            .then_some(self.max_width)
            .filter(|max| *max > 0);
        constrain(width, min, max, base, self.increment(self.width_inc))
    }

    /// Nearest legal client height
    pub fn constrain_height(&self, height: u32) -> u32 {
        let (min, base) = self.min_and_base(self.min_height, self.base_height);
        let max = self
            .flags
            .contains(SizeHintsFlags::P_MAX_SIZE)
            .then_some(self.max_height)
            .filter(|max| *max > 0);
        constrain(height, min, max, base, self.increment(self.height_inc))
    }

    // ICCCM 4.1.2.3: base falls back to min and min falls back to base
    fn min_and_base(&self, min: u32, base: u32) -> (u32, u32) {
        let has_min = self.flags.contains(SizeHintsFlags::P_MIN_SIZE);
        let has_base = self.flags.contains(SizeHintsFlags::P_BASE_SIZE);
        match (has_min, has_base) {
            (true, true) => (min, base),
            (true, false) => (min, min),
            (false, true) => (base, base),
            (false, false) => (0, 0),
        }
    }

    fn increment(&self, inc: u32) -> u32 {
        if self.flags.contains(SizeHintsFlags::P_RESIZE_INC) {
            inc
        } else {
            0
        }
    }
}

fn constrain(value: u32, min: u32, max: Option<u32>, base: u32, inc: u32) -> u32 {
    let min = min.max(1);
    let mut value = value.max(min);
    if let Some(max) = max {
        value = value.min(max.max(min));
    }

    if inc > 1 && value > base {
        value = base + (value - base) / inc * inc;
        if value < min {
            value += (min - value).div_ceil(inc) * inc;
        }
    }

    value.max(1)
}
