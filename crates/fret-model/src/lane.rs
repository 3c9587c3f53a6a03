//! Lane bit layout shared by every instrument.
//!
//! Bit 0 is special: for fretted instruments it is the open note (which also
//! disables anchoring), for drums it is the kick pad.

pub const OPEN: u16 = 1 << 0;
pub const GREEN: u16 = 1 << 1;
pub const RED: u16 = 1 << 2;
pub const YELLOW: u16 = 1 << 3;
pub const BLUE: u16 = 1 << 4;
pub const ORANGE: u16 = 1 << 5;

/// All five frets (open excluded)
pub const FRETS: u16 = GREEN | RED | YELLOW | BLUE | ORANGE;

pub const KICK: u16 = 1 << 0;
pub const RED_PAD: u16 = 1 << 1;
pub const YELLOW_PAD: u16 = 1 << 2;
pub const BLUE_PAD: u16 = 1 << 3;
pub const GREEN_PAD: u16 = 1 << 4;

/// All four hand pads (kick excluded)
pub const PADS: u16 = RED_PAD | YELLOW_PAD | BLUE_PAD | GREEN_PAD;

pub const fn bit(lane: u8) -> u16 {
    1 << lane
}

pub fn count(mask: u16) -> u8 {
    mask.count_ones() as u8
}

/// Lowest set lane, if any.
pub fn lowest(mask: u16) -> Option<u8> {
    (mask != 0).then(|| mask.trailing_zeros() as u8)
}

/// Highest set lane, if any.
pub fn highest(mask: u16) -> Option<u8> {
    (mask != 0).then(|| (15 - mask.leading_zeros()) as u8)
}

/// Mask of every lane strictly below `lane`.
pub fn below(lane: u8) -> u16 {
    bit(lane).wrapping_sub(1)
}

/// Iterate the set lanes of a mask in ascending order.
pub fn iter(mask: u16) -> impl Iterator<Item = u8> {
    (0..16u8).filter(move |&lane| mask & bit(lane) != 0)
}
