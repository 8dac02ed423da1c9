//! Bit-frame decoding and trailer-pulse encoding.
//!
//! The chip signals its next gain/channel configuration purely through the
//! number of extra clock pulses after the 24 data bits; nothing is written
//! on the data lines.

use crate::error::ConfigError;

/// Number of data bits in one frame.
pub const FRAME_BITS: u32 = 24;

const FRAME_MASK: u32 = 0xFF_FFFF;
const SIGN_BIT: u32 = 0x80_0000;

/// Frames the chip emits on fault or disconnect rather than as legitimate
/// extreme readings. They decode to the invalid marker, never to a number.
const SENTINELS: [u32; 3] = [0x80_0000, 0x7F_FFFF, 0xFF_FFFF];

/// Amplifier gain on input channel A. Channel B is fixed-gain in hardware,
/// so this setting only matters when channel A is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    X128,
    X64,
}

impl Gain {
    /// Parse the datasheet gain figure; anything but 128 or 64 is a
    /// configuration error.
    pub fn from_raw(raw: u32) -> Result<Self, ConfigError> {
        match raw {
            128 => Ok(Self::X128),
            64 => Ok(Self::X64),
            other => Err(ConfigError::UnsupportedGain(other)),
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::X128 => 128,
            Self::X64 => 64,
        }
    }
}

/// Logical input sub-channel of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSelect {
    A,
    B,
}

impl ChannelSelect {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            other => Err(ConfigError::UnsupportedSelect(other.to_string())),
        }
    }
}

/// Decode a raw 24-bit two's-complement frame to a signed value.
///
/// The three sentinel frames (`0x800000`, `0x7FFFFF`, `0xFFFFFF`) decode to
/// `None`; they indicate a chip fault, not data. Everything else is a
/// bijection onto the remaining two's-complement range.
pub fn decode(raw: u32) -> Option<i32> {
    let raw = raw & FRAME_MASK;
    if SENTINELS.contains(&raw) {
        return None;
    }
    if raw & SIGN_BIT != 0 {
        Some(-(((raw ^ FRAME_MASK) + 1) as i32))
    } else {
        Some(raw as i32)
    }
}

/// Inverse of [`decode`] for values in `[-0x800000, 0x7FFFFF]`: truncate the
/// two's-complement representation to 24 bits.
pub fn encode(value: i32) -> u32 {
    (value as u32) & FRAME_MASK
}

/// Trailer pulses after the 24 data bits, selecting channel and gain for the
/// next conversion: (A,128) -> 1, (A,64) -> 3, channel B -> 2.
///
/// A wrong pulse count desynchronizes every subsequent frame, so the driver
/// emits this trailer even on degraded frames.
pub fn trailer_pulses(select: ChannelSelect, gain: Gain) -> u8 {
    match (select, gain) {
        (ChannelSelect::A, Gain::X128) => 1,
        (ChannelSelect::A, Gain::X64) => 3,
        (ChannelSelect::B, _) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_positive_values() {
        assert_eq!(decode(0x00_0000), Some(0));
        assert_eq!(decode(0x00_0001), Some(1));
        assert_eq!(decode(0x40_0000), Some(4_194_304));
        assert_eq!(decode(0x7F_FFFE), Some(8_388_606));
    }

    #[test]
    fn decode_negative_values() {
        assert_eq!(decode(0xFF_FFFE), Some(-2));
        assert_eq!(decode(0x80_0001), Some(-8_388_607));
        assert_eq!(decode(0xC0_0000), Some(-4_194_304));
    }

    #[test]
    fn sentinels_decode_to_invalid() {
        assert_eq!(decode(0x80_0000), None);
        assert_eq!(decode(0x7F_FFFF), None);
        assert_eq!(decode(0xFF_FFFF), None);
    }

    #[test]
    fn decode_masks_stray_high_bits() {
        assert_eq!(decode(0x0100_0001), Some(1));
    }

    #[test]
    fn encode_round_trips() {
        for v in [0, 1, -2, 4_194_304, -4_194_304, 8_388_606, -8_388_607] {
            assert_eq!(decode(encode(v)), Some(v));
        }
    }

    #[test]
    fn trailer_pulse_table() {
        assert_eq!(trailer_pulses(ChannelSelect::A, Gain::X128), 1);
        assert_eq!(trailer_pulses(ChannelSelect::A, Gain::X64), 3);
        assert_eq!(trailer_pulses(ChannelSelect::B, Gain::X128), 2);
        assert_eq!(trailer_pulses(ChannelSelect::B, Gain::X64), 2);
    }

    #[test]
    fn gain_parsing() {
        assert_eq!(Gain::from_raw(128), Ok(Gain::X128));
        assert_eq!(Gain::from_raw(64), Ok(Gain::X64));
        assert!(matches!(
            Gain::from_raw(32),
            Err(ConfigError::UnsupportedGain(32))
        ));
    }

    #[test]
    fn select_parsing() {
        assert_eq!(ChannelSelect::from_name("A"), Ok(ChannelSelect::A));
        assert_eq!(ChannelSelect::from_name("b"), Ok(ChannelSelect::B));
        assert!(ChannelSelect::from_name("C").is_err());
    }
}
