//! Property tests for the frame codec.

use hx711_core::codec::{decode, encode};
use proptest::prelude::*;

// The three sentinel frames map to the invalid marker; everything else in
// the 24-bit range round-trips exactly.
const SENTINEL_RAW: [u32; 3] = [0x80_0000, 0x7F_FFFF, 0xFF_FFFF];

proptest! {
    #[test]
    fn signed_values_round_trip(v in -8_388_607i32..=8_388_606) {
        prop_assume!(v != -1); // -1 encodes to the 0xFFFFFF sentinel
        prop_assert_eq!(decode(encode(v)), Some(v));
    }

    #[test]
    fn raw_frames_round_trip_or_are_sentinels(raw in 0u32..=0xFF_FFFF) {
        match decode(raw) {
            Some(v) => {
                prop_assert!(!SENTINEL_RAW.contains(&raw));
                prop_assert_eq!(encode(v), raw);
                prop_assert!((-8_388_607..=8_388_606).contains(&v));
            }
            None => prop_assert!(SENTINEL_RAW.contains(&raw)),
        }
    }

    #[test]
    fn stray_high_bits_never_change_the_value(raw in 0u32..=0xFF_FFFF, junk in 0u32..=0xFF) {
        prop_assert_eq!(decode(raw | (junk << 24)), decode(raw));
    }
}
