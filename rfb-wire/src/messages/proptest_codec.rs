//! Property tests for the wire codecs.
//!
//! These verify the encode/decode inverses that the byte-layout unit tests
//! cannot cover exhaustively: the 16-byte pixel-format record and the
//! rectangle header must round-trip for every valid field combination.

#[cfg(test)]
mod tests {
    use super::super::types::{PixelFormat, Rectangle};
    use bytes::BytesMut;
    use proptest::prelude::*;

    prop_compose! {
        /// A structurally valid pixel format: a real word size, a depth
        /// that fits, and channels whose shift plus bit width stay inside
        /// the word.
        fn arbitrary_pixel_format()(
            bpp in prop::sample::select(vec![8u8, 16, 24, 32]),
            big_endian in prop::bool::ANY,
            true_color in prop::bool::ANY,
            depth_frac in 1u32..=8,
            red_bits in 1u8..=5,
            green_bits in 1u8..=6,
            blue_bits in 1u8..=5,
            shift_seed in prop::array::uniform3(0u8..=31),
        ) -> PixelFormat {
            let depth = ((bpp as u32 * depth_frac).div_ceil(8).max(1) as u8).min(bpp);
            let shift_for = |bits: u8, seed: u8| seed % (bpp - bits + 1);
            PixelFormat {
                bits_per_pixel: bpp,
                depth,
                big_endian: u8::from(big_endian),
                true_color: u8::from(true_color),
                red_max: (1u16 << red_bits) - 1,
                green_max: (1u16 << green_bits) - 1,
                blue_max: (1u16 << blue_bits) - 1,
                red_shift: shift_for(red_bits, shift_seed[0]),
                green_shift: shift_for(green_bits, shift_seed[1]),
                blue_shift: shift_for(blue_bits, shift_seed[2]),
            }
        }
    }

    proptest! {
        #[test]
        fn pixel_format_round_trips(pf in arbitrary_pixel_format()) {
            prop_assert!(pf.validate().is_ok());

            let mut buf = BytesMut::new();
            pf.encode(&mut buf);
            prop_assert_eq!(buf.len(), PixelFormat::WIRE_LEN);

            let decoded = PixelFormat::decode(&mut buf.freeze()).unwrap();
            prop_assert_eq!(decoded, pf);
        }

        #[test]
        fn rectangle_round_trips(
            x in any::<u16>(),
            y in any::<u16>(),
            width in any::<u16>(),
            height in any::<u16>(),
            encoding in any::<i32>(),
        ) {
            let rect = Rectangle { x, y, width, height, encoding };
            let mut buf = BytesMut::new();
            rect.encode(&mut buf);
            let decoded = Rectangle::decode(&mut buf.freeze()).unwrap();
            prop_assert_eq!(decoded, rect);
        }
    }
}
