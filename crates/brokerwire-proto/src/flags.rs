//! Message attribute flags.

use bitflags::bitflags;

bitflags! {
    /// Per-message attributes byte.
    ///
    /// Bits 0-2 hold the compression codec as a 3-bit value rather than
    /// independent flags; use [`Attributes::codec`] to read it. Unknown bits are
    /// retained so a decoded message reports exactly what was on the wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Attributes: u8 {
        /// Codec value 1: gzip.
        const GZIP = 0b0000_0001;
        /// Codec value 2: snappy.
        const SNAPPY = 0b0000_0010;
        /// Mask covering the codec bits.
        const CODEC_MASK = 0b0000_0111;
        /// Timestamp was assigned by the broker on append (magic 1 only).
        const LOG_APPEND_TIME = 0b0000_1000;
    }
}

impl Attributes {
    /// Raw codec value from bits 0-2.
    pub const fn codec(self) -> u8 {
        self.bits() & Self::CODEC_MASK.bits()
    }

    /// Attributes with the given codec value and no other bits.
    pub const fn with_codec(codec: u8) -> Self {
        Self::from_bits_retain(codec & Self::CODEC_MASK.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_ignores_higher_bits() {
        let attrs = Attributes::from_bits_retain(0b1000_1010);
        assert_eq!(attrs.codec(), 2);
        assert!(attrs.contains(Attributes::LOG_APPEND_TIME));
        assert_eq!(attrs.bits(), 0b1000_1010);
    }

    #[test]
    fn with_codec_masks_value() {
        assert_eq!(Attributes::with_codec(1), Attributes::GZIP);
        assert_eq!(Attributes::with_codec(0b1111).codec(), 0b111);
        assert!(Attributes::with_codec(0).is_empty());
    }
}
