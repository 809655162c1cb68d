use bitflags::bitflags;

bitflags! {
    /// The order byte of a rANS Nx16 stream.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Flags: u8 {
        /// Order-1 context modeling.
        const ORDER = 0x01;
        /// 4-way interleaved sub-streams, encoded independently.
        const STRIPE = 0x08;
        /// No original-size prefix (the outer framing already stores it).
        const NO_SIZE = 0x10;
        /// Verbatim copy, no entropy coding.
        const CAT = 0x20;
        /// Run-length pre-transform, runs and literals split.
        const RLE = 0x40;
        /// Bit packing (2, 4, or 8 symbols per byte).
        const PACK = 0x80;
    }
}

impl From<u8> for Flags {
    fn from(n: u8) -> Self {
        Self::from_bits_truncate(n)
    }
}

impl From<Flags> for u8 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}
