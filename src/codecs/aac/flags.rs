use bitflags::bitflags;

bitflags! {
    /// The order byte of an arithmetic-coded stream.
    ///
    /// Bits 0-1 hold the model order (only 0 and 1 are emitted); the high
    /// bits select pre-transforms or replace the entropy stage entirely
    /// (`CAT`, `EXT`).
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Flags: u8 {
        /// Order-1 context modeling.
        const ORDER = 0x01;
        /// External codec (bzip2) instead of the arithmetic coder.
        const EXT = 0x04;
        /// 4-way interleaved sub-streams, encoded independently.
        const STRIPE = 0x08;
        /// No original-size prefix (the outer framing already stores it).
        const NO_SIZE = 0x10;
        /// Verbatim copy, no entropy coding.
        const CAT = 0x20;
        /// Run-length encoding integrated into the models.
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
