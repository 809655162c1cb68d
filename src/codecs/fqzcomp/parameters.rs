pub(super) mod parameter;

use bitflags::bitflags;

bitflags! {
    /// Global fqzcomp flags.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Flags: u8 {
        /// More than one parameter block is stored.
        const MULTI_PARAM = 0x01;
        /// A selector-to-parameter table is stored.
        const HAVE_S_TAB = 0x02;
        /// Per-record strand flags are coded and reverse-strand qualities
        /// are stored reversed.
        const DO_REV = 0x04;
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
