//! Adaptive arithmetic coding (CRAM 3.1 "arith dynamic").
//!
//! An order-0/1 adaptive byte model over a carryless range coder, with the
//! same pre-transform family as rANS Nx16 (bit packing, integrated RLE,
//! 4-way striping, verbatim cat) plus an external bzip2 bypass.

mod decode;
mod encode;
mod flags;
mod model;
mod range_coder;

pub use self::{decode::decode, encode::encode, flags::Flags};
pub(crate) use self::{model::Model, range_coder::RangeCoder};

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn t(flags: Flags, src: &[u8]) -> io::Result<()> {
        let compressed = encode(flags, src)?;
        let uncompressed = decode(&mut &compressed[..], src.len())?;
        assert_eq!(uncompressed, src, "round trip failed for flags {flags:?}");
        Ok(())
    }

    #[test]
    fn test_self_order_0() -> io::Result<()> {
        t(Flags::empty(), b"noodles")?;
        t(Flags::empty(), &[0x00; 32])?;
        t(Flags::empty(), b"")?;
        Ok(())
    }

    #[test]
    fn test_self_order_1() -> io::Result<()> {
        t(Flags::ORDER, b"noodlesnoodlesnoodles")?;
        // < 8 bytes forces an order-0 fallback
        t(Flags::ORDER, b"ndls")?;
        Ok(())
    }

    #[test]
    fn test_self_rle() -> io::Result<()> {
        t(Flags::RLE, b"aaaaaaaabbbbbbbbccccccccc")?;
        t(Flags::ORDER | Flags::RLE, b"aaaaaaaabbbbbbbbccccccccc")?;
        t(Flags::RLE, b"abc")?;
        Ok(())
    }

    #[test]
    fn test_self_pack() -> io::Result<()> {
        // 1, 2, 4, and 16 distinct symbols
        t(Flags::PACK, &[7; 64])?;
        t(Flags::PACK, &[0, 1, 0, 1, 1, 0, 0, 1])?;
        t(Flags::PACK, b"ACGTACGTACGTACGTACGTACGTGTCA")?;
        let src: Vec<_> = (0..64u8).map(|n| n % 16).collect();
        t(Flags::PACK, &src)?;
        // 17 distinct symbols: pack is abandoned
        let src: Vec<_> = (0..68u8).map(|n| n % 17).collect();
        t(Flags::PACK, &src)?;
        Ok(())
    }

    #[test]
    fn test_self_pack_rle() -> io::Result<()> {
        t(Flags::PACK | Flags::RLE, b"AAAAAAAACCCCGGGGGGGGTTTT")?;
        Ok(())
    }

    #[test]
    fn test_self_ext() -> io::Result<()> {
        let src: Vec<_> = b"quality quality quality quality quality "
            .iter()
            .copied()
            .cycle()
            .take(4000)
            .collect();
        t(Flags::EXT, &src)?;
        Ok(())
    }

    #[test]
    fn test_self_stripe() -> io::Result<()> {
        let src: Vec<_> = (0..4096u32).flat_map(|n| n.to_le_bytes()).collect();
        t(Flags::ORDER | Flags::STRIPE, &src)?;
        // stripe is cleared for short or non-multiple-of-4 inputs
        t(Flags::STRIPE, b"abcde")?;
        Ok(())
    }

    #[test]
    fn test_self_cat() -> io::Result<()> {
        // incompressible input reverts to cat
        let src: Vec<_> = (0u32..64).flat_map(|n| (n.wrapping_mul(2654435761)).to_le_bytes()).collect();
        t(Flags::empty(), &src)?;
        Ok(())
    }
}
