//! rANS 4x8 (CRAM 3.0).
//!
//! Four interleaved rANS states with byte-wise renormalization. The frame
//! stores the order, the compressed size, and the uncompressed size, followed
//! by the normalized frequency table and the rANS stream.

mod decode;
mod encode;

pub use self::{decode::decode, encode::encode};

use std::io;

pub(crate) const LOWER_BOUND: u32 = 1 << 23;
pub(crate) const TF_SHIFT: u32 = 12;
// Frequencies normalize to a 4095 total so a 12-bit slot lookup never
// overflows the table.
pub(crate) const TOTFREQ: u32 = (1 << TF_SHIFT) - 1;

/// The rANS 4x8 context order.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Order {
    /// Order-0: symbols are modeled independently.
    #[default]
    Zero,
    /// Order-1: symbols are modeled by their preceding byte.
    One,
}

impl TryFrom<u8> for Order {
    type Error = io::Error;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid rANS 4x8 order: {n}"),
            )),
        }
    }
}

impl From<Order> for u8 {
    fn from(order: Order) -> Self {
        match order {
            Order::Zero => 0,
            Order::One => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(order: Order, src: &[u8]) -> io::Result<()> {
        let compressed = encode(order, src)?;
        let uncompressed = decode(&mut &compressed[..])?;
        assert_eq!(uncompressed, src, "round trip failed for order {order:?}");
        Ok(())
    }

    #[test]
    fn test_self_order_0() -> io::Result<()> {
        t(Order::Zero, b"noodles")?;
        t(Order::Zero, b"")?;
        t(Order::Zero, &[0x00])?;
        t(Order::Zero, &[0xff; 4096])?;

        let src: Vec<_> = (0..10000u32).map(|n| (n % 7) as u8).collect();
        t(Order::Zero, &src)?;

        Ok(())
    }

    #[test]
    fn test_self_order_1() -> io::Result<()> {
        let src: Vec<_> = b"CTGACTGACTGATTGCA"
            .iter()
            .copied()
            .cycle()
            .take(3000)
            .collect();
        t(Order::One, &src)?;

        t(Order::One, b"abcd")?;
        t(Order::One, b"abcdefg")?;

        Ok(())
    }

    #[test]
    fn test_self_order_1_short_input_falls_back_to_order_0() -> io::Result<()> {
        let compressed = encode(Order::One, b"abc")?;
        // order byte reflects the fallback
        assert_eq!(compressed[0], 0);

        let uncompressed = decode(&mut &compressed[..])?;
        assert_eq!(uncompressed, b"abc");

        Ok(())
    }

    #[test]
    fn test_decode_with_invalid_order() {
        let src = [0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(decode(&mut &src[..]).is_err());
    }
}
