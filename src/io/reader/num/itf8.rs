use std::io::{self, Read};

use super::read_u8;

/// Reads a CRAM ITF8 integer (1-5 bytes).
pub fn read_itf8<R>(reader: &mut R) -> io::Result<i32>
where
    R: Read,
{
    let b0 = read_u8(reader).map(i32::from)?;

    let n = if b0 & 0x80 == 0 {
        b0
    } else if b0 & 0x40 == 0 {
        let b1 = read_u8(reader).map(i32::from)?;
        ((b0 & 0x3f) << 8) | b1
    } else if b0 & 0x20 == 0 {
        let b1 = read_u8(reader).map(i32::from)?;
        let b2 = read_u8(reader).map(i32::from)?;
        ((b0 & 0x1f) << 16) | (b1 << 8) | b2
    } else if b0 & 0x10 == 0 {
        let b1 = read_u8(reader).map(i32::from)?;
        let b2 = read_u8(reader).map(i32::from)?;
        let b3 = read_u8(reader).map(i32::from)?;
        ((b0 & 0x0f) << 24) | (b1 << 16) | (b2 << 8) | b3
    } else {
        let b1 = read_u8(reader).map(i32::from)?;
        let b2 = read_u8(reader).map(i32::from)?;
        let b3 = read_u8(reader).map(i32::from)?;
        let b4 = read_u8(reader).map(i32::from)?;
        // The final byte of the 5-byte form contributes only its low nibble.
        ((b0 & 0x0f) << 28) | (b1 << 20) | (b2 << 12) | (b3 << 4) | (b4 & 0x0f)
    };

    Ok(n)
}

/// Reads an ITF8 integer, converting to type `N`.
pub fn read_itf8_as<R, N>(reader: &mut R) -> io::Result<N>
where
    R: Read,
    N: TryFrom<i32, Error = std::num::TryFromIntError>,
{
    read_itf8(reader).and_then(|n| {
        n.try_into()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    })
}
