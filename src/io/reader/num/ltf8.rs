use std::io::{self, Read};

use super::read_u8;

/// Reads a CRAM LTF8 integer (1-9 bytes).
pub fn read_ltf8<R>(reader: &mut R) -> io::Result<i64>
where
    R: Read,
{
    let b0 = read_u8(reader)?;

    let n = if b0 & 0x80 == 0 {
        i64::from(b0)
    } else if b0 & 0x40 == 0 {
        read_extra(reader, i64::from(b0 & 0x3f), 1)?
    } else if b0 & 0x20 == 0 {
        read_extra(reader, i64::from(b0 & 0x1f), 2)?
    } else if b0 & 0x10 == 0 {
        read_extra(reader, i64::from(b0 & 0x0f), 3)?
    } else if b0 & 0x08 == 0 {
        read_extra(reader, i64::from(b0 & 0x07), 4)?
    } else if b0 & 0x04 == 0 {
        read_extra(reader, i64::from(b0 & 0x03), 5)?
    } else if b0 & 0x02 == 0 {
        read_extra(reader, i64::from(b0 & 0x01), 6)?
    } else if b0 & 0x01 == 0 {
        read_extra(reader, 0, 7)?
    } else {
        read_extra(reader, 0, 8)?
    };

    Ok(n)
}

fn read_extra<R>(reader: &mut R, mut n: i64, count: usize) -> io::Result<i64>
where
    R: Read,
{
    for _ in 0..count {
        let b = read_u8(reader)?;
        n = (n << 8) | i64::from(b);
    }

    Ok(n)
}

/// Reads an LTF8 integer, converting to type `N`.
pub fn read_ltf8_as<R, N>(reader: &mut R) -> io::Result<N>
where
    R: Read,
    N: TryFrom<i64, Error = std::num::TryFromIntError>,
{
    read_ltf8(reader).and_then(|n| {
        n.try_into()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_ltf8() -> io::Result<()> {
        fn t(mut data: &[u8], expected: i64) -> io::Result<()> {
            assert_eq!(read_ltf8(&mut data)?, expected);
            Ok(())
        }

        t(&[0x00], 0)?;
        t(&[0x55], 85)?;
        t(&[0x80, 0xaa], 170)?;
        t(&[0xc0, 0x55, 0xaa], 21930)?;
        t(&[0xe0, 0x55, 0xaa, 0xcc], 5614284)?;
        t(&[0xf0, 0x55, 0xaa, 0xcc, 0x33], 1437256755)?;
        t(&[0xf8, 0x55, 0xaa, 0xcc, 0x33, 0xe3], 0x55aacc33e3)?;
        t(&[0xfc, 0x55, 0xaa, 0xcc, 0x33, 0xe3, 0x42], 0x55aacc33e342)?;
        t(
            &[0xfe, 0x55, 0xaa, 0xcc, 0x33, 0xe3, 0x42, 0x21],
            0x55aacc33e34221,
        )?;
        t(
            &[0xff, 0x55, 0xaa, 0xcc, 0x33, 0xe3, 0x42, 0x21, 0x1f],
            0x55aacc33e342211f,
        )?;
        t(
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            -1,
        )?;

        Ok(())
    }
}
