use std::io::{self, Read};

use super::read_u8;

/// Reads an unsigned 7-bit-per-byte VLQ integer (1-5 bytes).
pub fn read_uint7<R>(reader: &mut R) -> io::Result<u32>
where
    R: Read,
{
    let mut n = 0u32;
    let mut count = 0u8;

    loop {
        let b = read_u8(reader).map(u32::from)?;

        count += 1;
        if count > 5 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "VLQ integer overflow",
            ));
        }

        n <<= 7;
        n |= b & 0x7f;

        if b & 0x80 == 0 {
            break;
        }
    }

    Ok(n)
}

/// Reads a uint7 integer, converting to type `N`.
pub fn read_uint7_as<R, N>(reader: &mut R) -> io::Result<N>
where
    R: Read,
    N: TryFrom<u32, Error = std::num::TryFromIntError>,
{
    read_uint7(reader).and_then(|n| {
        n.try_into()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    })
}

/// Reads a signed integer (uint7 with zigzag decode).
pub fn read_sint7<R>(reader: &mut R) -> io::Result<i32>
where
    R: Read,
{
    let n = read_uint7(reader)?;
    Ok(zigzag_decode_i32(n))
}

/// Reads a 64-bit unsigned VLQ integer.
pub fn read_uint7_64<R>(reader: &mut R) -> io::Result<u64>
where
    R: Read,
{
    let mut n: u64 = 0;
    let mut count = 0u8;

    loop {
        let b = read_u8(reader).map(u64::from)?;

        count += 1;
        if count > 10 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "VLQ integer overflow",
            ));
        }

        n <<= 7;
        n |= b & 0x7f;

        if b & 0x80 == 0 {
            break;
        }
    }

    Ok(n)
}

/// Reads a signed 64-bit integer (uint7_64 with zigzag decode).
pub fn read_sint7_64<R>(reader: &mut R) -> io::Result<i64>
where
    R: Read,
{
    let n = read_uint7_64(reader)?;
    Ok(zigzag_decode_i64(n))
}

fn zigzag_decode_i32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

fn zigzag_decode_i64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_uint7() -> io::Result<()> {
        fn t(mut data: &[u8], expected: u32) -> io::Result<()> {
            assert_eq!(read_uint7(&mut data)?, expected);
            Ok(())
        }

        t(&[0x00], 0)?;
        t(&[0x7f], 127)?;
        t(&[0x81, 0x00], 128)?;
        t(&[0xff, 0x7f], 16383)?;
        t(&[0x81, 0x80, 0x00], 16384)?;
        t(&[0x8f, 0xff, 0xff, 0xff, 0x7f], u32::MAX)?;

        Ok(())
    }

    #[test]
    fn test_read_uint7_with_overflow() {
        let data: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x80, 0x00];
        assert!(matches!(
            read_uint7(&mut &data[..]),
            Err(e) if e.kind() == io::ErrorKind::InvalidData
        ));
    }

    #[test]
    fn test_read_sint7() -> io::Result<()> {
        fn t(mut data: &[u8], expected: i32) -> io::Result<()> {
            assert_eq!(read_sint7(&mut data)?, expected);
            Ok(())
        }

        t(&[0x00], 0)?;
        t(&[0x01], -1)?;
        t(&[0x02], 1)?;
        t(&[0x03], -2)?;
        t(&[0x04], 2)?;

        Ok(())
    }

    #[test]
    fn test_read_uint7_64() -> io::Result<()> {
        fn t(mut data: &[u8], expected: u64) -> io::Result<()> {
            assert_eq!(read_uint7_64(&mut data)?, expected);
            Ok(())
        }

        t(&[0x00], 0)?;
        t(&[0x7f], 127)?;
        t(&[0x81, 0x00], 128)?;

        Ok(())
    }

    #[test]
    fn test_read_sint7_64() -> io::Result<()> {
        let mut data: &[u8] = &[0x03];
        assert_eq!(read_sint7_64(&mut data)?, -2);
        Ok(())
    }
}
