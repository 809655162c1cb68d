use std::io::{self, Write};

/// Writes a CRAM LTF8 integer (1-9 bytes).
pub fn write_ltf8<W>(writer: &mut W, n: i64) -> io::Result<()>
where
    W: Write,
{
    if n >> (8 - 1) == 0 {
        let buf = [n as u8];
        writer.write_all(&buf)
    } else if n >> (16 - 2) == 0 {
        let buf = [(n >> 8 | 0x80) as u8, n as u8];
        writer.write_all(&buf)
    } else if n >> (24 - 3) == 0 {
        let buf = [(n >> 16 | 0xc0) as u8, (n >> 8) as u8, n as u8];
        writer.write_all(&buf)
    } else if n >> (32 - 4) == 0 {
        let buf = [
            (n >> 24 | 0xe0) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ];
        writer.write_all(&buf)
    } else if n >> (40 - 5) == 0 {
        let buf = [
            (n >> 32 | 0xf0) as u8,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ];
        writer.write_all(&buf)
    } else if n >> (48 - 6) == 0 {
        let buf = [
            (n >> 40 | 0xf8) as u8,
            (n >> 32) as u8,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ];
        writer.write_all(&buf)
    } else if n >> (56 - 7) == 0 {
        let buf = [
            (n >> 48 | 0xfc) as u8,
            (n >> 40) as u8,
            (n >> 32) as u8,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ];
        writer.write_all(&buf)
    } else if n >> (64 - 8) == 0 {
        let buf = [
            0xfe,
            (n >> 48) as u8,
            (n >> 40) as u8,
            (n >> 32) as u8,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ];
        writer.write_all(&buf)
    } else {
        let buf = [
            0xff,
            (n >> 56) as u8,
            (n >> 48) as u8,
            (n >> 40) as u8,
            (n >> 32) as u8,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ];
        writer.write_all(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_ltf8() -> io::Result<()> {
        fn t(buf: &mut Vec<u8>, n: i64, expected: &[u8]) -> io::Result<()> {
            buf.clear();
            write_ltf8(buf, n)?;
            assert_eq!(buf, expected);
            Ok(())
        }

        let mut buf = Vec::new();

        t(&mut buf, 0, &[0x00])?;
        t(&mut buf, 85, &[0x55])?;
        t(&mut buf, 170, &[0x80, 0xaa])?;
        t(&mut buf, 21930, &[0xc0, 0x55, 0xaa])?;
        t(&mut buf, 0x55aacc, &[0xe0, 0x55, 0xaa, 0xcc])?;
        t(&mut buf, 0x55aacc33, &[0xf0, 0x55, 0xaa, 0xcc, 0x33])?;
        t(&mut buf, 0x55aacc33e3, &[0xf8, 0x55, 0xaa, 0xcc, 0x33, 0xe3])?;
        t(
            &mut buf,
            0x55aacc33e342,
            &[0xfc, 0x55, 0xaa, 0xcc, 0x33, 0xe3, 0x42],
        )?;
        t(
            &mut buf,
            0x55aacc33e34221,
            &[0xfe, 0x55, 0xaa, 0xcc, 0x33, 0xe3, 0x42, 0x21],
        )?;
        t(
            &mut buf,
            0x55aacc33e342211f,
            &[0xff, 0x55, 0xaa, 0xcc, 0x33, 0xe3, 0x42, 0x21, 0x1f],
        )?;
        t(
            &mut buf,
            -1,
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
        )?;

        Ok(())
    }

    #[test]
    fn test_ltf8_round_trip() -> io::Result<()> {
        use crate::io::reader::num::read_ltf8;

        let values = [0, 1, 127, 128, i64::from(u32::MAX), i64::MAX, i64::MIN, -1];

        for &value in &values {
            let mut buf = Vec::new();
            write_ltf8(&mut buf, value)?;

            let mut src = &buf[..];
            assert_eq!(read_ltf8(&mut src)?, value, "round-trip failed for {value}");
        }

        Ok(())
    }
}
