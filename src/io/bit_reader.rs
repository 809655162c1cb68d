use std::io;

/// An MSB-first bit reader over a core block payload.
///
/// Record-level codecs read sub-byte symbols from core blocks through this
/// rather than indexing the raw buffer.
pub struct BitReader<'a> {
    src: &'a [u8],
    i: usize,
    offset: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a bit reader over a byte buffer.
    pub fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            i: 0,
            offset: 0,
        }
    }

    /// Reads `n` bits into the low bits of a `u32`.
    pub fn read_u32(&mut self, n: u32) -> io::Result<u32> {
        let mut value = 0;

        for _ in 0..n {
            let bit = self.read_bit().map(u32::from)?;
            value = (value << 1) | bit;
        }

        Ok(value)
    }

    /// Reads `n` bits into the low bits of an `i32`.
    pub fn read_i32(&mut self, n: u32) -> io::Result<i32> {
        self.read_u32(n).map(|value| value as i32)
    }

    fn read_bit(&mut self) -> io::Result<u8> {
        let b = self
            .src
            .get(self.i)
            .copied()
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;

        let bit = (b >> (7 - self.offset)) & 0x01;

        self.offset += 1;

        if self.offset == 8 {
            self.i += 1;
            self.offset = 0;
        }

        Ok(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u32() -> io::Result<()> {
        let data = [0b11001111, 0b01000000];
        let mut reader = BitReader::new(&data[..]);

        assert_eq!(reader.read_u32(4)?, 0b1100);
        assert_eq!(reader.read_u32(2)?, 0b11);
        assert_eq!(reader.read_u32(6)?, 0b110100);

        Ok(())
    }

    #[test]
    fn test_read_u32_with_eof() {
        let data = [0xff];
        let mut reader = BitReader::new(&data[..]);
        assert!(reader.read_u32(9).is_err());
    }
}
