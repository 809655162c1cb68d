use std::io::{self, Read, Write};

const TOP: u32 = 1 << 24;

/// A carryless range coder.
///
/// 32-bit range with a 64-bit low accumulator and byte-level renormalization
/// below 2^24. The encoder and decoder share one state type; `code` is only
/// used on the decode side.
pub struct RangeCoder {
    low: u64,
    range: u32,
    code: u32,
}

impl Default for RangeCoder {
    fn default() -> Self {
        Self {
            low: 0,
            range: u32::MAX,
            code: 0,
        }
    }
}

impl RangeCoder {
    pub fn range_encode<W>(
        &mut self,
        writer: &mut W,
        cum_freq: u32,
        freq: u32,
        total_freq: u32,
    ) -> io::Result<()>
    where
        W: Write,
    {
        self.range /= total_freq;
        self.low = self
            .low
            .wrapping_add(u64::from(cum_freq) * u64::from(self.range));
        self.range *= freq;

        while self.range < TOP {
            self.clamp_range_on_carry();

            writer.write_all(&[(self.low >> 56) as u8])?;
            self.range <<= 8;
            self.low <<= 8;
        }

        Ok(())
    }

    pub fn range_encode_end<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        for _ in 0..8 {
            writer.write_all(&[(self.low >> 56) as u8])?;
            self.low <<= 8;
        }

        Ok(())
    }

    pub fn range_decode_init<R>(&mut self, reader: &mut R) -> io::Result<()>
    where
        R: Read,
    {
        self.low = 0;
        self.range = u32::MAX;
        self.code = 0;

        // Only the low 4 of these 8 bytes survive in `code`, matching the
        // encoder's 8-byte flush.
        for _ in 0..8 {
            let b = read_u8_or_zero(reader)?;
            self.code = (self.code << 8) | u32::from(b);
        }

        Ok(())
    }

    pub fn range_get_freq(&mut self, total_freq: u32) -> u32 {
        self.range /= total_freq;
        self.code / self.range
    }

    pub fn range_decode<R>(
        &mut self,
        reader: &mut R,
        cum_freq: u32,
        freq: u32,
    ) -> io::Result<()>
    where
        R: Read,
    {
        let diff = cum_freq.wrapping_mul(self.range);
        self.low = self.low.wrapping_add(u64::from(diff));
        self.code = self.code.wrapping_sub(diff);
        self.range *= freq;

        while self.range < TOP {
            self.clamp_range_on_carry();

            let b = read_u8_or_zero(reader)?;
            self.code = (self.code << 8) | u32::from(b);
            self.range <<= 8;
            self.low <<= 8;
        }

        Ok(())
    }

    // Reduces the range so the pending output byte is settled when low and
    // low + range disagree in their top byte.
    fn clamp_range_on_carry(&mut self) {
        if (self.low ^ self.low.wrapping_add(u64::from(self.range))) >> 56 != 0 {
            let low = self.low as u32;
            self.range = (low | (TOP - 1)).wrapping_sub(low);
        }
    }
}

// A truncated stream must not panic or hang; missing renormalization bytes
// read as zero and the caller's size checks reject the output.
fn read_u8_or_zero<R>(reader: &mut R) -> io::Result<u8>
where
    R: Read,
{
    let mut buf = [0; 1];

    match reader.read(&mut buf)? {
        0 => Ok(0),
        _ => Ok(buf[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_coder_round_trip() -> io::Result<()> {
        // one symbol with cum_freq 1, freq 1 of 3, many times
        let mut dst = Vec::new();
        let mut rc = RangeCoder::default();

        for _ in 0..100 {
            rc.range_encode(&mut dst, 1, 1, 3)?;
        }
        rc.range_encode_end(&mut dst)?;

        let mut src = &dst[..];
        let mut rc = RangeCoder::default();
        rc.range_decode_init(&mut src)?;

        for _ in 0..100 {
            let freq = rc.range_get_freq(3);
            assert!((1..2).contains(&freq));
            rc.range_decode(&mut src, 1, 1)?;
        }

        Ok(())
    }
}
