use std::io::{self, Read, Write};

use super::RangeCoder;

const STEP: u16 = 8;
const MAX_FREQ: u32 = (1 << 16) - 32;

#[derive(Clone, Copy)]
struct SymFreq {
    freq: u16,
    symbol: u16,
}

/// An adaptive symbol frequency model.
///
/// Symbols are kept approximately sorted by frequency: every 16th access
/// performs a single bubble step, so lookup cost tracks the bias of the
/// distribution rather than the alphabet size. Frequencies halve when the
/// total exceeds `MAX_FREQ`, keeping the model adaptive and the coder's
/// arithmetic bounded. There is no escape symbol.
#[derive(Clone)]
pub struct Model {
    total_freq: u32,
    bub_count: u32,
    sym_freqs: Vec<SymFreq>,
}

impl Model {
    pub fn new(num_symbols: usize) -> Self {
        let sym_freqs = (0..num_symbols)
            .map(|i| SymFreq {
                freq: 1,
                symbol: i as u16,
            })
            .collect();

        Self {
            total_freq: num_symbols as u32,
            bub_count: 0,
            sym_freqs,
        }
    }

    pub fn encode<W>(
        &mut self,
        writer: &mut W,
        range_coder: &mut RangeCoder,
        symbol: u16,
    ) -> io::Result<()>
    where
        W: Write,
    {
        let mut cum_freq = 0;
        let mut i = 0;

        while self.sym_freqs[i].symbol != symbol {
            cum_freq += u32::from(self.sym_freqs[i].freq);
            i += 1;
        }

        let freq = u32::from(self.sym_freqs[i].freq);
        range_coder.range_encode(writer, cum_freq, freq, self.total_freq)?;

        self.bump(i);

        Ok(())
    }

    pub fn decode<R>(&mut self, reader: &mut R, range_coder: &mut RangeCoder) -> io::Result<u16>
    where
        R: Read,
    {
        let target = range_coder.range_get_freq(self.total_freq);

        let mut cum_freq = 0;
        let mut i = 0;

        loop {
            cum_freq += u32::from(self.sym_freqs[i].freq);

            if cum_freq > target || i + 1 == self.sym_freqs.len() {
                break;
            }

            i += 1;
        }

        cum_freq -= u32::from(self.sym_freqs[i].freq);

        let freq = u32::from(self.sym_freqs[i].freq);
        range_coder.range_decode(reader, cum_freq, freq)?;

        let symbol = self.sym_freqs[i].symbol;
        self.bump(i);

        Ok(symbol)
    }

    fn bump(&mut self, i: usize) {
        self.sym_freqs[i].freq += STEP;
        self.total_freq += u32::from(STEP);

        if self.total_freq > MAX_FREQ {
            self.normalize();
        }

        self.bub_count += 1;

        if self.bub_count & 15 == 0 && i > 0 && self.sym_freqs[i].freq > self.sym_freqs[i - 1].freq
        {
            self.sym_freqs.swap(i, i - 1);
        }
    }

    fn normalize(&mut self) {
        self.total_freq = 0;

        for sym_freq in &mut self.sym_freqs {
            sym_freq.freq -= sym_freq.freq >> 1;
            self.total_freq += u32::from(sym_freq.freq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_round_trip() -> io::Result<()> {
        let symbols: Vec<u16> = (0..1000).map(|i| (i * 7) % 42).collect();

        let mut dst = Vec::new();
        let mut rc = RangeCoder::default();
        let mut model = Model::new(42);

        for &symbol in &symbols {
            model.encode(&mut dst, &mut rc, symbol)?;
        }
        rc.range_encode_end(&mut dst)?;

        let mut src = &dst[..];
        let mut rc = RangeCoder::default();
        let mut model = Model::new(42);
        rc.range_decode_init(&mut src)?;

        for &expected in &symbols {
            assert_eq!(model.decode(&mut src, &mut rc)?, expected);
        }

        Ok(())
    }
}
