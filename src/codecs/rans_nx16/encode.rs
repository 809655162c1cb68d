use std::io;

use super::{Flags, LOWER_BOUND, TF_SHIFT, TF_SHIFT_O1, TOTFREQ, TOTFREQ_O1, normalize_frequencies};
use crate::io::writer::num::write_uint7;

// Stripe sub-stream candidates, brute-forced per stream. Each must be a
// subset of the transforms the caller enabled.
const STRIPE_METHODS: [u8; 4] = [1, 64, 128, 0];

/// Encodes `src` as a rANS Nx16 stream with the requested transforms.
///
/// Transforms that cannot apply (striping unaligned input, packing a wide
/// alphabet) are cleared from the stored flags.
pub fn encode(mut flags: Flags, src: &[u8]) -> io::Result<Vec<u8>> {
    if src.len() % 4 != 0 || src.len() <= 20 {
        flags.remove(Flags::STRIPE);
    }

    if flags.contains(Flags::STRIPE) {
        return encode_stripe(flags, src);
    }

    let mut dst = vec![0x00];

    if !flags.contains(Flags::NO_SIZE) {
        let ulen =
            u32::try_from(src.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        write_uint7(&mut dst, ulen)?;
    }

    let packed;
    let rle_literals;
    let mut data = src;

    if flags.contains(Flags::PACK) && !data.is_empty() {
        match pack(data) {
            Some((meta, buf)) => {
                dst.extend_from_slice(&meta);

                let packed_len = u32::try_from(buf.len())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
                write_uint7(&mut dst, packed_len)?;

                packed = buf;
                data = &packed;
            }
            None => flags.remove(Flags::PACK),
        }
    } else if flags.contains(Flags::PACK) {
        flags.remove(Flags::PACK);
    }

    if flags.contains(Flags::RLE) && !data.is_empty() {
        match rle_encode(data) {
            Some((meta, literals)) => {
                write_rle_meta(&mut dst, &meta, literals.len())?;
                rle_literals = literals;
                data = &rle_literals;
            }
            None => flags.remove(Flags::RLE),
        }
    } else if flags.contains(Flags::RLE) {
        flags.remove(Flags::RLE);
    }

    if flags.contains(Flags::ORDER) && data.len() < 8 {
        flags.remove(Flags::ORDER);
    }

    let compressed = if flags.contains(Flags::ORDER) {
        encode_order_1(data)?
    } else {
        encode_order_0(data)?
    };

    if compressed.len() >= data.len() || flags.contains(Flags::CAT) {
        flags.remove(Flags::ORDER);
        flags.insert(Flags::CAT);
        dst.extend_from_slice(data);
    } else {
        dst.extend_from_slice(&compressed);
    }

    dst[0] = u8::from(flags);

    Ok(dst)
}

fn encode_stripe(flags: Flags, src: &[u8]) -> io::Result<Vec<u8>> {
    let len4 = src.len() / 4;

    let mut transposed = vec![0; src.len()];

    for (i, chunk) in src.chunks_exact(4).enumerate() {
        for (j, &b) in chunk.iter().enumerate() {
            transposed[j * len4 + i] = b;
        }
    }

    let mut chunks = Vec::with_capacity(4);

    for stream in transposed.chunks_exact(len4) {
        let mut best: Option<Vec<u8>> = None;

        for &method in &STRIPE_METHODS {
            if !flags.contains(Flags::from(method)) {
                continue;
            }

            let buf = encode(Flags::from(method) | Flags::NO_SIZE, stream)?;

            if best.as_ref().is_none_or(|b| buf.len() < b.len()) {
                best = Some(buf);
            }
        }

        // method 0 is always a candidate, so a best always exists
        chunks.push(best.expect("empty stripe candidate list"));
    }

    let mut dst = vec![u8::from(flags)];

    let ulen =
        u32::try_from(src.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_uint7(&mut dst, ulen)?;

    for chunk in &chunks {
        let clen =
            u32::try_from(chunk.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        write_uint7(&mut dst, clen)?;
    }

    for chunk in &chunks {
        dst.extend_from_slice(chunk);
    }

    Ok(dst)
}

// A buffer written back to front, as the interleaved states emit their
// bytes in reverse stream order.
struct ReverseBuf {
    buf: Vec<u8>,
    pos: usize,
}

impl ReverseBuf {
    fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            pos: capacity,
        }
    }

    fn put_u16_le(&mut self, n: u16) {
        self.pos -= 2;
        self.buf[self.pos..self.pos + 2].copy_from_slice(&n.to_le_bytes());
    }

    fn put_u32_le(&mut self, n: u32) {
        self.pos -= 4;
        self.buf[self.pos..self.pos + 4].copy_from_slice(&n.to_le_bytes());
    }

    fn as_slice(&self) -> &[u8] {
        &self.buf[self.pos..]
    }
}

fn rans_enc_put(state: &mut u32, dst: &mut ReverseBuf, start: u32, freq: u32, shift: u32) {
    let x_max = ((LOWER_BOUND >> shift) << 16) * freq;

    let mut x = *state;

    if x >= x_max {
        dst.put_u16_le(x as u16);
        x >>= 16;
    }

    *state = ((x / freq) << shift) + (x % freq) + start;
}

pub(super) fn encode_order_0(src: &[u8]) -> io::Result<Vec<u8>> {
    if src.is_empty() {
        return Ok(Vec::new());
    }

    let mut freqs = [0u32; 256];

    for &b in src {
        freqs[usize::from(b)] += 1;
    }

    normalize_frequencies(&mut freqs, src.len(), TOTFREQ)?;

    let mut starts = [0u32; 256];
    let mut x = 0;

    for (start, &freq) in starts.iter_mut().zip(freqs.iter()) {
        *start = x;
        x += freq;
    }

    let mut dst = Vec::new();
    write_frequencies(&mut dst, &freqs)?;

    let mut buf = ReverseBuf::new(2 * src.len() + 64);
    let mut states = [LOWER_BOUND; 4];

    for i in (0..src.len()).rev() {
        let s = usize::from(src[i]);
        rans_enc_put(&mut states[i % 4], &mut buf, starts[s], freqs[s], TF_SHIFT);
    }

    for j in (0..4).rev() {
        buf.put_u32_le(states[j]);
    }

    dst.extend_from_slice(buf.as_slice());

    Ok(dst)
}

pub(super) fn encode_order_1(src: &[u8]) -> io::Result<Vec<u8>> {
    let quarter = src.len() / 4;

    // Per-context histograms: chains run within each quarter, with quarters
    // 1-3 seeded from the byte preceding them. The quarter-start bytes are
    // also counted under context 0, which is where the encoder puts them.
    let mut freqs = vec![[0u32; 256]; 256];
    let mut totals = [0u32; 256];

    for q in 0..4 {
        let start = q * quarter;
        let end = if q == 3 { src.len() } else { (q + 1) * quarter };

        let mut last = if q == 0 {
            0
        } else {
            usize::from(src[start - 1])
        };

        for &b in &src[start..end] {
            freqs[last][usize::from(b)] += 1;
            totals[last] += 1;
            last = usize::from(b);
        }
    }

    for q in 1..4 {
        freqs[0][usize::from(src[q * quarter])] += 1;
    }
    totals[0] += 3;

    let mut present = [false; 256];

    for &b in src {
        present[usize::from(b)] = true;
    }
    present[0] = true;

    let mut header = vec![0x00]; // uncompressed table marker
    write_alphabet(&mut header, &present)?;

    let mut starts = vec![[0u32; 256]; 256];

    for i in 0..256 {
        if !present[i] {
            continue;
        }

        // Contexts often total under TOTFREQ_O1; storing the raw counts is
        // smaller, with both sides normalizing after the table round-trips.
        if totals[i] > TOTFREQ_O1 {
            normalize_frequencies(&mut freqs[i], totals[i] as usize, TOTFREQ_O1)?;
        }

        write_frequencies_o1(&mut header, &present, &freqs[i])?;

        if totals[i] < TOTFREQ_O1 {
            normalize_frequencies(&mut freqs[i], totals[i] as usize, TOTFREQ_O1)?;
        }

        let mut x = 0;

        for (start, &freq) in starts[i].iter_mut().zip(freqs[i].iter()) {
            *start = x;
            x += freq;
        }
    }

    if header.len() > 1000 {
        let compressed_table = encode_order_0(&header[1..])?;

        if compressed_table.len() + 6 < header.len() {
            let mut packed_header = vec![0x01]; // compressed table marker
            write_uint7(&mut packed_header, (header.len() - 1) as u32)?;
            write_uint7(&mut packed_header, compressed_table.len() as u32)?;
            packed_header.extend_from_slice(&compressed_table);
            header = packed_header;
        }
    }

    let mut buf = ReverseBuf::new(2 * src.len() + 64);
    let mut states = [LOWER_BOUND; 4];

    let put = |states: &mut [u32; 4], buf: &mut ReverseBuf, j: usize, ctx: usize, sym: usize| {
        rans_enc_put(
            &mut states[j],
            buf,
            starts[ctx][sym],
            freqs[ctx][sym],
            TF_SHIFT_O1,
        );
    };

    // state 3 takes the remainder beyond the four even quarters
    let mut l3 = usize::from(src[src.len() - 1]);

    for i3 in ((4 * quarter - 1)..(src.len() - 1)).rev() {
        let c3 = usize::from(src[i3]);
        put(&mut states, &mut buf, 3, c3, l3);
        l3 = c3;
    }

    let mut l0 = usize::from(src[quarter - 1]);
    let mut l1 = usize::from(src[2 * quarter - 1]);
    let mut l2 = usize::from(src[3 * quarter - 1]);

    for i0 in (0..quarter - 1).rev() {
        let c0 = usize::from(src[i0]);
        let c1 = usize::from(src[i0 + quarter]);
        let c2 = usize::from(src[i0 + 2 * quarter]);
        let c3 = usize::from(src[i0 + 3 * quarter]);

        put(&mut states, &mut buf, 3, c3, l3);
        put(&mut states, &mut buf, 2, c2, l2);
        put(&mut states, &mut buf, 1, c1, l1);
        put(&mut states, &mut buf, 0, c0, l0);

        l0 = c0;
        l1 = c1;
        l2 = c2;
        l3 = c3;
    }

    // first byte of each quarter is encoded under context 0
    put(&mut states, &mut buf, 3, 0, l3);
    put(&mut states, &mut buf, 2, 0, l2);
    put(&mut states, &mut buf, 1, 0, l1);
    put(&mut states, &mut buf, 0, 0, l0);

    for j in (0..4).rev() {
        buf.put_u32_le(states[j]);
    }

    header.extend_from_slice(buf.as_slice());

    Ok(header)
}

pub(super) fn write_alphabet<W>(dst: &mut W, present: &[bool; 256]) -> io::Result<()>
where
    W: io::Write,
{
    let mut rle = 0;

    for j in 0..256 {
        if !present[j] {
            continue;
        }

        if rle > 0 {
            rle -= 1;
        } else {
            dst.write_all(&[j as u8])?;

            if j > 0 && present[j - 1] {
                // run of consecutive symbols
                let mut k = j + 1;

                while k < 256 && present[k] {
                    k += 1;
                }

                rle = k - (j + 1);
                dst.write_all(&[rle as u8])?;
            }
        }
    }

    dst.write_all(&[0x00])?;

    Ok(())
}

fn write_frequencies<W>(dst: &mut W, freqs: &[u32; 256]) -> io::Result<()>
where
    W: io::Write,
{
    let mut present = [false; 256];

    for (p, &f) in present.iter_mut().zip(freqs.iter()) {
        *p = f > 0;
    }

    write_alphabet(dst, &present)?;

    for &f in freqs.iter() {
        if f > 0 {
            write_uint7(dst, f)?;
        }
    }

    Ok(())
}

fn write_frequencies_o1(
    dst: &mut Vec<u8>,
    present: &[bool; 256],
    freqs: &[u32; 256],
) -> io::Result<()> {
    let mut dz: u32 = 0;

    for j in 0..256 {
        if !present[j] {
            continue;
        }

        if freqs[j] != 0 {
            if dz > 0 {
                dst.push(0x00);
                dst.push((dz - 1) as u8);
                dz = 0;
            }

            write_uint7(dst, freqs[j])?;
        } else {
            dz += 1;
        }
    }

    if dz > 0 {
        dst.push(0x00);
        dst.push((dz - 1) as u8);
    }

    Ok(())
}

// Bit-packs 2, 4, or 8 symbols into a byte, high bits first. The meta byte
// holds the packed width in its low 3 bits and the symbol count in the high
// 5; `None` means packing is not worthwhile.
fn pack(src: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut lut = [0u8; 256];
    let mut seen = [false; 256];

    for &b in src {
        seen[usize::from(b)] = true;
    }

    let mut meta = vec![0];
    let mut n = 0u32;

    for (i, &p) in seen.iter().enumerate() {
        if p {
            lut[i] = n as u8;
            meta.push(i as u8);
            n += 1;
        }
    }

    if n > 16 || src.len() < meta.len() + src.len() / 2 {
        return None;
    }

    let values_per_byte: usize = if n > 4 {
        2
    } else if n > 2 {
        4
    } else if n > 1 {
        8
    } else {
        0
    };

    meta[0] = if values_per_byte > 0 {
        (values_per_byte - 1) as u8
    } else {
        2
    };
    meta[0] |= (n as u8) << 3;

    let mut dst = Vec::with_capacity(src.len() / 2 + 1);

    match values_per_byte {
        2 => {
            for chunk in src.chunks(2) {
                let mut b = 0;
                for &v in chunk {
                    b = (b << 4) | lut[usize::from(v)];
                }
                b <<= 4 * (2 - chunk.len());
                dst.push(b);
            }
        }
        4 => {
            for chunk in src.chunks(4) {
                let mut b = 0;
                for &v in chunk {
                    b = (b << 2) | lut[usize::from(v)];
                }
                b <<= 2 * (4 - chunk.len());
                dst.push(b);
            }
        }
        8 => {
            for chunk in src.chunks(8) {
                let mut b = 0;
                for &v in chunk {
                    b = (b << 1) | lut[usize::from(v)];
                }
                b <<= 8 - chunk.len();
                dst.push(b);
            }
        }
        _ => {} // single symbol: no payload
    }

    Some((meta, dst))
}

// Two passes: score which symbols benefit from run-length encoding, then
// emit literals plus, for scored symbols, a 7-bit big-endian run length
// into the meta stream.
fn rle_encode(src: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut saved = [0i64; 256];
    let mut last = 256usize; // no previous symbol

    for &b in src {
        if usize::from(b) == last {
            saved[usize::from(b)] += 1;
        } else {
            saved[usize::from(b)] -= 1;
            last = usize::from(b);
        }
    }

    let mut meta = vec![0];

    for (i, &s) in saved.iter().enumerate() {
        if s > 0 {
            meta.push(i as u8);
        }
    }

    meta[0] = (meta.len() - 1) as u8; // 256 symbols wraps to 0

    let mut literals = Vec::with_capacity(src.len());

    let mut i = 0;

    while i < src.len() {
        let b = src[i];
        literals.push(b);

        if saved[usize::from(b)] > 0 {
            let mut run = 0u32;
            i += 1;

            while i < src.len() && src[i] == b {
                run += 1;
                i += 1;
            }

            // 7 bits at a time, most significant first
            let mut shift = 0;
            let mut x = run;

            loop {
                shift += 7;
                x >>= 7;

                if x == 0 {
                    break;
                }
            }

            loop {
                shift -= 7;
                let mut chunk = ((run >> shift) & 0x7f) as u8;

                if shift > 0 {
                    chunk |= 0x80;
                }

                meta.push(chunk);

                if shift == 0 {
                    break;
                }
            }
        } else {
            i += 1;
        }
    }

    if (literals.len() + meta.len()) as f64 >= 0.99 * src.len() as f64 {
        return None;
    }

    Some((meta, literals))
}

// RLE meta framing: varint(2 * meta_len + uncompressed_flag),
// varint(literal_len), then the meta either order-0 compressed (with its
// length) or verbatim.
fn write_rle_meta(dst: &mut Vec<u8>, meta: &[u8], literals_len: usize) -> io::Result<()> {
    let meta_len =
        u32::try_from(meta.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let literals_len =
        u32::try_from(literals_len).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let compressed_meta = encode_order_0(meta)?;

    if compressed_meta.len() < meta.len() {
        write_uint7(dst, meta_len * 2)?;
        write_uint7(dst, literals_len)?;
        write_uint7(dst, compressed_meta.len() as u32)?;
        dst.extend_from_slice(&compressed_meta);
    } else {
        write_uint7(dst, meta_len * 2 + 1)?;
        write_uint7(dst, literals_len)?;
        dst.extend_from_slice(meta);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_meta() {
        // 4 symbols -> 2 bits per value, high bits first
        let (meta, dst) = pack(b"ACGTACGTACGTACGT").expect("pack failed");
        assert_eq!(meta[0] & 0x07, 3); // 4 values per byte
        assert_eq!(meta[0] >> 3, 4);
        assert_eq!(&meta[1..], b"ACGT");
        assert_eq!(dst.len(), 4);

        // single symbol
        let (meta, dst) = pack(&[3; 100]).expect("pack failed");
        assert_eq!(meta[0] & 0x07, 2);
        assert_eq!(meta[0] >> 3, 1);
        assert!(dst.is_empty());

        // > 16 symbols is not packable
        let src: Vec<_> = (0..17u8).cycle().take(255).collect();
        assert!(pack(&src).is_none());
    }

    #[test]
    fn test_rle_encode_scores_symbols() {
        let src = b"aaaaaaaaaaaaaaaabcbcbcbc";
        let (meta, literals) = rle_encode(src).expect("rle failed");

        // only 'a' is worth run-length encoding
        assert_eq!(meta[0], 1);
        assert_eq!(meta[1], b'a');
        // literal stream: one 'a' plus the unencoded tail
        assert_eq!(literals[0], b'a');
        assert_eq!(&literals[1..], b"bcbcbcbc");
        // run of 15 after the first 'a'
        assert_eq!(meta[2], 15);
    }
}
