use std::io;

use super::{Flags, Model, RangeCoder};
use crate::io::writer::num::write_uint7;

pub(super) const MAX_RUN: usize = 4;
pub(super) const RLE_NUM_SYMBOLS: usize = 258;

// Per-stream candidate methods for the 4-way stripe transform. The first
// byte of a little-endian value varies the most, so it gets the larger list.
const STRIPE_METHODS: [&[u8]; 4] = [&[1, 64, 0], &[1, 0], &[1, 128], &[1, 128]];

/// Encodes `src` as an arithmetic-coded stream with the requested
/// transforms.
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
    let mut data = src;

    if flags.contains(Flags::PACK) && !data.is_empty() {
        // An alphabet over 16 symbols degenerates to a 1-byte raw marker;
        // the flag is kept and the decoder sees it as a passthrough map.
        let (meta, buf) = pack(data);
        dst.extend_from_slice(&meta);

        let packed_len =
            u32::try_from(buf.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        write_uint7(&mut dst, packed_len)?;

        packed = buf;
        data = &packed;
    } else if flags.contains(Flags::PACK) {
        flags.remove(Flags::PACK);
    }

    if flags.contains(Flags::RLE) && data.is_empty() {
        flags.remove(Flags::RLE);
    }

    if flags.contains(Flags::ORDER) && data.len() < 8 {
        flags.remove(Flags::ORDER);
    }

    let compressed = if flags.contains(Flags::EXT) {
        crate::codecs::bzip2::encode(bzip2::Compression::new(9), data)?
    } else if flags.contains(Flags::RLE) {
        if flags.contains(Flags::ORDER) {
            encode_order_1_rle(data)?
        } else {
            encode_order_0_rle(data)?
        }
    } else if flags.contains(Flags::ORDER) {
        encode_order_1(data)?
    } else {
        encode_order_0(data)?
    };

    if compressed.len() >= data.len() {
        // No entropy win: store the (possibly packed) data verbatim.
        flags.remove(Flags::ORDER);
        flags.remove(Flags::EXT);
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

    for (i, stream) in transposed.chunks_exact(len4.max(1)).take(4).enumerate() {
        let mut best: Option<Vec<u8>> = None;

        for &method in STRIPE_METHODS[i] {
            if !flags.contains(Flags::ORDER) && method & 0x01 != 0 {
                continue;
            }

            let buf = encode(Flags::from(method) | Flags::NO_SIZE, stream)?;

            if best.as_ref().is_none_or(|b| buf.len() < b.len()) {
                best = Some(buf);
            }
        }

        match best {
            Some(buf) => chunks.push(buf),
            None => chunks.push(encode(Flags::NO_SIZE, stream)?),
        }
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

// The stored max-symbol byte wraps: 256 is written as 0 and read back as 256.
pub(super) fn max_symbol_count(src: &[u8]) -> usize {
    src.iter().copied().max().map_or(1, |m| usize::from(m) + 1)
}

fn encode_order_0(src: &[u8]) -> io::Result<Vec<u8>> {
    let num_symbols = max_symbol_count(src);
    let mut dst = vec![(num_symbols & 0xff) as u8];

    let mut range_coder = RangeCoder::default();
    let mut model = Model::new(num_symbols);

    for &b in src {
        model.encode(&mut dst, &mut range_coder, u16::from(b))?;
    }

    range_coder.range_encode_end(&mut dst)?;

    Ok(dst)
}

fn encode_order_1(src: &[u8]) -> io::Result<Vec<u8>> {
    let num_symbols = max_symbol_count(src);
    let mut dst = vec![(num_symbols & 0xff) as u8];

    let mut range_coder = RangeCoder::default();
    let mut models: Vec<_> = (0..256).map(|_| Model::new(num_symbols)).collect();

    let mut last = 0;

    for &b in src {
        models[last].encode(&mut dst, &mut range_coder, u16::from(b))?;
        last = usize::from(b);
    }

    range_coder.range_encode_end(&mut dst)?;

    Ok(dst)
}

fn encode_order_0_rle(src: &[u8]) -> io::Result<Vec<u8>> {
    let num_symbols = max_symbol_count(src);
    let mut dst = vec![(num_symbols & 0xff) as u8];

    let mut range_coder = RangeCoder::default();
    let mut literal_model = Model::new(num_symbols);
    let mut run_models: Vec<_> = (0..RLE_NUM_SYMBOLS).map(|_| Model::new(MAX_RUN)).collect();

    let mut i = 0;

    while i < src.len() {
        let b = src[i];
        literal_model.encode(&mut dst, &mut range_coder, u16::from(b))?;

        i += 1;
        encode_run(&mut dst, &mut range_coder, &mut run_models, src, &mut i, b)?;
    }

    range_coder.range_encode_end(&mut dst)?;

    Ok(dst)
}

fn encode_order_1_rle(src: &[u8]) -> io::Result<Vec<u8>> {
    let num_symbols = max_symbol_count(src);
    let mut dst = vec![(num_symbols & 0xff) as u8];

    let mut range_coder = RangeCoder::default();
    let mut literal_models: Vec<_> = (0..256).map(|_| Model::new(num_symbols)).collect();
    let mut run_models: Vec<_> = (0..RLE_NUM_SYMBOLS).map(|_| Model::new(MAX_RUN)).collect();

    let mut last = 0;
    let mut i = 0;

    while i < src.len() {
        let b = src[i];
        literal_models[usize::from(last)].encode(&mut dst, &mut range_coder, u16::from(b))?;
        last = b;

        i += 1;
        encode_run(&mut dst, &mut range_coder, &mut run_models, src, &mut i, b)?;
    }

    range_coder.range_encode_end(&mut dst)?;

    Ok(dst)
}

// Emits the run following the literal at `*i - 1`, advancing `*i` past it.
// The run context starts at the literal value and moves to a dedicated
// continuation context after the first length symbol.
fn encode_run(
    dst: &mut Vec<u8>,
    range_coder: &mut RangeCoder,
    run_models: &mut [Model],
    src: &[u8],
    i: &mut usize,
    literal: u8,
) -> io::Result<()> {
    let mut run = 0;

    while *i < src.len() && src[*i] == literal {
        run += 1;
        *i += 1;
    }

    let last = usize::from(literal);
    let mut run_ctx = last;

    loop {
        let c = run.min(MAX_RUN - 1);
        run_models[run_ctx].encode(dst, range_coder, c as u16)?;
        run -= c;

        if run_ctx == last {
            run_ctx = 256;
        } else if run_ctx < RLE_NUM_SYMBOLS - 1 {
            run_ctx += 1;
        }

        if c == MAX_RUN - 1 && run == 0 {
            run_models[run_ctx].encode(dst, range_coder, 0)?;
        }

        if run == 0 {
            break;
        }
    }

    Ok(())
}

// Bit-packs 2, 4, or 8 symbols into a byte. The meta block is the symbol
// count followed by the symbol map; count 255 marks data left unpacked.
// Fields fill each byte from the low bits up.
fn pack(src: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut lut = [0u8; 256];
    let mut seen = [false; 256];

    for &b in src {
        seen[usize::from(b)] = true;
    }

    let mut meta = vec![0];
    let mut n = 0u32;

    for (i, &present) in seen.iter().enumerate() {
        if present {
            lut[i] = n as u8;
            meta.push(i as u8);
            n += 1;
        }
    }

    if n > 16 || src.len() < meta.len() + src.len() / 2 {
        return (vec![255], src.to_vec());
    }

    meta[0] = n as u8;

    let mut dst = Vec::with_capacity(src.len() / 2 + 1);

    if n > 4 {
        // 2 values per byte
        for chunk in src.chunks(2) {
            let mut b = 0;
            for (x, &v) in chunk.iter().enumerate() {
                b |= lut[usize::from(v)] << (4 * x);
            }
            dst.push(b);
        }
    } else if n > 2 {
        // 4 values per byte
        for chunk in src.chunks(4) {
            let mut b = 0;
            for (x, &v) in chunk.iter().enumerate() {
                b |= lut[usize::from(v)] << (2 * x);
            }
            dst.push(b);
        }
    } else if n > 1 {
        // 8 values per byte
        for chunk in src.chunks(8) {
            let mut b = 0;
            for (x, &v) in chunk.iter().enumerate() {
                b |= lut[usize::from(v)] << x;
            }
            dst.push(b);
        }
    }
    // single symbol: zero bits per value, no data at all

    (meta, dst)
}
