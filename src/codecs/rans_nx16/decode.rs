use std::{
    cell::RefCell,
    io::{self, Read},
};

use super::{Flags, LOWER_BOUND, TF_SHIFT, TF_SHIFT_O1, TOTFREQ, TOTFREQ_O1, normalize_frequencies};
use crate::io::reader::num::{read_u8, read_uint7};

/// Decodes a rANS Nx16 stream.
///
/// `dst_len` is the expected output size, used when the stream carries no
/// size of its own.
pub fn decode<R>(reader: &mut R, dst_len: usize) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let order = read_u8(reader)?;
    let flags = Flags::from(order);

    if flags.contains(Flags::STRIPE) {
        return decode_stripe(reader, dst_len);
    }

    let uncompressed_len = if flags.contains(Flags::NO_SIZE) {
        dst_len
    } else {
        read_uint7(reader).map(|n| n as usize)?
    };

    let mut pack_meta = None;
    let mut packed_len = uncompressed_len;

    if flags.contains(Flags::PACK) {
        pack_meta = Some(read_pack_meta(reader)?);
        packed_len = read_uint7(reader).map(|n| n as usize)?;
    }

    let mut rle_meta = None;
    let mut entropy_len = packed_len;

    if flags.contains(Flags::RLE) {
        let (meta, literals_len) = read_rle_meta(reader)?;
        rle_meta = Some(meta);
        entropy_len = literals_len;
    }

    let data = if flags.contains(Flags::CAT) {
        let mut buf = vec![0; entropy_len];
        reader.read_exact(&mut buf)?;
        buf
    } else {
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest)?;
        let mut src = &rest[..];

        if flags.contains(Flags::ORDER) {
            decode_order_1(&mut src, entropy_len)?
        } else {
            decode_order_0(&mut src, entropy_len)?
        }
    };

    let data = match rle_meta {
        Some(meta) => rle_decode(&data, &meta, packed_len)?,
        None => data,
    };

    match pack_meta {
        Some((values_per_byte, map)) => unpack(&data, values_per_byte, &map, uncompressed_len),
        None => Ok(data),
    }
}

fn decode_stripe<R>(reader: &mut R, dst_len: usize) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let uncompressed_len = read_uint7(reader).map(|n| n as usize)?;

    if uncompressed_len != dst_len || uncompressed_len % 4 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid striped stream length",
        ));
    }

    let mut compressed_lens = [0; 4];

    for len in &mut compressed_lens {
        *len = read_uint7(reader).map(|n| n as usize)?;
    }

    let len4 = uncompressed_len / 4;
    let mut streams = Vec::with_capacity(4);

    for &compressed_len in &compressed_lens {
        let mut chunk = vec![0; compressed_len];
        reader.read_exact(&mut chunk)?;

        let stream = decode(&mut &chunk[..], len4)?;

        if stream.len() != len4 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "striped sub-stream length mismatch",
            ));
        }

        streams.push(stream);
    }

    let mut dst = vec![0; uncompressed_len];

    for (i, chunk) in dst.chunks_exact_mut(4).enumerate() {
        for (j, b) in chunk.iter_mut().enumerate() {
            *b = streams[j][i];
        }
    }

    Ok(dst)
}

fn take_u8(src: &mut &[u8]) -> io::Result<u8> {
    let (&b, rest) = src
        .split_first()
        .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
    *src = rest;
    Ok(b)
}

fn take_u16_le(src: &mut &[u8]) -> Option<u16> {
    if src.len() < 2 {
        return None;
    }

    let (buf, rest) = src.split_at(2);
    *src = rest;
    Some(u16::from_le_bytes([buf[0], buf[1]]))
}

fn take_u32_le(src: &mut &[u8]) -> io::Result<u32> {
    if src.len() < 4 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
    }

    let (buf, rest) = src.split_at(4);
    *src = rest;
    Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

fn rans_renorm(state: &mut u32, src: &mut &[u8]) {
    if *state < LOWER_BOUND
        && let Some(n) = take_u16_le(src)
    {
        *state = (*state << 16) | u32::from(n);
    }
}

pub(super) fn read_alphabet(src: &mut &[u8]) -> io::Result<[bool; 256]> {
    let mut present = [false; 256];

    let mut rle = 0;
    let mut j = usize::from(take_u8(src)?);

    loop {
        present[j] = true;

        if rle > 0 {
            rle -= 1;
            j += 1;

            if j > 255 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid alphabet run",
                ));
            }
        } else if src.first().is_some_and(|&next| usize::from(next) == j + 1) {
            j = usize::from(take_u8(src)?);
            rle = usize::from(take_u8(src)?);
        } else {
            j = usize::from(take_u8(src)?);
        }

        if j == 0 {
            break;
        }
    }

    Ok(present)
}

fn read_frequencies_0(src: &mut &[u8]) -> io::Result<[u32; 256]> {
    let present = read_alphabet(src)?;

    let mut freqs = [0u32; 256];

    for (freq, &p) in freqs.iter_mut().zip(present.iter()) {
        if p {
            *freq = read_uint7(src)?;
        }
    }

    Ok(freqs)
}

// Reads one context's frequencies; zeros are run-length encoded against the
// order-0 alphabet.
fn read_frequencies_1_context(
    src: &mut &[u8],
    present: &[bool; 256],
) -> io::Result<([u32; 256], u32)> {
    let mut freqs = [0u32; 256];
    let mut total = 0;
    let mut dz = 0;

    for (freq, &p) in freqs.iter_mut().zip(present.iter()) {
        if !p {
            continue;
        }

        let f = if dz > 0 {
            dz -= 1;
            0
        } else {
            let f = read_uint7(src)?;

            if f == 0 {
                dz = usize::from(take_u8(src)?);
            }

            f
        };

        *freq = f;
        total += f;
    }

    Ok((freqs, total))
}

#[derive(Clone, Copy, Default)]
struct Slot {
    symbol: u8,
    freq: u16,
    bias: u16,
}

pub(super) fn decode_order_0(src: &mut &[u8], dst_len: usize) -> io::Result<Vec<u8>> {
    if dst_len == 0 {
        return Ok(Vec::new());
    }

    let freqs = read_frequencies_0(src)?;

    let mut slots = Vec::with_capacity(TOTFREQ as usize);

    for (j, &f) in freqs.iter().enumerate() {
        if slots.len() + f as usize > TOTFREQ as usize {
            return Err(invalid_frequency_table());
        }

        for y in 0..f {
            slots.push(Slot {
                symbol: j as u8,
                freq: f as u16,
                bias: y as u16,
            });
        }
    }

    if slots.len() != TOTFREQ as usize {
        return Err(invalid_frequency_table());
    }

    let mut states = [0u32; 4];

    for state in &mut states {
        *state = take_u32_le(src)?;

        if *state < LOWER_BOUND {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid rANS state",
            ));
        }
    }

    let mask = TOTFREQ - 1;
    let mut dst = Vec::with_capacity(dst_len);

    for i in 0..dst_len {
        let state = &mut states[i & 3];
        let slot = &slots[(*state & mask) as usize];

        dst.push(slot.symbol);

        *state = u32::from(slot.freq) * (*state >> TF_SHIFT) + u32::from(slot.bias);
        rans_renorm(state, src);
    }

    Ok(dst)
}

// The 256 x TOTFREQ_O1 state-to-symbol table is large; it is allocated once
// per thread and reused across blocks. Contexts unused by the current table
// keep stale entries, which only a malformed stream can reach.
thread_local! {
    static SYMBOL_TABLE: RefCell<Vec<Slot>> = const { RefCell::new(Vec::new()) };
}

fn decode_order_1(src: &mut &[u8], dst_len: usize) -> io::Result<Vec<u8>> {
    SYMBOL_TABLE.with(|cell| {
        let mut table = cell.borrow_mut();

        if table.len() != 256 * TOTFREQ_O1 as usize {
            table.resize(256 * TOTFREQ_O1 as usize, Slot::default());
        }

        decode_order_1_inner(src, dst_len, &mut table)
    })
}

// Fills the per-context symbol table from the serialized frequencies,
// consuming the table bytes from `src`.
fn read_order_1_table(src: &mut &[u8], table: &mut [Slot]) -> io::Result<()> {
    let present = read_alphabet(src)?;

    for i in 0..256 {
        if !present[i] {
            continue;
        }

        let (mut freqs, total) = read_frequencies_1_context(src, &present)?;

        if total == 0 {
            continue;
        }

        if total < TOTFREQ_O1 {
            normalize_frequencies(&mut freqs, total as usize, TOTFREQ_O1)?;
        }

        let context = &mut table[i * TOTFREQ_O1 as usize..(i + 1) * TOTFREQ_O1 as usize];
        let mut x = 0usize;

        for (j, &f) in freqs.iter().enumerate() {
            if f == 0 {
                continue;
            }

            if x + f as usize > TOTFREQ_O1 as usize {
                return Err(invalid_frequency_table());
            }

            for y in 0..f as usize {
                context[x + y] = Slot {
                    symbol: j as u8,
                    freq: f as u16,
                    bias: y as u16,
                };
            }

            x += f as usize;
        }

        if x != TOTFREQ_O1 as usize {
            return Err(invalid_frequency_table());
        }
    }

    Ok(())
}

fn decode_order_1_inner(
    src: &mut &[u8],
    dst_len: usize,
    table: &mut [Slot],
) -> io::Result<Vec<u8>> {
    let marker = take_u8(src)?;

    if marker == 1 {
        // the frequency table is itself order-0 compressed
        let u_size = read_uint7(src).map(|n| n as usize)?;
        let c_size = read_uint7(src).map(|n| n as usize)?;

        if c_size > src.len() {
            return Err(invalid_frequency_table());
        }

        let (chunk, rest) = src.split_at(c_size);
        *src = rest;

        let mut chunk_src = chunk;
        let uncompressed_table = decode_order_0(&mut chunk_src, u_size)?;
        read_order_1_table(&mut &uncompressed_table[..], table)?;
    } else {
        read_order_1_table(src, table)?;
    }

    let mut states = [0u32; 4];

    for state in &mut states {
        *state = take_u32_le(src)?;

        if *state < LOWER_BOUND {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid rANS state",
            ));
        }
    }

    let quarter = dst_len / 4;
    let mask = TOTFREQ_O1 - 1;

    let mut dst = vec![0; dst_len];
    let mut contexts = [0usize; 4];

    for i in 0..quarter {
        for j in 0..4 {
            let state = &mut states[j];
            let slot = &table[contexts[j] * TOTFREQ_O1 as usize + (*state & mask) as usize];

            dst[j * quarter + i] = slot.symbol;

            *state = u32::from(slot.freq) * (*state >> TF_SHIFT_O1) + u32::from(slot.bias);
            rans_renorm(state, src);

            contexts[j] = usize::from(slot.symbol);
        }
    }

    // state 3 covers the remainder
    for b in dst.iter_mut().take(dst_len).skip(4 * quarter) {
        let state = &mut states[3];
        let slot = &table[contexts[3] * TOTFREQ_O1 as usize + (*state & mask) as usize];

        *b = slot.symbol;

        *state = u32::from(slot.freq) * (*state >> TF_SHIFT_O1) + u32::from(slot.bias);
        rans_renorm(state, src);

        contexts[3] = usize::from(slot.symbol);
    }

    Ok(dst)
}

fn read_pack_meta<R>(reader: &mut R) -> io::Result<(usize, [u8; 16])>
where
    R: Read,
{
    let b = read_u8(reader)?;

    let mut values_per_byte = usize::from(b & 0x07) + 1;

    if values_per_byte == 3 {
        values_per_byte = 0;
    }

    let mut map = [0; 16];

    if values_per_byte != 1 {
        let count = usize::from(b >> 3);

        if count > 16 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid pack symbol count",
            ));
        }

        for slot in map.iter_mut().take(count.max(1)) {
            *slot = read_u8(reader)?;
        }
    }

    Ok((values_per_byte, map))
}

fn read_rle_meta<R>(reader: &mut R) -> io::Result<(Vec<u8>, usize)>
where
    R: Read,
{
    let meta_len = read_uint7(reader).map(|n| n as usize)?;
    let literals_len = read_uint7(reader).map(|n| n as usize)?;

    let meta = if meta_len & 1 == 1 {
        let mut buf = vec![0; meta_len / 2];
        reader.read_exact(&mut buf)?;
        buf
    } else {
        let compressed_len = read_uint7(reader).map(|n| n as usize)?;

        let mut buf = vec![0; compressed_len];
        reader.read_exact(&mut buf)?;

        decode_order_0(&mut &buf[..], meta_len / 2)?
    };

    Ok((meta, literals_len))
}

fn rle_decode(literals: &[u8], meta: &[u8], dst_len: usize) -> io::Result<Vec<u8>> {
    if meta.is_empty() || usize::from(meta[0]) >= meta.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid RLE metadata",
        ));
    }

    let mut saved = [false; 256];
    let mut m = 0;

    let mut count = usize::from(meta[m]);
    m += 1;

    if count == 0 {
        count = 256;
    }

    while count > 0 && m < meta.len() {
        saved[usize::from(meta[m])] = true;
        m += 1;
        count -= 1;
    }

    let mut dst = Vec::with_capacity(dst_len);

    for &b in literals {
        if saved[usize::from(b)] {
            let mut run = 0u32;

            loop {
                let c = meta.get(m).copied().unwrap_or(0);
                m += 1;
                run = (run << 7) | u32::from(c & 0x7f);

                if c & 0x80 == 0 {
                    break;
                }
            }

            if m > meta.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "truncated RLE run",
                ));
            }

            for _ in 0..=run {
                if dst.len() == dst_len {
                    break;
                }

                dst.push(b);
            }
        } else {
            if dst.len() >= dst_len {
                break;
            }

            dst.push(b);
        }
    }

    if dst.len() != dst_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "RLE output length mismatch",
        ));
    }

    Ok(dst)
}

fn unpack(src: &[u8], values_per_byte: usize, map: &[u8; 16], dst_len: usize) -> io::Result<Vec<u8>> {
    match values_per_byte {
        1 => Ok(src.to_vec()),
        0 => Ok(vec![map[0]; dst_len]),
        2 | 4 | 8 => {
            if src.len() * values_per_byte < dst_len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "packed stream too short",
                ));
            }

            let bits = 8 / values_per_byte;
            let mask = ((1u16 << bits) - 1) as u8;

            let mut dst = Vec::with_capacity(dst_len);

            'outer: for &b in src {
                // high bits first
                for x in (0..values_per_byte).rev() {
                    if dst.len() == dst_len {
                        break 'outer;
                    }

                    dst.push(map[usize::from((b >> (bits * x)) & mask)]);
                }
            }

            Ok(dst)
        }
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid pack meta",
        )),
    }
}

fn invalid_frequency_table() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "invalid frequency table")
}
