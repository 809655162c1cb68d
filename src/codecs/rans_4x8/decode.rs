use std::io::{self, Read};

use super::{LOWER_BOUND, Order, TF_SHIFT, TOTFREQ};
use crate::io::reader::num::{read_itf8, read_u8, read_u32_le};

/// Decodes a framed rANS 4x8 stream.
pub fn decode<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let order = read_u8(reader).and_then(Order::try_from)?;

    let compressed_len = read_u32_le(reader).map(|n| n as usize)?;
    let uncompressed_len = read_u32_le(reader).map(|n| n as usize)?;

    let mut payload = vec![0; compressed_len];
    reader.read_exact(&mut payload)?;

    if uncompressed_len == 0 {
        return Ok(Vec::new());
    }

    let mut src = &payload[..];

    match order {
        Order::Zero => decode_order_0(&mut src, uncompressed_len),
        Order::One => decode_order_1(&mut src, uncompressed_len),
    }
}

fn take_u8(src: &mut &[u8]) -> io::Result<u8> {
    let (&b, rest) = src
        .split_first()
        .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
    *src = rest;
    Ok(b)
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
    while *state < LOWER_BOUND {
        let Ok(b) = take_u8(src) else {
            break;
        };

        *state = (*state << 8) | u32::from(b);
    }
}

#[derive(Clone, Copy, Default)]
struct Slot {
    symbol: u8,
    freq: u16,
    bias: u16,
}

// Symbols ascending with run shorthand, each followed by an ITF8 frequency;
// a next byte equal to the current symbol + 1 marks a run start.
fn read_frequencies(src: &mut &[u8], slots: &mut [Slot]) -> io::Result<()> {
    let mut x = 0u32;
    let mut rle = 0;
    let mut j = usize::from(take_u8(src)?);

    loop {
        let f = read_itf8(src)
            .and_then(|n| u32::try_from(n).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)))?;

        if x + f > TOTFREQ {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid frequency table",
            ));
        }

        for y in 0..f {
            slots[(x + y) as usize] = Slot {
                symbol: j as u8,
                freq: f as u16,
                bias: y as u16,
            };
        }

        x += f;

        if rle > 0 {
            rle -= 1;
            j += 1;

            if j > 255 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid frequency table run",
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

    Ok(())
}

fn decode_order_0(src: &mut &[u8], dst_len: usize) -> io::Result<Vec<u8>> {
    let mut slots = vec![Slot::default(); (TOTFREQ + 1) as usize];
    read_frequencies(src, &mut slots)?;

    let mut states = [0u32; 4];

    for state in &mut states {
        *state = take_u32_le(src)?;
    }

    let mask = (1 << TF_SHIFT) - 1;
    let mut dst = Vec::with_capacity(dst_len);

    for i in 0..dst_len {
        let state = &mut states[i % 4];
        let slot = &slots[(*state & mask) as usize];

        if slot.freq == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid rANS state",
            ));
        }

        dst.push(slot.symbol);

        *state = u32::from(slot.freq) * (*state >> TF_SHIFT) + u32::from(slot.bias);
        rans_renorm(state, src);
    }

    Ok(dst)
}

fn decode_order_1(src: &mut &[u8], dst_len: usize) -> io::Result<Vec<u8>> {
    let mut tables: Vec<Option<Vec<Slot>>> = vec![None; 256];

    let mut rle = 0;
    let mut i = usize::from(take_u8(src)?);

    loop {
        let mut slots = vec![Slot::default(); (TOTFREQ + 1) as usize];
        read_frequencies(src, &mut slots)?;
        tables[i] = Some(slots);

        if rle > 0 {
            rle -= 1;
            i += 1;

            if i > 255 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid context table run",
                ));
            }
        } else if src.first().is_some_and(|&next| usize::from(next) == i + 1) {
            i = usize::from(take_u8(src)?);
            rle = usize::from(take_u8(src)?);
        } else {
            i = usize::from(take_u8(src)?);
        }

        if i == 0 {
            break;
        }
    }

    let mut states = [0u32; 4];

    for state in &mut states {
        *state = take_u32_le(src)?;
    }

    let quarter = dst_len / 4;
    let mask = (1 << TF_SHIFT) - 1;

    let mut dst = vec![0; dst_len];
    let mut contexts = [0usize; 4];

    let step = |state: &mut u32, ctx: &mut usize, src: &mut &[u8]| -> io::Result<u8> {
        let table = tables[*ctx].as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "missing context table")
        })?;

        let slot = &table[(*state & mask) as usize];

        if slot.freq == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid rANS state",
            ));
        }

        *state = u32::from(slot.freq) * (*state >> TF_SHIFT) + u32::from(slot.bias);
        rans_renorm(state, src);

        *ctx = usize::from(slot.symbol);

        Ok(slot.symbol)
    };

    for i in 0..quarter {
        for j in 0..4 {
            let mut state = states[j];
            let mut ctx = contexts[j];

            dst[j * quarter + i] = step(&mut state, &mut ctx, src)?;

            states[j] = state;
            contexts[j] = ctx;
        }
    }

    for i in (4 * quarter)..dst_len {
        let mut state = states[3];
        let mut ctx = contexts[3];

        dst[i] = step(&mut state, &mut ctx, src)?;

        states[3] = state;
        contexts[3] = ctx;
    }

    Ok(dst)
}
