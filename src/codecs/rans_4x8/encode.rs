use std::io::{self, Write};

use super::{LOWER_BOUND, Order, TF_SHIFT, TOTFREQ};
use crate::io::writer::num::{write_itf8, write_u32_le};

/// Encodes `src` as a framed rANS 4x8 stream.
pub fn encode(mut order: Order, src: &[u8]) -> io::Result<Vec<u8>> {
    if order == Order::One && src.len() < 4 {
        order = Order::Zero;
    }

    let payload = match order {
        Order::Zero => encode_order_0(src)?,
        Order::One => encode_order_1(src)?,
    };

    let mut dst = Vec::with_capacity(payload.len() + 9);

    dst.push(u8::from(order));

    let compressed_len =
        u32::try_from(payload.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_u32_le(&mut dst, compressed_len)?;

    let uncompressed_len =
        u32::try_from(src.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_u32_le(&mut dst, uncompressed_len)?;

    dst.extend_from_slice(&payload);

    Ok(dst)
}

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

    fn put_u8(&mut self, n: u8) {
        self.pos -= 1;
        self.buf[self.pos] = n;
    }

    fn put_u32_le(&mut self, n: u32) {
        self.pos -= 4;
        self.buf[self.pos..self.pos + 4].copy_from_slice(&n.to_le_bytes());
    }

    fn as_slice(&self) -> &[u8] {
        &self.buf[self.pos..]
    }
}

fn rans_enc_put(state: &mut u32, dst: &mut ReverseBuf, start: u32, freq: u32) {
    let x_max = ((LOWER_BOUND >> TF_SHIFT) << 8) * freq;

    let mut x = *state;

    while x >= x_max {
        dst.put_u8(x as u8);
        x >>= 8;
    }

    *state = ((x / freq) << TF_SHIFT) + (x % freq) + start;
}

fn encode_order_0(src: &[u8]) -> io::Result<Vec<u8>> {
    if src.is_empty() {
        return Ok(Vec::new());
    }

    let mut freqs = [0u32; 256];

    for &b in src {
        freqs[usize::from(b)] += 1;
    }

    normalize_frequencies(&mut freqs, src.len());

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
        rans_enc_put(&mut states[i % 4], &mut buf, starts[s], freqs[s]);
    }

    for j in (0..4).rev() {
        buf.put_u32_le(states[j]);
    }

    dst.extend_from_slice(buf.as_slice());

    Ok(dst)
}

fn encode_order_1(src: &[u8]) -> io::Result<Vec<u8>> {
    let quarter = src.len() / 4;

    let mut freqs = vec![[0u32; 256]; 256];
    let mut totals = [0u32; 256];

    let mut last = 0;

    for &b in src {
        freqs[last][usize::from(b)] += 1;
        totals[last] += 1;
        last = usize::from(b);
    }

    // quarter-start bytes are encoded under context 0
    for q in 1..4 {
        freqs[0][usize::from(src[q * quarter])] += 1;
    }
    totals[0] += 3;

    let mut starts = vec![[0u32; 256]; 256];

    for i in 0..256 {
        if totals[i] == 0 {
            continue;
        }

        normalize_frequencies(&mut freqs[i], totals[i] as usize);

        let mut x = 0;

        for (start, &freq) in starts[i].iter_mut().zip(freqs[i].iter()) {
            *start = x;
            x += freq;
        }
    }

    let mut dst = Vec::new();
    write_frequencies_1(&mut dst, &freqs, &totals)?;

    let mut buf = ReverseBuf::new(2 * src.len() + 64);
    let mut states = [LOWER_BOUND; 4];

    let put = |states: &mut [u32; 4], buf: &mut ReverseBuf, j: usize, ctx: usize, sym: usize| {
        rans_enc_put(&mut states[j], buf, starts[ctx][sym], freqs[ctx][sym]);
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

    for i0 in (0..quarter.saturating_sub(1)).rev() {
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

    put(&mut states, &mut buf, 3, 0, l3);
    put(&mut states, &mut buf, 2, 0, l2);
    put(&mut states, &mut buf, 1, 0, l1);
    put(&mut states, &mut buf, 0, 0, l0);

    for j in (0..4).rev() {
        buf.put_u32_le(states[j]);
    }

    dst.extend_from_slice(buf.as_slice());

    Ok(dst)
}

// Scales frequencies so present symbols total exactly TOTFREQ, each >= 1.
fn normalize_frequencies(freqs: &mut [u32; 256], size: usize) {
    if size == 0 {
        return;
    }

    let mut max_freq = 0;
    let mut max_sym = 0;
    let mut sum = 0i64;

    for (j, f) in freqs.iter_mut().enumerate() {
        if *f == 0 {
            continue;
        }

        if max_freq < *f {
            max_freq = *f;
            max_sym = j;
        }

        *f = ((u64::from(*f) * u64::from(TOTFREQ)) / size as u64) as u32;

        if *f == 0 {
            *f = 1;
        }

        sum += i64::from(*f);
    }

    let mut adjust = i64::from(TOTFREQ) - sum;

    if adjust >= 0 || i64::from(freqs[max_sym]) > -adjust {
        freqs[max_sym] = (i64::from(freqs[max_sym]) + adjust) as u32;
    } else {
        adjust += i64::from(freqs[max_sym]) - 1;
        freqs[max_sym] = 1;

        for f in freqs.iter_mut() {
            if adjust == 0 {
                break;
            }

            if *f < 2 {
                continue;
            }

            let m = if i64::from(*f) > -adjust {
                adjust
            } else {
                1 - i64::from(*f)
            };

            *f = (i64::from(*f) + m) as u32;
            adjust -= m;
        }
    }
}

// Symbols ascending, with consecutive runs shortened to a start symbol plus
// a count; each present symbol's frequency follows as an ITF8.
fn write_frequencies<W>(dst: &mut W, freqs: &[u32; 256]) -> io::Result<()>
where
    W: Write,
{
    let mut rle = 0;

    for j in 0..256 {
        let f = freqs[j];

        if f == 0 {
            continue;
        }

        if rle > 0 {
            rle -= 1;
        } else {
            dst.write_all(&[j as u8])?;

            if j > 0 && freqs[j - 1] > 0 {
                let mut k = j + 1;

                while k < 256 && freqs[k] > 0 {
                    k += 1;
                }

                rle = k - (j + 1);
                dst.write_all(&[rle as u8])?;
            }
        }

        write_itf8(
            dst,
            i32::try_from(f).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
        )?;
    }

    dst.write_all(&[0x00])?;

    Ok(())
}

fn write_frequencies_1<W>(
    dst: &mut W,
    freqs: &[[u32; 256]],
    totals: &[u32; 256],
) -> io::Result<()>
where
    W: Write,
{
    let mut rle = 0;

    for i in 0..256 {
        if totals[i] == 0 {
            continue;
        }

        if rle > 0 {
            rle -= 1;
        } else {
            dst.write_all(&[i as u8])?;

            if i > 0 && totals[i - 1] > 0 {
                let mut k = i + 1;

                while k < 256 && totals[k] > 0 {
                    k += 1;
                }

                rle = k - (i + 1);
                dst.write_all(&[rle as u8])?;
            }
        }

        write_frequencies(dst, &freqs[i])?;
    }

    dst.write_all(&[0x00])?;

    Ok(())
}
