use std::{io, num::NonZero};

use super::{
    Models,
    parameters::{Flags, parameter},
};
use crate::{
    codecs::aac::RangeCoder,
    io::reader::num::{read_u8, read_u16_le, read_uint7},
};

/// Decodes an fqzcomp stream back into concatenated quality scores.
///
/// Reverse-strand records are re-reversed on output, so the result matches
/// the original record orientation.
pub fn decode(mut src: &[u8]) -> io::Result<Vec<u8>> {
    let reader = &mut src;

    let uncompressed_len = read_uint7(reader).map(|n| n as usize)?;

    let parameters = read_parameters(reader)?;

    let mut models = Models::new(parameters.symbol_count, parameters.selector_count);
    let mut range_coder = RangeCoder::default();
    range_coder.range_decode_init(reader)?;

    let mut dst = Vec::with_capacity(uncompressed_len);
    let mut records: Vec<(usize, bool)> = Vec::new();

    let mut first_len: Vec<bool> = vec![true; parameters.params.len()];
    let mut last_lens: Vec<usize> = vec![0; parameters.params.len()];

    let mut p = 0;
    let mut x = 0;
    let mut last = 0u32;
    let mut qlast = 0u32;
    let mut selector = 0u8;
    let mut delta = 0u32;
    let mut prev_q = 0u8;

    while dst.len() < uncompressed_len {
        if p == 0 {
            if let Some(sel_model) = models.sel.as_mut() {
                selector = sel_model.decode(reader, &mut range_coder)? as u8;

                x = if parameters.gflags.contains(Flags::HAVE_S_TAB) {
                    usize::from(parameters.s_tab[usize::from(selector)])
                } else {
                    usize::from(selector)
                };
            } else {
                x = usize::from(parameters.s_tab[0]);
            }

            if x >= parameters.params.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid parameter selector",
                ));
            }

            let param = &parameters.params[x];

            let rec_len = if !param.flags.is_fixed_length() || first_len[x] {
                let n = decode_length(reader, &mut range_coder, &mut models)?;
                first_len[x] = false;
                last_lens[x] = n;
                n
            } else {
                last_lens[x]
            };

            if rec_len == 0 || dst.len() + rec_len > uncompressed_len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid record length",
                ));
            }

            let is_reverse = if parameters.gflags.contains(Flags::DO_REV) {
                models.rev.decode(reader, &mut range_coder)? == 1
            } else {
                false
            };

            records.push((rec_len, is_reverse));

            if param.flags.has_duplicates()
                && models.dup.decode(reader, &mut range_coder)? == 1
            {
                if rec_len > dst.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "invalid duplicate record",
                    ));
                }

                let start = dst.len() - rec_len;
                dst.extend_from_within(start..start + rec_len);
                continue;
            }

            p = rec_len;
            last = u32::from(param.context);
            qlast = 0;
            delta = 0;
            prev_q = 0;
        }

        let param = &parameters.params[x];

        let qq = models.qual[usize::from(last as u16)].decode(reader, &mut range_coder)? as u8;

        let q = param.q_map.get(usize::from(qq)).copied().unwrap_or(qq);
        dst.push(q);

        qlast = (qlast << param.q_shift)
            .overflowing_add(u32::from(param.q_tab[usize::from(qq)]))
            .0;
        last = u32::from(param.context);
        last += (qlast & ((1 << param.q_bits) - 1)) << param.q_loc;

        if param.flags.has_positions_table() {
            last += u32::from(param.p_tab[p.min(1023)]) << param.p_loc;
        }

        if param.flags.has_deltas_table() {
            let d = delta.min(255) as usize;
            last += u32::from(param.d_tab[d]) << param.d_loc;

            if prev_q != qq {
                delta += 1;
            }

            prev_q = qq;
        }

        if param.flags.has_selector() {
            last += u32::from(selector) << param.s_loc;
        }

        last &= 0xffff;
        p -= 1;
    }

    if parameters.gflags.contains(Flags::DO_REV) {
        let mut offset = 0;

        for &(rec_len, is_reverse) in &records {
            let end = (offset + rec_len).min(dst.len());

            if is_reverse {
                dst[offset..end].reverse();
            }

            offset = end;
        }
    }

    Ok(dst)
}

struct Parameters {
    gflags: Flags,
    s_tab: Vec<u8>,
    params: Vec<Parameter>,
    symbol_count: NonZero<usize>,
    selector_count: Option<NonZero<usize>>,
}

struct Parameter {
    context: u16,
    flags: parameter::Flags,

    q_bits: u8,
    q_shift: u8,
    q_loc: u8,
    s_loc: u8,
    p_loc: u8,
    d_loc: u8,

    q_map: Vec<u8>,
    q_tab: Vec<u8>,
    p_tab: Vec<u8>,
    d_tab: Vec<u8>,
}

fn read_parameters(reader: &mut &[u8]) -> io::Result<Parameters> {
    let version = read_u8(reader)?;

    if version != 5 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported fqzcomp format version: {version}"),
        ));
    }

    let gflags = read_u8(reader).map(Flags::from)?;

    let n_param = if gflags.contains(Flags::MULTI_PARAM) {
        read_u8(reader).map(usize::from)?
    } else {
        1
    };

    if n_param == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "no parameter blocks",
        ));
    }

    let mut max_sel = 0;
    let s_tab;

    if gflags.contains(Flags::HAVE_S_TAB) {
        max_sel = read_u8(reader)?;
        s_tab = read_array(reader, 256)?;
    } else {
        let mut tab = vec![(n_param - 1) as u8; 256];

        for (i, entry) in tab.iter_mut().enumerate().take(n_param) {
            *entry = i as u8;
        }

        s_tab = tab;
    }

    let mut params = Vec::with_capacity(n_param);
    let mut max_symbol_count = 1;

    for _ in 0..n_param {
        let (param, symbol_count) = read_single_parameter(reader)?;
        max_symbol_count = max_symbol_count.max(symbol_count);
        params.push(param);
    }

    let selector_count = if gflags.contains(Flags::HAVE_S_TAB) {
        NonZero::new(usize::from(max_sel) + 1)
    } else if gflags.contains(Flags::MULTI_PARAM) {
        NonZero::new(n_param)
    } else {
        None
    };

    Ok(Parameters {
        gflags,
        s_tab,
        params,
        symbol_count: NonZero::new(max_symbol_count).unwrap(),
        selector_count,
    })
}

fn read_single_parameter(reader: &mut &[u8]) -> io::Result<(Parameter, usize)> {
    let context = read_u16_le(reader)?;
    let flags = read_u8(reader).map(parameter::Flags::from)?;
    let max_sym = read_u8(reader)?;

    let b = read_u8(reader)?;
    let q_bits = b >> 4;
    let q_shift = b & 0x0f;

    let b = read_u8(reader)?;
    let q_loc = b >> 4;
    let s_loc = b & 0x0f;

    let b = read_u8(reader)?;
    let p_loc = b >> 4;
    let d_loc = b & 0x0f;

    let q_map = if flags.has_quality_map() {
        let mut map = vec![0; usize::from(max_sym) + 1];

        for entry in &mut map {
            *entry = read_u8(reader)?;
        }

        map
    } else {
        Vec::new()
    };

    let q_tab = if flags.has_qualities_table() {
        read_array(reader, 256)?
    } else {
        (0..=u8::MAX).collect()
    };

    let p_tab = if flags.has_positions_table() {
        read_array(reader, 1024)?
    } else {
        vec![0; 1024]
    };

    let d_tab = if flags.has_deltas_table() {
        read_array(reader, 256)?
    } else {
        vec![0; 256]
    };

    let symbol_count = usize::from(max_sym) + 1;

    let param = Parameter {
        context,
        flags,
        q_bits,
        q_shift,
        q_loc,
        s_loc,
        p_loc,
        d_loc,
        q_map,
        q_tab,
        p_tab,
        d_tab,
    };

    Ok((param, symbol_count))
}

// Inverts the two-level RLE of `write_array`: an RLE over run-length bytes,
// which in turn give per-value run lengths in 255-clamped chunks.
pub(super) fn read_array(reader: &mut &[u8], size: usize) -> io::Result<Vec<u8>> {
    let mut array = vec![0; size];

    let mut j = 0; // output position
    let mut value = 0u32;

    // level-2 state: a token equal to the previous distinct token is
    // followed by a repeat count
    let mut last: i32 = -1;
    let mut pending = 0u32;

    while j < size {
        if value > 255 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid array encoding",
            ));
        }

        let mut run = 0usize;

        loop {
            let t = if pending > 0 {
                pending -= 1;
                last as u8
            } else {
                let t = read_u8(reader)?;

                if i32::from(t) == last {
                    pending = read_u8(reader).map(u32::from)?;
                } else {
                    last = i32::from(t);
                }

                t
            };

            run += usize::from(t);

            if t != 255 {
                break;
            }
        }

        for _ in 0..run {
            if j == size {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "array run overflow",
                ));
            }

            array[j] = value as u8;
            j += 1;
        }

        value += 1;
    }

    Ok(array)
}

fn decode_length(
    reader: &mut &[u8],
    range_coder: &mut RangeCoder,
    models: &mut Models,
) -> io::Result<usize> {
    let mut n = 0u32;

    for (shift, model) in models.len.iter_mut().enumerate() {
        let b = model.decode(reader, range_coder)?;
        n |= u32::from(b) << (8 * shift);
    }

    Ok(n as usize)
}
