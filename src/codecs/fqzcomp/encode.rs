use std::{
    io::{self, Write},
    num::NonZero,
};

use super::{
    Models,
    parameters::{self, parameter},
};
use crate::{
    codecs::aac::RangeCoder,
    io::writer::num::{write_u8, write_u16_le, write_uint7},
};

/// Encodes quality scores.
///
/// `records` is a slice of `(read_length, is_reverse_strand)` tuples.
/// `src` is the concatenated quality score data for all records.
pub fn encode(records: &[(usize, bool)], src: &[u8]) -> io::Result<Vec<u8>> {
    if records.iter().any(|(len, _)| *len == 0) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "zero-length records cannot be coded",
        ));
    }

    let mut dst = Vec::new();

    let len =
        u32::try_from(src.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_uint7(&mut dst, len)?;

    let has_reverse = records.iter().any(|(_, rev)| *rev);
    let lens: Vec<usize> = records.iter().map(|(l, _)| *l).collect();

    // Reverse-strand reads store their quality scores reversed.
    let mut working_src;
    let src = if has_reverse {
        working_src = src.to_vec();
        let mut offset = 0;
        for &(rec_len, is_rev) in records {
            if is_rev && rec_len > 1 {
                working_src[offset..offset + rec_len].reverse();
            }
            offset += rec_len;
        }
        &working_src
    } else {
        src
    };

    let parameters = build_parameters(&lens, src, has_reverse);

    // Maps original quality -> model symbol (identity or inverse qmap).
    let q_hist: Vec<[u8; 256]> = parameters
        .params
        .iter()
        .map(|param| {
            if let Some(ref inv) = param.inverse_qmap {
                *inv
            } else {
                let mut m = [0u8; 256];
                for (i, v) in m.iter_mut().enumerate() {
                    *v = i as u8;
                }
                m
            }
        })
        .collect();

    fqz_encode_params(&mut dst, &parameters)?;

    let mut range_coder = RangeCoder::default();
    let mut models = Models::new(parameters.symbol_count, parameters.selector_count());

    // Each parameter block stores a length only for its first record when
    // its records are fixed length.
    let mut first_len = vec![true; parameters.params.len()];

    let mut p: usize = 0;
    let mut rec_num: usize = 0;

    let mut x: usize = 0;
    let mut last: u32 = 0;
    let mut qlast: u32 = 0;
    let mut selector: u8 = 0;
    let mut delta: u32 = 0;
    let mut prev_q: u8 = 0;

    let mut i = 0;

    while i < src.len() {
        if p == 0 {
            if let Some(ref mut sel_model) = models.sel {
                selector = parameters
                    .record_selectors
                    .as_ref()
                    .map(|sels| sels[rec_num])
                    .unwrap_or(0);
                sel_model.encode(&mut dst, &mut range_coder, u16::from(selector))?;

                if parameters.gflags.contains(parameters::Flags::HAVE_S_TAB) {
                    x = usize::from(parameters.s_tab[usize::from(selector)]);
                } else {
                    x = usize::from(selector);
                }
            } else {
                x = usize::from(parameters.s_tab[0]);
            }

            let param = &parameters.params[x];
            let rec_len = lens[rec_num];

            if !param.flags.is_fixed_length() || first_len[x] {
                encode_length(&mut dst, &mut range_coder, &mut models, rec_len)?;
                first_len[x] = false;
            }

            if parameters.gflags.contains(parameters::Flags::DO_REV) {
                let rev_byte = u16::from(records[rec_num].1);
                models.rev.encode(&mut dst, &mut range_coder, rev_byte)?;
            }

            if param.flags.has_duplicates() {
                let is_dup =
                    rec_num > 0 && i >= rec_len && src[i..i + rec_len] == src[i - rec_len..i];

                models
                    .dup
                    .encode(&mut dst, &mut range_coder, u16::from(is_dup))?;

                if is_dup {
                    i += rec_len;
                    rec_num += 1;
                    continue;
                }
            }

            p = rec_len;
            last = u32::from(param.context);
            qlast = 0;
            delta = 0;
            prev_q = 0;

            rec_num += 1;
        }

        let q = src[i];
        let qq = q_hist[x][usize::from(q)];
        models.qual[usize::from(last as u16)].encode(&mut dst, &mut range_coder, u16::from(qq))?;

        let param = &parameters.params[x];

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
        i += 1;
    }

    range_coder.range_encode_end(&mut dst)?;

    Ok(dst)
}

pub(super) struct Parameters {
    pub gflags: parameters::Flags,
    pub max_sel: u8,
    pub s_tab: Vec<u8>,
    pub params: Vec<Parameter>,
    pub symbol_count: NonZero<usize>,
    pub record_selectors: Option<Vec<u8>>,
}

impl Parameters {
    pub(super) fn selector_count(&self) -> Option<NonZero<usize>> {
        if self.gflags.contains(parameters::Flags::HAVE_S_TAB) {
            NonZero::new(usize::from(self.max_sel) + 1)
        } else if self.gflags.contains(parameters::Flags::MULTI_PARAM) {
            NonZero::new(self.params.len())
        } else {
            None
        }
    }
}

pub(super) struct Parameter {
    pub context: u16,
    pub flags: parameter::Flags,

    pub symbol_count: NonZero<usize>,

    pub q_bits: u8,
    pub q_shift: u8,
    pub q_loc: u8,

    pub s_loc: u8,

    pub p_loc: u8,

    pub d_loc: u8,

    pub q_tab: Vec<u8>,
    pub p_tab: Vec<u8>,
    pub d_tab: Vec<u8>,
    pub quality_map: Option<Vec<u8>>,
    pub inverse_qmap: Option<[u8; 256]>,
}

fn build_parameters(lens: &[usize], src: &[u8], has_reverse: bool) -> Parameters {
    let mut gflags = parameters::Flags::empty();
    if has_reverse {
        gflags |= parameters::Flags::DO_REV;
    }

    if let Some((group_assignments, n_groups)) = assign_record_groups(lens, 10) {
        return build_multi_parameters(lens, src, gflags, &group_assignments, n_groups);
    }

    let (param, effective_max_symbol) = build_single_parameter(lens, src, false);

    let s_tab = vec![0; 256];

    let global_symbol_count = NonZero::new(usize::from(effective_max_symbol) + 1).unwrap();

    Parameters {
        gflags,
        max_sel: 0,
        s_tab,
        params: vec![param],
        symbol_count: global_symbol_count,
        record_selectors: None,
    }
}

fn build_single_parameter(lens: &[usize], src: &[u8], has_selector: bool) -> (Parameter, u8) {
    let mut max_symbol = u8::MIN;

    for &b in src {
        max_symbol = max_symbol.max(b);
    }

    // Build a quality map when <= 16 distinct values
    let mut seen = [false; 256];
    for &b in src {
        seen[usize::from(b)] = true;
    }
    let distinct: Vec<u8> = (0u8..=255).filter(|&v| seen[usize::from(v)]).collect();
    let distinct_count = distinct.len();

    let (quality_map, inverse_qmap, effective_max_symbol) =
        if distinct_count > 0 && distinct_count <= 16 {
            // qmap: model symbol -> original quality (sorted distinct values)
            let qmap = distinct;
            let mut inv = [0u8; 256];
            for (model_sym, &orig_q) in qmap.iter().enumerate() {
                inv[usize::from(orig_q)] = model_sym as u8;
            }
            let eff_max = (distinct_count - 1) as u8;
            (Some(qmap), Some(inv), eff_max)
        } else {
            (None, None, max_symbol)
        };

    // Detect duplicate records
    let mut dup_count: usize = 0;
    if lens.len() > 1 {
        let mut offset = 0;
        for window in lens.windows(2) {
            let prev_len = window[0];
            let cur_len = window[1];
            let prev_start = offset;
            offset += prev_len;
            let cur_start = offset;

            if prev_len == cur_len
                && cur_start + cur_len <= src.len()
                && src[prev_start..prev_start + prev_len] == src[cur_start..cur_start + cur_len]
            {
                dup_count += 1;
            }
        }
    }

    let dup_fraction = if lens.len() > 1 {
        dup_count as f64 / (lens.len() - 1) as f64
    } else {
        0.0
    };

    let q_shift = 5;
    let q_bits = if q_shift > 4 { 9 } else { 8 };
    let p_bits = 7;
    let p_shift = i32::from(lens.first().copied().unwrap_or(0) > 128);

    let mut p_tab = vec![0; 1024];

    for (i, p) in p_tab.iter_mut().enumerate() {
        *p = ((1 << p_bits) - 1).min(i >> p_shift) as u8;
    }

    let mut flags = parameter::Flags::HAVE_PTAB;

    if lens.len() > 1 && lens.windows(2).all(|w| w[0] == w[1]) {
        flags |= parameter::Flags::DO_LEN;
    }

    // dedup pays off when > 5% of records repeat their predecessor
    if dup_fraction > 0.05 {
        flags |= parameter::Flags::DO_DEDUP;
    }

    if quality_map.is_some() {
        flags |= parameter::Flags::HAVE_QMAP;
    }

    if has_selector {
        flags |= parameter::Flags::DO_SEL;
    }

    let (d_tab, d_loc) = if src.len() > 256 {
        let d_bits = 3;
        let mut dtab = vec![0u8; 256];
        for (i, d) in dtab.iter_mut().enumerate() {
            *d = ((1 << d_bits) - 1).min(i) as u8;
        }
        flags |= parameter::Flags::HAVE_DTAB;
        (dtab, 15u8)
    } else {
        (Vec::new(), 15u8)
    };

    let q_tab = build_quality_table(effective_max_symbol, q_bits);
    let is_identity = q_tab.iter().enumerate().all(|(i, &v)| v == i as u8);
    if !is_identity {
        flags |= parameter::Flags::HAVE_QTAB;
    }

    let param = Parameter {
        context: 0,
        flags,
        symbol_count: NonZero::new(usize::from(effective_max_symbol) + 1).unwrap(),
        q_bits,
        q_shift,
        q_loc: 7,
        s_loc: 15,
        p_loc: 0,
        d_loc,
        q_tab,
        p_tab,
        d_tab,
        quality_map,
        inverse_qmap,
    };

    (param, effective_max_symbol)
}

/// Builds a quality context quantization table mapping quality values to
/// context bins. The table is non-decreasing, which the two-level RLE array
/// storage requires.
fn build_quality_table(max_q: u8, q_bits: u8) -> Vec<u8> {
    let max_bin = ((1u16 << q_bits) - 1).min(255) as u8;

    if max_q == 0 {
        return (0..=u8::MAX).map(|_| 0u8).collect();
    }

    (0..=u8::MAX)
        .map(|i| {
            let bin =
                (u16::from(i) * u16::from(max_bin) / u16::from(max_q)).min(u16::from(max_bin));
            bin as u8
        })
        .collect()
}

/// Assigns each record to a parameter group by read length.
/// Returns `None` if multiple parameter blocks would not help.
fn assign_record_groups(lens: &[usize], min_group_size: usize) -> Option<(Vec<u8>, usize)> {
    if lens.len() < min_group_size * 2 {
        return None;
    }

    let mut sorted_lens: Vec<usize> = lens.to_vec();
    sorted_lens.sort_unstable();
    let median = sorted_lens[sorted_lens.len() / 2];

    let assignments: Vec<u8> = lens
        .iter()
        .map(|&l| if l > median { 1 } else { 0 })
        .collect();

    let count0 = assignments.iter().filter(|&&a| a == 0).count();
    let count1 = assignments.iter().filter(|&&a| a == 1).count();

    if count0 < min_group_size || count1 < min_group_size {
        return None;
    }

    Some((assignments, 2))
}

fn build_multi_parameters(
    lens: &[usize],
    src: &[u8],
    mut gflags: parameters::Flags,
    group_assignments: &[u8],
    n_groups: usize,
) -> Parameters {
    gflags |= parameters::Flags::MULTI_PARAM;
    gflags |= parameters::Flags::HAVE_S_TAB;

    let max_sel = (n_groups - 1) as u8;

    // s_tab: [0, 1, ..., n_groups-1, n_groups-1, ...]
    let mut s_tab = vec![max_sel; 256];
    for (i, entry) in s_tab.iter_mut().enumerate().take(n_groups) {
        *entry = i as u8;
    }

    let mut group_lens: Vec<Vec<usize>> = vec![Vec::new(); n_groups];
    let mut group_src: Vec<Vec<u8>> = vec![Vec::new(); n_groups];

    let mut offset = 0;
    for (rec_idx, &rec_len) in lens.iter().enumerate() {
        let g = usize::from(group_assignments[rec_idx]);
        group_lens[g].push(rec_len);
        group_src[g].extend_from_slice(&src[offset..offset + rec_len]);
        offset += rec_len;
    }

    let mut params = Vec::with_capacity(n_groups);
    let mut global_max_symbol: u8 = 0;

    for g in 0..n_groups {
        let (param, eff_max) = build_single_parameter(&group_lens[g], &group_src[g], true);
        global_max_symbol = global_max_symbol.max(eff_max);
        params.push(param);
    }

    let global_symbol_count = NonZero::new(usize::from(global_max_symbol) + 1).unwrap();

    Parameters {
        gflags,
        max_sel,
        s_tab,
        params,
        symbol_count: global_symbol_count,
        record_selectors: Some(group_assignments.to_vec()),
    }
}

fn fqz_encode_params<W>(writer: &mut W, parameters: &Parameters) -> io::Result<()>
where
    W: Write,
{
    const VERSION: u8 = 5;

    write_u8(writer, VERSION)?;

    write_u8(writer, u8::from(parameters.gflags))?;

    if parameters.gflags.contains(parameters::Flags::MULTI_PARAM) {
        let n_param = u8::try_from(parameters.params.len())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_u8(writer, n_param)?;
    }

    if parameters.gflags.contains(parameters::Flags::HAVE_S_TAB) {
        write_u8(writer, parameters.max_sel)?;
        write_array(writer, &parameters.s_tab)?;
    }

    for param in &parameters.params {
        fqz_encode_single_param(writer, param)?;
    }

    Ok(())
}

fn fqz_encode_single_param<W>(writer: &mut W, parameter: &Parameter) -> io::Result<()>
where
    W: Write,
{
    write_u16_le(writer, parameter.context)?;

    write_u8(writer, u8::from(parameter.flags))?;

    let max_sym = (usize::from(parameter.symbol_count) - 1) as u8;
    write_u8(writer, max_sym)?;

    write_u8(writer, (parameter.q_bits << 4) | parameter.q_shift)?;
    write_u8(writer, (parameter.q_loc << 4) | parameter.s_loc)?;
    write_u8(writer, (parameter.p_loc << 4) | parameter.d_loc)?;

    if parameter.flags.has_quality_map()
        && let Some(ref qmap) = parameter.quality_map
    {
        writer.write_all(qmap)?;
    }

    if parameter.flags.has_qualities_table() {
        write_array(writer, &parameter.q_tab)?;
    }

    if parameter.flags.has_positions_table() {
        write_array(writer, &parameter.p_tab)?;
    }

    if parameter.flags.has_deltas_table() {
        write_array(writer, &parameter.d_tab)?;
    }

    Ok(())
}

// Two-level run-length encoding over a non-decreasing table: per-value run
// lengths in 255-clamped chunks, then an RLE over those bytes.
fn write_array<W>(writer: &mut W, data: &[u8]) -> io::Result<()>
where
    W: Write,
{
    let mut rle1 = Vec::new();

    let mut i = 0;
    let mut j = 0;

    while j < data.len() {
        let start = j;

        while j < data.len() && usize::from(data[j]) == i {
            j += 1;
        }

        let mut len = j - start;

        loop {
            let rle = len.min(255);
            rle1.push(rle as u8);

            len -= rle;

            if rle != 255 {
                break;
            }
        }

        i += 1;
    }

    let mut rle2 = Vec::new();
    j = 0;
    let mut last = -1;

    while j < rle1.len() {
        let curr = rle1[j];
        j += 1;

        rle2.push(curr);

        if i32::from(curr) == last {
            let start = j;
            let mut len = 0;

            while j < rle1.len() && i32::from(rle1[j]) == last && len < 255 {
                j += 1;
                len = j - start;
            }

            rle2.push(len as u8);
        } else {
            last = i32::from(curr);
        }
    }

    writer.write_all(&rle2)?;

    Ok(())
}

fn encode_length<W>(
    writer: &mut W,
    range_coder: &mut RangeCoder,
    models: &mut Models,
    len: usize,
) -> io::Result<()>
where
    W: Write,
{
    let n = u32::try_from(len).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    models.len[0].encode(writer, range_coder, (n & 0xff) as u16)?;
    models.len[1].encode(writer, range_coder, ((n >> 8) & 0xff) as u16)?;
    models.len[2].encode(writer, range_coder, ((n >> 16) & 0xff) as u16)?;
    models.len[3].encode(writer, range_coder, ((n >> 24) & 0xff) as u16)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_quality_table_non_decreasing() {
        for max_q in [1, 3, 10, 15, 50, 100, 255] {
            for q_bits in [4, 5, 8, 9] {
                let table = build_quality_table(max_q, q_bits);
                assert_eq!(table.len(), 256);
                for w in table.windows(2) {
                    assert!(
                        w[0] <= w[1],
                        "not non-decreasing: max_q={max_q}, q_bits={q_bits}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_assign_record_groups() {
        // uniform lengths: no grouping
        let lens = vec![10; 40];
        assert!(assign_record_groups(&lens, 10).is_none());

        // too few records
        let lens = vec![5, 20];
        assert!(assign_record_groups(&lens, 10).is_none());

        // bimodal lengths split into 2 groups
        let lens: Vec<_> = std::iter::repeat_n(5, 15).chain(std::iter::repeat_n(20, 15)).collect();
        let (assignments, n_groups) = assign_record_groups(&lens, 10).expect("no groups");
        assert_eq!(n_groups, 2);
        assert!(assignments[..15].iter().all(|&a| a == 0));
        assert!(assignments[15..].iter().all(|&a| a == 1));
    }

    #[test]
    fn test_write_array_round_trip() -> io::Result<()> {
        use super::super::decode::read_array;

        let table = build_quality_table(40, 9);

        let mut buf = Vec::new();
        write_array(&mut buf, &table)?;

        let decoded = read_array(&mut &buf[..], table.len())?;
        assert_eq!(decoded, table);

        Ok(())
    }
}
