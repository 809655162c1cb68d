use std::{
    collections::HashMap,
    io::{self, Write},
};

use super::Type;
use crate::io::writer::num::{write_u8, write_u32_le, write_uint7};

const NUL: u8 = 0x00;

// A run can differ from the matching token in the reference row by at most
// this much and still be sent as a one-byte delta.
const MAX_DIGIT_DELTA: u32 = 255;

/// The entropy codec applied to each token byte stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SubCodec {
    RansNx16,
    Arith,
}

/// Encodes a block of NUL-delimited read names.
pub fn encode(mut src: &[u8]) -> io::Result<Vec<u8>> {
    if let [head @ .., NUL] = src {
        src = head;
    }

    let names: Vec<&[u8]> = src.split(|&b| b == NUL).collect();

    // Classify every name up front; rows are diffed against their immediate
    // predecessor, duplicates included.
    let rows: Vec<Vec<Cell>> = names
        .iter()
        .map(|name| split_segments(name).into_iter().map(classify).collect())
        .collect();

    let banks = fill_stream_banks(&names, &rows)?;

    // Encode the banks with both sub-codecs and keep the smaller stream.
    let rans = serialize(&banks, src.len(), names.len(), SubCodec::RansNx16)?;
    let arith = serialize(&banks, src.len(), names.len(), SubCodec::Arith)?;

    if arith.len() < rans.len() {
        Ok(arith)
    } else {
        Ok(rans)
    }
}

// A name fragment: a maximal run of alphanumeric or of separator bytes.
fn split_segments(name: &[u8]) -> Vec<&[u8]> {
    let mut segments = Vec::new();
    let mut i = 0;

    while i < name.len() {
        let start = i;
        let alphanumeric = name[i].is_ascii_alphanumeric();

        while i < name.len() && name[i].is_ascii_alphanumeric() == alphanumeric {
            i += 1;
        }

        segments.push(&name[start..i]);
    }

    segments
}

// The content of one token column. The representation is injective on the
// original text, so cell equality doubles as the match test, and numeric
// cells expose the value the delta tokens need.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Cell {
    Text(Vec<u8>),
    Number(u32),
    Padded { value: u32, width: u8 },
}

impl Cell {
    fn value(&self) -> Option<u32> {
        match self {
            Self::Text(_) => None,
            Self::Number(value) => Some(*value),
            Self::Padded { value, .. } => Some(*value),
        }
    }

    fn width(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Number(value) => decimal_width(*value),
            Self::Padded { width, .. } => usize::from(*width),
        }
    }
}

fn classify(segment: &[u8]) -> Cell {
    match parse_number(segment) {
        // a leading zero fixes the printed width
        Some(value) if segment[0] == b'0' => Cell::Padded {
            value,
            width: segment.len() as u8,
        },
        Some(value) => Cell::Number(value),
        None => Cell::Text(segment.to_vec()),
    }
}

fn parse_number(segment: &[u8]) -> Option<u32> {
    if segment.is_empty() || !segment.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let mut n: u32 = 0;

    for &b in segment {
        n = n.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }

    Some(n)
}

fn decimal_width(mut n: u32) -> usize {
    let mut width = 1;

    while n >= 10 {
        n /= 10;
        width += 1;
    }

    width
}

// One token position's byte streams, indexed by the wire type value.
#[derive(Default)]
struct StreamBank {
    streams: [Vec<u8>; 10],
}

impl StreamBank {
    fn tag(&mut self, ty: Type) {
        self.streams[0].push(u8::from(ty));
    }

    fn push_u8(&mut self, ty: Type, b: u8) {
        self.streams[usize::from(u8::from(ty))].push(b);
    }

    fn push_u32_le(&mut self, ty: Type, n: u32) {
        self.streams[usize::from(u8::from(ty))].extend_from_slice(&n.to_le_bytes());
    }

    fn push_text(&mut self, ty: Type, text: &[u8]) {
        let stream = &mut self.streams[usize::from(u8::from(ty))];
        stream.extend_from_slice(text);
        stream.push(NUL);
    }
}

// Bank 0 carries the per-name mode (dup/diff); bank t + 1 carries token
// column t, with the end marker one past each name's last column.
fn fill_stream_banks(names: &[&[u8]], rows: &[Vec<Cell>]) -> io::Result<Vec<StreamBank>> {
    let mut banks = vec![StreamBank::default()];
    let mut first_seen: HashMap<&[u8], usize> = HashMap::new();

    for (i, &name) in names.iter().enumerate() {
        if let Some(&j) = first_seen.get(name) {
            banks[0].tag(Type::Dup);
            banks[0].push_u32_le(Type::Dup, distance(i, j)?);
            continue;
        }

        first_seen.insert(name, i);

        let back = usize::from(i > 0);
        banks[0].tag(Type::Diff);
        banks[0].push_u32_le(Type::Diff, back as u32);

        let reference = if back > 0 { Some(&rows[i - back]) } else { None };

        for (t, cell) in rows[i].iter().enumerate() {
            grow_to(&mut banks, t + 1);

            let reference_cell = reference.and_then(|row| row.get(t));
            write_cell(&mut banks[t + 1], reference_cell, cell)?;
        }

        let end = rows[i].len() + 1;
        grow_to(&mut banks, end);
        banks[end].tag(Type::End);
    }

    Ok(banks)
}

fn grow_to(banks: &mut Vec<StreamBank>, index: usize) {
    while banks.len() <= index {
        banks.push(StreamBank::default());
    }
}

fn distance(i: usize, j: usize) -> io::Result<u32> {
    u32::try_from(i - j).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

// Emits one token column: an exact match against the reference row, a small
// numeric delta when both sides are numbers of a compatible shape, or the
// cell verbatim. Deltas are only taken when re-rendering value + delta
// reproduces the original text, so a plain number never chains off a
// zero-padded one and vice versa.
fn write_cell(bank: &mut StreamBank, reference: Option<&Cell>, cell: &Cell) -> io::Result<()> {
    if let Some(reference) = reference {
        if reference == cell {
            bank.tag(Type::Match);
            return Ok(());
        }

        if let (Some(prev), Some(curr)) = (reference.value(), cell.value())
            && curr >= prev
            && curr - prev <= MAX_DIGIT_DELTA
        {
            match reference {
                Cell::Number(_) if matches!(cell, Cell::Number(_)) => {
                    bank.tag(Type::Delta);
                    bank.push_u8(Type::Delta, (curr - prev) as u8);
                    return Ok(());
                }
                Cell::Padded { width, .. } if cell.width() == usize::from(*width) => {
                    bank.tag(Type::Delta0);
                    bank.push_u8(Type::Delta0, (curr - prev) as u8);
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    match cell {
        Cell::Padded { value, width } => {
            bank.tag(Type::Digits0);
            bank.push_u32_le(Type::Digits0, *value);
            bank.push_u8(Type::DZLen, *width);
        }
        Cell::Number(value) => {
            bank.tag(Type::Digits);
            bank.push_u32_le(Type::Digits, *value);
        }
        Cell::Text(text) if text.len() == 1 => {
            bank.tag(Type::Char);
            bank.push_u8(Type::Char, text[0]);
        }
        Cell::Text(text) => {
            bank.tag(Type::String);
            bank.push_text(Type::String, text);
        }
    }

    Ok(())
}

fn serialize(
    banks: &[StreamBank],
    raw_len: usize,
    names_count: usize,
    codec: SubCodec,
) -> io::Result<Vec<u8>> {
    use crate::codecs::{aac, rans_nx16};

    let mut dst = Vec::new();

    let ulen =
        u32::try_from(raw_len).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_u32_le(&mut dst, ulen)?;

    let n_names =
        u32::try_from(names_count).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_u32_le(&mut dst, n_names)?;

    write_u8(&mut dst, matches!(codec, SubCodec::Arith) as u8)?;

    for (bank_index, bank) in banks.iter().enumerate() {
        for (stream_index, stream) in bank.streams.iter().enumerate() {
            if stream.is_empty() {
                continue;
            }

            // the type stream opens its bank, flagged by the high bit
            let tag = if stream_index == 0 {
                0x80
            } else {
                stream_index as u8
            };

            // an identical stream in an earlier bank is stored as a reference
            if let Some((shared_bank, shared_stream)) = find_shared(banks, bank_index, stream) {
                write_u8(&mut dst, tag | 0x40)?;
                write_u8(
                    &mut dst,
                    u8::try_from(shared_bank)
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
                )?;
                write_u8(&mut dst, shared_stream as u8)?;
                continue;
            }

            write_u8(&mut dst, tag)?;

            let payload = match codec {
                SubCodec::RansNx16 => rans_nx16::encode(rans_nx16::Flags::empty(), stream)?,
                SubCodec::Arith => aac::encode(aac::Flags::empty(), stream)?,
            };

            let payload_len = u32::try_from(payload.len())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            write_uint7(&mut dst, payload_len)?;

            dst.write_all(&payload)?;
        }
    }

    Ok(dst)
}

fn find_shared(banks: &[StreamBank], current: usize, stream: &[u8]) -> Option<(usize, usize)> {
    banks[..current].iter().enumerate().find_map(|(bi, bank)| {
        bank.streams
            .iter()
            .position(|candidate| !candidate.is_empty() && candidate == stream)
            .map(|si| (bi, si))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_segments() {
        let segments = split_segments(b"I17_08765:2:123");
        assert_eq!(
            segments,
            [&b"I17"[..], b"_", b"08765", b":", b"2", b":", b"123"]
        );

        assert!(split_segments(b"").is_empty());
        assert_eq!(split_segments(b"::"), [&b"::"[..]]);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(b"read"), Cell::Text(b"read".to_vec()));
        assert_eq!(classify(b"."), Cell::Text(b".".to_vec()));
        assert_eq!(classify(b"123"), Cell::Number(123));
        assert_eq!(classify(b"0"), Cell::Padded { value: 0, width: 1 });
        assert_eq!(
            classify(b"0042"),
            Cell::Padded {
                value: 42,
                width: 4
            }
        );
        // too large for u32: kept as text
        assert_eq!(
            classify(b"99999999999"),
            Cell::Text(b"99999999999".to_vec())
        );
    }

    #[test]
    fn test_cell_width() {
        assert_eq!(Cell::Number(7).width(), 1);
        assert_eq!(Cell::Number(1000).width(), 4);
        assert_eq!(Cell::Padded { value: 7, width: 3 }.width(), 3);
        assert_eq!(Cell::Text(b"ab".to_vec()).width(), 2);
    }

    #[test]
    fn test_write_cell_takes_deltas_only_between_like_cells() -> io::Result<()> {
        // plain number chains off a plain number
        let mut bank = StreamBank::default();
        write_cell(&mut bank, Some(&Cell::Number(123)), &Cell::Number(124))?;
        assert_eq!(bank.streams[0], [u8::from(Type::Delta)]);

        // but not off a zero-padded one; the literal form is kept so the
        // printed width survives
        let mut bank = StreamBank::default();
        write_cell(
            &mut bank,
            Some(&Cell::Padded {
                value: 123,
                width: 5,
            }),
            &Cell::Number(124),
        )?;
        assert_eq!(bank.streams[0], [u8::from(Type::Digits)]);

        // a padded delta requires the widths to line up
        let mut bank = StreamBank::default();
        write_cell(
            &mut bank,
            Some(&Cell::Padded {
                value: 123,
                width: 4,
            }),
            &Cell::Padded {
                value: 130,
                width: 4,
            },
        )?;
        assert_eq!(bank.streams[0], [u8::from(Type::Delta0)]);

        Ok(())
    }
}
