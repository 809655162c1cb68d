use std::{io, str};

use bstr::ByteSlice;

use super::Type;
use crate::io::reader::num::read_uint7;

const NUL: u8 = 0x00;

/// Decodes a tokenized name stream.
///
/// Every name in the output is NUL-terminated, matching the record writer's
/// convention for the name block.
pub fn decode(mut src: &[u8]) -> io::Result<Vec<u8>> {
    let reader = &mut src;

    let uncompressed_len = take_u32_le(reader).map(|n| n as usize)?;
    let n_names = take_u32_le(reader).map(|n| n as usize)?;
    let use_arith = take_u8(reader)?;

    let mut positions = read_token_streams(reader, use_arith)?;

    let mut rendered: Vec<Vec<u8>> = Vec::with_capacity(n_names);
    let mut tokens: Vec<Vec<Vec<u8>>> = Vec::with_capacity(n_names);

    let mut dst = Vec::with_capacity(uncompressed_len + n_names);

    for n in 0..n_names {
        let mode = positions
            .first_mut()
            .ok_or_else(|| invalid("missing mode stream"))?
            .read_type()?;

        match mode {
            Type::Dup => {
                let delta = positions[0].read_u32_le(Type::Dup)? as usize;

                if delta == 0 {
                    return Err(invalid("invalid duplicate reference"));
                }

                let prev = n
                    .checked_sub(delta)
                    .ok_or_else(|| invalid("invalid duplicate reference"))?;

                let name = rendered
                    .get(prev)
                    .ok_or_else(|| invalid("invalid duplicate reference"))?
                    .clone();
                let row = tokens[prev].clone();

                dst.extend_from_slice(&name);
                dst.push(NUL);

                rendered.push(name);
                tokens.push(row);
            }
            Type::Diff => {
                let delta = positions[0].read_u32_le(Type::Diff)? as usize;
                let prev = n
                    .checked_sub(delta)
                    .ok_or_else(|| invalid("invalid diff reference"))?;

                let (name, row) = decode_name(&mut positions, &tokens, prev, n)?;

                dst.extend_from_slice(&name);
                dst.push(NUL);

                rendered.push(name);
                tokens.push(row);
            }
            _ => return Err(invalid("invalid mode token")),
        }
    }

    Ok(dst)
}

fn decode_name(
    positions: &mut [TokenReader],
    tokens: &[Vec<Vec<u8>>],
    prev: usize,
    current: usize,
) -> io::Result<(Vec<u8>, Vec<Vec<u8>>)> {
    let mut name = Vec::new();
    let mut row = Vec::new();

    let mut t = 1;

    loop {
        let token_reader = positions
            .get_mut(t)
            .ok_or_else(|| invalid("token position out of range"))?;

        let ty = token_reader.read_type()?;

        let token: Vec<u8> = match ty {
            Type::End => break,
            Type::Match => prev_token(tokens, prev, current, t)?.to_vec(),
            Type::String => token_reader.read_string()?,
            Type::Char => vec![token_reader.read_u8(Type::Char)?],
            Type::Digits => {
                let n = token_reader.read_u32_le(Type::Digits)?;
                n.to_string().into_bytes()
            }
            Type::Digits0 => {
                let n = token_reader.read_u32_le(Type::Digits0)?;
                let width = usize::from(token_reader.read_u8(Type::DZLen)?);
                format!("{n:0width$}").into_bytes()
            }
            Type::Delta => {
                let delta = token_reader.read_u8(Type::Delta)?;
                let prev_value = parse_u32(prev_token(tokens, prev, current, t)?)?;
                let n = prev_value
                    .checked_add(u32::from(delta))
                    .ok_or_else(|| invalid("delta overflow"))?;
                n.to_string().into_bytes()
            }
            Type::Delta0 => {
                let delta = token_reader.read_u8(Type::Delta0)?;
                let prev_raw = prev_token(tokens, prev, current, t)?;
                let width = prev_raw.len();
                let prev_value = parse_u32(prev_raw)?;
                let n = prev_value
                    .checked_add(u32::from(delta))
                    .ok_or_else(|| invalid("delta overflow"))?;
                format!("{n:0width$}").into_bytes()
            }
            _ => return Err(invalid("invalid token type in name")),
        };

        name.extend_from_slice(&token);
        row.push(token);

        t += 1;
    }

    Ok((name, row))
}

fn prev_token<'a>(
    tokens: &'a [Vec<Vec<u8>>],
    prev: usize,
    current: usize,
    t: usize,
) -> io::Result<&'a [u8]> {
    if prev >= current {
        return Err(invalid("reference to an undecoded name"));
    }

    tokens
        .get(prev)
        .and_then(|row| row.get(t - 1))
        .map(|token| token.as_slice())
        .ok_or_else(|| invalid("reference to a missing token"))
}

fn parse_u32(src: &[u8]) -> io::Result<u32> {
    str::from_utf8(src)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid("invalid numeric token"))
}

// Token byte streams indexed by type, with read cursors.
#[derive(Default)]
struct TokenReader {
    streams: [Vec<u8>; 10],
    cursors: [usize; 10],
}

impl TokenReader {
    fn read_type(&mut self) -> io::Result<Type> {
        self.read_u8(Type::Type).and_then(Type::try_from)
    }

    fn read_u8(&mut self, ty: Type) -> io::Result<u8> {
        let i = stream_index(ty)?;

        let b = self.streams[i]
            .get(self.cursors[i])
            .copied()
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;

        self.cursors[i] += 1;

        Ok(b)
    }

    fn read_u32_le(&mut self, ty: Type) -> io::Result<u32> {
        let mut buf = [0; 4];

        for b in &mut buf {
            *b = self.read_u8(ty)?;
        }

        Ok(u32::from_le_bytes(buf))
    }

    fn read_string(&mut self) -> io::Result<Vec<u8>> {
        let i = stream_index(Type::String)?;

        let rest = &self.streams[i][self.cursors[i]..];
        let end = rest
            .find_byte(NUL)
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;

        let s = rest[..end].to_vec();
        self.cursors[i] += end + 1;

        Ok(s)
    }
}

fn stream_index(ty: Type) -> io::Result<usize> {
    match ty {
        Type::Type => Ok(0),
        Type::String => Ok(1),
        Type::Char => Ok(2),
        Type::Digits0 => Ok(3),
        Type::DZLen => Ok(4),
        Type::Dup => Ok(5),
        Type::Diff => Ok(6),
        Type::Digits => Ok(7),
        Type::Delta => Ok(8),
        Type::Delta0 => Ok(9),
        _ => Err(invalid("token type has no byte stream")),
    }
}

fn read_token_streams(reader: &mut &[u8], use_arith: u8) -> io::Result<Vec<TokenReader>> {
    use crate::codecs::{aac, rans_nx16};

    let mut positions: Vec<TokenReader> = Vec::new();

    while !reader.is_empty() {
        let b = take_u8(reader)?;

        let is_new_position = b & 0x80 != 0;
        let is_dup = b & 0x40 != 0;
        let ty = Type::try_from(b & 0x3f)?;
        let i = stream_index(ty)?;

        if is_new_position {
            positions.push(TokenReader::default());
        }

        if positions.is_empty() {
            return Err(invalid("stream before first token position"));
        }

        let data = if is_dup {
            let dup_pos = take_u8(reader).map(usize::from)?;
            let dup_ty = take_u8(reader).and_then(|n| Type::try_from(n & 0x3f))?;
            let j = stream_index(dup_ty)?;

            positions
                .get(dup_pos)
                .ok_or_else(|| invalid("invalid duplicate stream reference"))?
                .streams[j]
                .clone()
        } else {
            let compressed_len = read_uint7(reader).map(|n| n as usize)?;

            if compressed_len > reader.len() {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
            }

            let (chunk, rest) = reader.split_at(compressed_len);
            *reader = rest;

            match use_arith {
                0 => rans_nx16::decode(&mut &chunk[..], 0)?,
                _ => aac::decode(&mut &chunk[..], 0)?,
            }
        };

        let pos = positions.len() - 1;
        positions[pos].streams[i] = data;
    }

    Ok(positions)
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

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}
