use std::io::{self, Read};

use super::{
    Flags, Model, RangeCoder,
    encode::{MAX_RUN, RLE_NUM_SYMBOLS},
};
use crate::io::reader::num::{read_u8, read_uint7};

/// Decodes an arithmetic-coded stream.
///
/// `dst_len` is the expected output size, used when the stream carries no
/// size of its own.
pub fn decode<R>(reader: &mut R, dst_len: usize) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let order = read_u8(reader)?;

    if order & 0x02 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "arithmetic coding: order-2 and dictionary transforms are not supported",
        ));
    }

    let flags = Flags::from(order);

    if flags.contains(Flags::STRIPE) {
        return decode_stripe(reader, dst_len);
    }

    let uncompressed_len = if flags.contains(Flags::NO_SIZE) {
        dst_len
    } else {
        read_uint7(reader).map(|n| n as usize)?
    };

    let mut values_per_byte = 0;
    let mut pack_map = [0; 16];
    let mut data_len = uncompressed_len;

    if flags.contains(Flags::PACK) {
        let (n, map) = read_pack_meta(reader)?;
        values_per_byte = n;
        pack_map = map;
        data_len = read_uint7(reader).map(|n| n as usize)?;
    }

    let data = if flags.contains(Flags::CAT) {
        let mut buf = vec![0; data_len];
        reader.read_exact(&mut buf)?;
        buf
    } else if flags.contains(Flags::EXT) {
        let mut src = Vec::new();
        reader.read_to_end(&mut src)?;

        let mut buf = vec![0; data_len];
        crate::codecs::bzip2::decode(&src, &mut buf)?;
        buf
    } else if flags.contains(Flags::RLE) {
        if flags.contains(Flags::ORDER) {
            decode_order_1_rle(reader, data_len)?
        } else {
            decode_order_0_rle(reader, data_len)?
        }
    } else if flags.contains(Flags::ORDER) {
        decode_order_1(reader, data_len)?
    } else {
        decode_order_0(reader, data_len)?
    };

    if flags.contains(Flags::PACK) {
        unpack(&data, values_per_byte, &pack_map, uncompressed_len)
    } else {
        Ok(data)
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

fn num_symbols_from(n: u8) -> usize {
    if n == 0 { 256 } else { usize::from(n) }
}

fn decode_order_0<R>(reader: &mut R, dst_len: usize) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let num_symbols = read_u8(reader).map(num_symbols_from)?;

    let mut range_coder = RangeCoder::default();
    range_coder.range_decode_init(reader)?;

    let mut model = Model::new(num_symbols);
    let mut dst = Vec::with_capacity(dst_len);

    for _ in 0..dst_len {
        let b = model.decode(reader, &mut range_coder)?;
        dst.push(b as u8);
    }

    Ok(dst)
}

fn decode_order_1<R>(reader: &mut R, dst_len: usize) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let num_symbols = read_u8(reader).map(num_symbols_from)?;

    let mut range_coder = RangeCoder::default();
    range_coder.range_decode_init(reader)?;

    let mut models: Vec<_> = (0..256).map(|_| Model::new(num_symbols)).collect();
    let mut dst = Vec::with_capacity(dst_len);

    let mut last = 0;

    for _ in 0..dst_len {
        let b = models[last].decode(reader, &mut range_coder)? as u8;
        dst.push(b);
        last = usize::from(b);
    }

    Ok(dst)
}

fn decode_order_0_rle<R>(reader: &mut R, dst_len: usize) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let num_symbols = read_u8(reader).map(num_symbols_from)?;

    let mut range_coder = RangeCoder::default();
    range_coder.range_decode_init(reader)?;

    let mut literal_model = Model::new(num_symbols);
    let mut run_models: Vec<_> = (0..RLE_NUM_SYMBOLS).map(|_| Model::new(MAX_RUN)).collect();

    let mut dst = Vec::with_capacity(dst_len);

    while dst.len() < dst_len {
        let b = literal_model.decode(reader, &mut range_coder)? as u8;
        dst.push(b);
        decode_run(reader, &mut range_coder, &mut run_models, &mut dst, dst_len, b)?;
    }

    Ok(dst)
}

fn decode_order_1_rle<R>(reader: &mut R, dst_len: usize) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let num_symbols = read_u8(reader).map(num_symbols_from)?;

    let mut range_coder = RangeCoder::default();
    range_coder.range_decode_init(reader)?;

    let mut literal_models: Vec<_> = (0..256).map(|_| Model::new(num_symbols)).collect();
    let mut run_models: Vec<_> = (0..RLE_NUM_SYMBOLS).map(|_| Model::new(MAX_RUN)).collect();

    let mut dst = Vec::with_capacity(dst_len);
    let mut last = 0;

    while dst.len() < dst_len {
        let b = literal_models[usize::from(last)].decode(reader, &mut range_coder)? as u8;
        dst.push(b);
        last = b;
        decode_run(reader, &mut range_coder, &mut run_models, &mut dst, dst_len, b)?;
    }

    Ok(dst)
}

fn decode_run<R>(
    reader: &mut R,
    range_coder: &mut RangeCoder,
    run_models: &mut [Model],
    dst: &mut Vec<u8>,
    dst_len: usize,
    literal: u8,
) -> io::Result<()>
where
    R: Read,
{
    let last = usize::from(literal);
    let mut run_ctx = last;
    let mut run = 0;

    loop {
        let r = usize::from(run_models[run_ctx].decode(reader, range_coder)?);

        if run_ctx == last {
            run_ctx = 256;
        } else if run_ctx < RLE_NUM_SYMBOLS - 1 {
            run_ctx += 1;
        }

        run += r;

        // The output length bounds the loop as well as the write: a
        // truncated stream decodes as an endless chain of max-length runs
        // otherwise.
        if r != MAX_RUN - 1 || run >= dst_len {
            break;
        }
    }

    for _ in 0..run {
        if dst.len() >= dst_len {
            break;
        }

        dst.push(literal);
    }

    Ok(())
}

fn read_pack_meta<R>(reader: &mut R) -> io::Result<(usize, [u8; 16])>
where
    R: Read,
{
    let count = read_u8(reader).map(usize::from)?;

    let values_per_byte = if count <= 1 {
        0
    } else if count <= 2 {
        8
    } else if count <= 4 {
        4
    } else if count <= 16 {
        2
    } else {
        1
    };

    let mut map = [0; 16];

    if values_per_byte != 1 {
        for slot in map.iter_mut().take(count.clamp(1, 16)) {
            *slot = read_u8(reader)?;
        }
    }

    Ok((values_per_byte, map))
}

fn unpack(
    src: &[u8],
    values_per_byte: usize,
    map: &[u8; 16],
    dst_len: usize,
) -> io::Result<Vec<u8>> {
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
                for x in 0..values_per_byte {
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
