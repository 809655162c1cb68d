//! The block compress/uncompress driver.
//!
//! Ties the codecs, metrics, and block object together: picks a method for
//! each block (probing candidates during a column's trial window), invokes
//! the codec, and rewrites the block in place.

use std::{io, sync::Mutex};

use crate::{
    codecs::{self, Encoder},
    container::block::{Block, CompressionMethod},
    metrics::{Method, MethodSet, Metrics, Plan},
};

/// Compresses a block in place.
///
/// With metrics, the column's trial/lock state decides the method: a trial
/// block is compressed with every allowed candidate and scored, a non-trial
/// block uses the locked-in method. Without metrics, a single gzip attempt
/// is made. In all cases a result no smaller than the input leaves the
/// block raw.
///
/// `records` carries per-record `(length, is_reverse_strand)` pairs for the
/// fqzcomp candidates; when absent, fqzcomp is excluded.
///
/// The metrics lock is held only around bookkeeping, never around codec
/// calls, so pool workers can compress concurrently.
pub fn compress_block(
    block: &mut Block,
    metrics: Option<&Mutex<Metrics>>,
    methods: MethodSet,
    compression_level: u8,
    records: Option<&[(usize, bool)]>,
) -> io::Result<()> {
    if block.compression_method() != CompressionMethod::None {
        // already compressed, e.g. a shared block compressed via an alias
        return Ok(());
    }

    if methods.is_raw_only() || compression_level == 0 || block.uncompressed_size() == 0 {
        return Ok(());
    }

    let mut methods = methods;

    if records.is_none() {
        methods.remove(Method::Fqzcomp);
    }

    let Some(metrics) = metrics else {
        let compressed = codecs::gzip::encode(
            flate2::Compression::new(u32::from(compression_level.min(9))),
            block.data(),
        )?;

        if compressed.len() < block.uncompressed_size() {
            replace_payload(block, Method::Gzip, compressed);
        }

        return Ok(());
    };

    let plan = lock(metrics).plan_block(methods);

    match plan {
        Plan::Locked(method) => {
            if method == Method::Raw {
                return Ok(());
            }

            let compressed = encode_with(method, compression_level, records, block.data())?;

            if compressed.len() < block.uncompressed_size() {
                replace_payload(block, method, compressed);
            }

            Ok(())
        }
        Plan::Trial(trial_methods) => {
            // anything untried or failing scores as arbitrarily worse than raw
            let fail_size = (block.uncompressed_size() * 2 + 1000) as f64;
            let mut sizes = [fail_size; Method::COUNT];

            let mut best: Option<(Method, Vec<u8>)> = None;

            for method in Method::ALL {
                if method == Method::Raw || !trial_methods.contains(method) {
                    continue;
                }

                let Ok(compressed) = encode_with(method, compression_level, records, block.data())
                else {
                    continue;
                };

                sizes[method.index()] = compressed.len() as f64;

                if best
                    .as_ref()
                    .is_none_or(|(_, buf)| compressed.len() < buf.len())
                {
                    best = Some((method, compressed));
                }
            }

            let (best_method, compressed) = best.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "no candidate method produced output",
                )
            })?;

            replace_payload(block, best_method, compressed);

            lock(metrics).record_trial(&sizes, trial_methods, compression_level);

            Ok(())
        }
    }
}

/// Decompresses a block in place, converting it to raw.
pub fn uncompress_block(block: &mut Block) -> io::Result<()> {
    block.uncompress()
}

/// Returns the parameterized method a compressed block was encoded with.
///
/// The wire method byte only names the codec family; the payload head
/// carries the order and transform bits. Re-encoders use this to seed a
/// column's candidate set with the true sub-variant.
pub fn original_method(block: &Block) -> Option<Method> {
    let head = block.data().first().copied().unwrap_or(0);

    let method = match block.compression_method() {
        CompressionMethod::None => Method::Raw,
        CompressionMethod::Gzip => Method::Gzip,
        CompressionMethod::Bzip2 => Method::Bzip2,
        CompressionMethod::Lzma => Method::Lzma,
        CompressionMethod::Fqzcomp => Method::Fqzcomp,
        CompressionMethod::NameTokenizer => Method::NameTokenizer,
        CompressionMethod::Bsc => Method::Bsc,
        CompressionMethod::Zstd => Method::Zstd,
        CompressionMethod::Rans4x8 => {
            if head == 1 {
                Method::Rans4x8O1
            } else {
                Method::Rans4x8O0
            }
        }
        CompressionMethod::RansNx16 => {
            use crate::codecs::rans_nx16::Flags;

            let flags = Flags::from(head);

            match (
                flags.contains(Flags::PACK),
                flags.contains(Flags::RLE),
                flags.contains(Flags::ORDER),
            ) {
                (true, true, true) => Method::RansNx16PackRle1,
                (true, true, false) => Method::RansNx16PackRle0,
                (true, false, true) => Method::RansNx16Pack1,
                (true, false, false) => Method::RansNx16Pack0,
                (false, true, true) => Method::RansNx16Rle1,
                (false, true, false) => Method::RansNx16Rle0,
                (false, false, true) => Method::RansNx16O1,
                (false, false, false) => Method::RansNx16O0,
            }
        }
        CompressionMethod::AdaptiveArithmeticCoding => {
            use crate::codecs::aac::Flags;

            let flags = Flags::from(head);

            match (
                flags.contains(Flags::PACK),
                flags.contains(Flags::RLE),
                flags.contains(Flags::ORDER),
            ) {
                (true, true, true) => Method::ArithPackRle1,
                (true, true, false) => Method::ArithPackRle0,
                (true, false, true) => Method::ArithPack1,
                (true, false, false) => Method::ArithPack0,
                (false, true, true) => Method::ArithRle1,
                (false, true, false) => Method::ArithRle0,
                (false, false, true) => Method::ArithO1,
                (false, false, false) => Method::ArithO0,
            }
        }
        CompressionMethod::External(_) => return None,
    };

    Some(method)
}

/// Forces a metrics re-probe across all columns.
///
/// Called at the mapped-to-unmapped transition, where the per-column
/// distributions change sharply.
pub fn reset_metrics<'a, I>(columns: I)
where
    I: IntoIterator<Item = &'a Mutex<Metrics>>,
{
    for metrics in columns {
        lock(metrics).reset();
    }
}

/// Compresses blocks in parallel, preserving slice order.
///
/// Each job is `(block, metrics, records)`. The output order is the input
/// order; only the compression itself runs out of order.
#[cfg(feature = "parallel")]
pub fn compress_blocks_par(
    jobs: &mut [(
        &mut Block,
        Option<&Mutex<Metrics>>,
        Option<&[(usize, bool)]>,
    )],
    methods: MethodSet,
    compression_level: u8,
) -> io::Result<()> {
    use rayon::prelude::*;

    jobs.par_iter_mut()
        .try_for_each(|(block, metrics, records)| {
            compress_block(&mut **block, *metrics, methods, compression_level, *records)
        })
}

fn lock<'a>(metrics: &'a Mutex<Metrics>) -> std::sync::MutexGuard<'a, Metrics> {
    match metrics.lock() {
        Ok(guard) => guard,
        Err(e) => e.into_inner(),
    }
}

fn replace_payload(block: &mut Block, method: Method, compressed: Vec<u8>) {
    block.compression_method = method.compression_method();
    block.data = compressed;
}

fn encoder_for(method: Method, compression_level: u8) -> Option<Encoder> {
    use crate::codecs::{aac, rans_4x8, rans_nx16};

    let level = compression_level.min(9);

    let encoder = match method {
        Method::Raw | Method::Fqzcomp | Method::NameTokenizer => return None,
        Method::Gzip => Encoder::Gzip(flate2::Compression::new(u32::from(level))),
        Method::Gzip1 => Encoder::Gzip(flate2::Compression::new(1)),
        Method::Bzip2 => Encoder::Bzip2(bzip2::Compression::new(u32::from(level.clamp(1, 9)))),
        Method::Lzma => Encoder::Lzma(u32::from(level)),
        Method::Zstd => Encoder::Zstd(codecs::zstd::compression_level_from(level)),
        Method::Zstd1 => Encoder::Zstd(1),
        Method::Bsc => return None,
        Method::Rans4x8O0 => Encoder::Rans4x8(rans_4x8::Order::Zero),
        Method::Rans4x8O1 => Encoder::Rans4x8(rans_4x8::Order::One),
        Method::RansNx16O0 => Encoder::RansNx16(rans_nx16::Flags::empty()),
        Method::RansNx16O1 => Encoder::RansNx16(rans_nx16::Flags::ORDER),
        Method::RansNx16Rle0 => Encoder::RansNx16(rans_nx16::Flags::RLE),
        Method::RansNx16Rle1 => Encoder::RansNx16(rans_nx16::Flags::RLE | rans_nx16::Flags::ORDER),
        Method::RansNx16Pack0 => Encoder::RansNx16(rans_nx16::Flags::PACK),
        Method::RansNx16Pack1 => {
            Encoder::RansNx16(rans_nx16::Flags::PACK | rans_nx16::Flags::ORDER)
        }
        Method::RansNx16PackRle0 => {
            Encoder::RansNx16(rans_nx16::Flags::PACK | rans_nx16::Flags::RLE)
        }
        Method::RansNx16PackRle1 => Encoder::RansNx16(
            rans_nx16::Flags::PACK | rans_nx16::Flags::RLE | rans_nx16::Flags::ORDER,
        ),
        Method::ArithO0 => Encoder::AdaptiveArithmeticCoding(aac::Flags::empty()),
        Method::ArithO1 => Encoder::AdaptiveArithmeticCoding(aac::Flags::ORDER),
        Method::ArithRle0 => Encoder::AdaptiveArithmeticCoding(aac::Flags::RLE),
        Method::ArithRle1 => {
            Encoder::AdaptiveArithmeticCoding(aac::Flags::RLE | aac::Flags::ORDER)
        }
        Method::ArithPack0 => Encoder::AdaptiveArithmeticCoding(aac::Flags::PACK),
        Method::ArithPack1 => {
            Encoder::AdaptiveArithmeticCoding(aac::Flags::PACK | aac::Flags::ORDER)
        }
        Method::ArithPackRle0 => {
            Encoder::AdaptiveArithmeticCoding(aac::Flags::PACK | aac::Flags::RLE)
        }
        Method::ArithPackRle1 => Encoder::AdaptiveArithmeticCoding(
            aac::Flags::PACK | aac::Flags::RLE | aac::Flags::ORDER,
        ),
    };

    Some(encoder)
}

fn encode_with(
    method: Method,
    compression_level: u8,
    records: Option<&[(usize, bool)]>,
    src: &[u8],
) -> io::Result<Vec<u8>> {
    match method {
        Method::Fqzcomp => {
            let records = records.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "fqzcomp requires record lengths",
                )
            })?;

            codecs::fqzcomp::encode(records, src)
        }
        Method::NameTokenizer => codecs::name_tokenizer::encode(src),
        _ => encoder_for(method, compression_level)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("method {method:?} has no encoder"),
                )
            })?
            .encode(src),
    }
}
