//! Cross-codec round-trip laws over representative column payloads.

use std::io;

use cram_codecs::codecs::{self, Encoder, aac, rans_4x8, rans_nx16};
use cram_codecs::container::block::CompressionMethod;

fn payloads() -> Vec<Vec<u8>> {
    vec![
        Vec::new(),
        vec![b'A'; 20],
        b"ACGTACGTACGTACGT"
            .iter()
            .copied()
            .cycle()
            .take(1024)
            .collect(),
        // two-level quality run
        [vec![b'I'; 100], vec![b'!'; 100]].concat(),
        // pseudo-random bytes, fixed seed
        {
            let mut x = 0x2545f491u32;
            (0..65536)
                .map(|_| {
                    x ^= x << 13;
                    x ^= x >> 17;
                    x ^= x << 5;
                    (x >> 24) as u8
                })
                .collect()
        },
    ]
}

fn encoders_for_level(level: u8) -> Vec<Encoder> {
    vec![
        Encoder::Gzip(flate2::Compression::new(u32::from(level.min(9)))),
        Encoder::Bzip2(bzip2::Compression::new(u32::from(level.clamp(1, 9)))),
        Encoder::Lzma(u32::from(level.min(9))),
        Encoder::Zstd(i32::from(level.clamp(1, 19))),
        Encoder::Rans4x8(rans_4x8::Order::Zero),
        Encoder::Rans4x8(rans_4x8::Order::One),
        Encoder::RansNx16(rans_nx16::Flags::empty()),
        Encoder::RansNx16(rans_nx16::Flags::ORDER),
        Encoder::RansNx16(rans_nx16::Flags::PACK),
        Encoder::RansNx16(rans_nx16::Flags::RLE),
        Encoder::RansNx16(rans_nx16::Flags::ORDER | rans_nx16::Flags::PACK | rans_nx16::Flags::RLE),
        Encoder::AdaptiveArithmeticCoding(aac::Flags::empty()),
        Encoder::AdaptiveArithmeticCoding(aac::Flags::ORDER),
        Encoder::AdaptiveArithmeticCoding(aac::Flags::PACK | aac::Flags::RLE),
        Encoder::AdaptiveArithmeticCoding(aac::Flags::EXT),
    ]
}

#[test]
fn test_every_codec_round_trips_every_payload() -> io::Result<()> {
    for level in [0u8, 1, 5, 9] {
        for encoder in encoders_for_level(level) {
            for payload in payloads() {
                let compressed = encoder.encode(&payload)?;

                let uncompressed =
                    codecs::decode(encoder.compression_method(), &compressed, payload.len())?;

                assert_eq!(
                    uncompressed,
                    payload,
                    "round trip failed: {encoder:?}, level {level}, {} bytes",
                    payload.len()
                );
            }
        }
    }

    Ok(())
}

#[test]
fn test_homopolymer_block_round_trips() -> io::Result<()> {
    // 20 x 'A' must survive every family, whatever transform wins
    let src = vec![b'A'; 20];

    for encoder in encoders_for_level(5) {
        let compressed = encoder.encode(&src)?;
        let uncompressed = codecs::decode(encoder.compression_method(), &compressed, src.len())?;
        assert_eq!(uncompressed, src, "failed for {encoder:?}");
    }

    Ok(())
}

#[test]
fn test_two_bit_alphabet_packs_smaller_than_input() -> io::Result<()> {
    let src: Vec<u8> = b"ACGTACGTACGTACGT"
        .iter()
        .copied()
        .cycle()
        .take(1024)
        .collect();

    let compressed = rans_nx16::encode(rans_nx16::Flags::PACK, &src)?;
    assert!(compressed.len() < src.len());

    let uncompressed = rans_nx16::decode(&mut &compressed[..], src.len())?;
    assert_eq!(uncompressed, src);

    Ok(())
}

#[test]
fn test_quality_run_through_fqzcomp() -> io::Result<()> {
    // 100 x 'I' then 100 x '!', two records
    let src = [vec![b'I'; 100], vec![b'!'; 100]].concat();
    let records = [(100, false), (100, false)];

    let compressed = codecs::fqzcomp::encode(&records, &src)?;
    let uncompressed = codecs::fqzcomp::decode(&compressed)?;

    assert_eq!(uncompressed, src);
    assert_eq!(uncompressed.len(), 200);

    Ok(())
}

#[test]
fn test_read_name_batch_through_tokenizer() -> io::Result<()> {
    let src: Vec<u8> = (0..1000)
        .flat_map(|_| b"r0001\x00r0002\x00r0003\x00".to_vec())
        .collect();

    let compressed = codecs::name_tokenizer::encode(&src)?;
    assert!(compressed.len() < src.len());

    let uncompressed = codecs::name_tokenizer::decode(&compressed)?;
    assert_eq!(uncompressed, src);

    Ok(())
}

#[test]
fn test_random_block_through_rans_and_zstd() -> io::Result<()> {
    let mut x = 0x9e3779b9u32;
    let src: Vec<u8> = (0..65536)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 16) as u8
        })
        .collect();

    let compressed = rans_4x8::encode(rans_4x8::Order::Zero, &src)?;
    let uncompressed = rans_4x8::decode(&mut &compressed[..])?;
    assert_eq!(uncompressed, src);

    let compressed = codecs::zstd::encode(7, &src)?;
    let uncompressed = codecs::zstd::decode(&compressed)?;
    assert_eq!(uncompressed, src);

    Ok(())
}

#[test]
fn test_stripe_bit_cleared_for_unaligned_input() -> io::Result<()> {
    // 21 bytes: not a multiple of 4, so the stripe transform must clear
    let src = b"ACGTACGTACGTACGTACGTA";

    let compressed = rans_nx16::encode(rans_nx16::Flags::STRIPE, src)?;
    assert_eq!(compressed[0] & 0x08, 0);

    let uncompressed = rans_nx16::decode(&mut &compressed[..], src.len())?;
    assert_eq!(uncompressed, src);

    Ok(())
}

#[test]
fn test_bsc_is_rejected() {
    let result = codecs::decode(CompressionMethod::Bsc, &[0x00], 1);
    assert!(matches!(result, Err(e) if e.kind() == io::ErrorKind::Unsupported));
}
