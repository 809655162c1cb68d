//! Block compression codecs.

pub mod aac;
pub mod bsc;
pub mod bzip2;
pub mod fqzcomp;
pub mod gzip;
pub mod lzma;
pub mod name_tokenizer;
pub mod rans_4x8;
pub mod rans_nx16;
pub mod registry;
pub mod zstd;

use std::io;

use crate::container::block::CompressionMethod;

/// A compression method with its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoder {
    /// Gzip at a compression level.
    Gzip(flate2::Compression),
    /// Bzip2 at a compression level.
    Bzip2(::bzip2::Compression),
    /// LZMA (xz container) at a preset level.
    Lzma(u32),
    /// Zstandard at a compression level.
    Zstd(i32),
    /// rANS 4x8 with a context order.
    Rans4x8(rans_4x8::Order),
    /// rANS Nx16 with transform flags.
    RansNx16(rans_nx16::Flags),
    /// Adaptive arithmetic coding with transform flags.
    AdaptiveArithmeticCoding(aac::Flags),
    /// fqzcomp quality codec.
    Fqzcomp,
    /// Read name tokenizer.
    NameTokenizer,
}

impl Encoder {
    /// Returns the wire compression method this encoder produces.
    pub fn compression_method(&self) -> CompressionMethod {
        match self {
            Self::Gzip(_) => CompressionMethod::Gzip,
            Self::Bzip2(_) => CompressionMethod::Bzip2,
            Self::Lzma(_) => CompressionMethod::Lzma,
            Self::Zstd(_) => CompressionMethod::Zstd,
            Self::Rans4x8(_) => CompressionMethod::Rans4x8,
            Self::RansNx16(_) => CompressionMethod::RansNx16,
            Self::AdaptiveArithmeticCoding(_) => CompressionMethod::AdaptiveArithmeticCoding,
            Self::Fqzcomp => CompressionMethod::Fqzcomp,
            Self::NameTokenizer => CompressionMethod::NameTokenizer,
        }
    }

    /// Compresses `src`.
    ///
    /// fqzcomp needs per-record lengths and strand flags; drive it through
    /// [`fqzcomp::encode`] instead.
    pub fn encode(&self, src: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::Gzip(compression_level) => gzip::encode(*compression_level, src),
            Self::Bzip2(compression_level) => bzip2::encode(*compression_level, src),
            Self::Lzma(compression_level) => lzma::encode(*compression_level, src),
            Self::Zstd(compression_level) => zstd::encode(*compression_level, src),
            Self::Rans4x8(order) => rans_4x8::encode(*order, src),
            Self::RansNx16(flags) => rans_nx16::encode(*flags, src),
            Self::AdaptiveArithmeticCoding(flags) => aac::encode(*flags, src),
            Self::NameTokenizer => name_tokenizer::encode(src),
            Self::Fqzcomp => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "fqzcomp requires record lengths; use codecs::fqzcomp::encode",
            )),
        }
    }
}

/// Decompresses a block payload encoded with `method`.
///
/// `uncompressed_size` is the size declared by the block header; codecs
/// whose streams do not embed their own size rely on it.
pub fn decode(
    method: CompressionMethod,
    src: &[u8],
    uncompressed_size: usize,
) -> io::Result<Vec<u8>> {
    match method {
        CompressionMethod::None => Ok(src.to_vec()),
        CompressionMethod::Gzip => {
            let mut dst = vec![0; uncompressed_size];
            gzip::decode(src, &mut dst)?;
            Ok(dst)
        }
        CompressionMethod::Bzip2 => {
            let mut dst = vec![0; uncompressed_size];
            bzip2::decode(src, &mut dst)?;
            Ok(dst)
        }
        CompressionMethod::Lzma => {
            let mut dst = vec![0; uncompressed_size];
            lzma::decode(src, &mut dst)?;
            Ok(dst)
        }
        CompressionMethod::Rans4x8 => rans_4x8::decode(&mut &src[..]),
        CompressionMethod::RansNx16 => rans_nx16::decode(&mut &src[..], uncompressed_size),
        CompressionMethod::AdaptiveArithmeticCoding => {
            aac::decode(&mut &src[..], uncompressed_size)
        }
        CompressionMethod::Fqzcomp => fqzcomp::decode(src),
        CompressionMethod::NameTokenizer => name_tokenizer::decode(src),
        CompressionMethod::Bsc => {
            let mut dst = vec![0; uncompressed_size];
            bsc::decode(src, &mut dst)?;
            Ok(dst)
        }
        CompressionMethod::Zstd => zstd::decode(src),
        CompressionMethod::External(n) => registry::get(n)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("no codec registered for method {n}"),
                )
            })?
            .decompress(src, uncompressed_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_round_trips() -> io::Result<()> {
        let src = b"the quick brown fox jumps over the lazy dog, repeatedly, \
                    the quick brown fox jumps over the lazy dog";

        let encoders = [
            (Encoder::Gzip(flate2::Compression::default()), CompressionMethod::Gzip),
            (
                Encoder::Bzip2(::bzip2::Compression::default()),
                CompressionMethod::Bzip2,
            ),
            (Encoder::Lzma(6), CompressionMethod::Lzma),
            (Encoder::Zstd(7), CompressionMethod::Zstd),
            (
                Encoder::Rans4x8(rans_4x8::Order::One),
                CompressionMethod::Rans4x8,
            ),
            (
                Encoder::RansNx16(rans_nx16::Flags::ORDER),
                CompressionMethod::RansNx16,
            ),
            (
                Encoder::AdaptiveArithmeticCoding(aac::Flags::ORDER),
                CompressionMethod::AdaptiveArithmeticCoding,
            ),
        ];

        for (encoder, method) in encoders {
            assert_eq!(encoder.compression_method(), method);

            let compressed = encoder.encode(src)?;
            let uncompressed = decode(method, &compressed, src.len())?;

            assert_eq!(uncompressed, src, "round trip failed for {encoder:?}");
        }

        Ok(())
    }

    #[test]
    fn test_decode_with_unregistered_external_method() {
        assert!(decode(CompressionMethod::External(0xfe), &[], 0).is_err());
    }
}
