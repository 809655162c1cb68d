use std::io;

/// A block compression method.
///
/// The discriminants are the wire method bytes. Sub-variants of the rANS
/// Nx16 and arithmetic codecs are carried inside the payload head (order and
/// transform bits), not as additional method bytes.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CompressionMethod {
    /// Uncompressed (`0`).
    #[default]
    None,
    /// Gzip (`1`).
    Gzip,
    /// Bzip2 (`2`).
    Bzip2,
    /// LZMA, as an xz container (`3`).
    Lzma,
    /// rANS 4x8 (`4`), CRAM 3.0.
    Rans4x8,
    /// rANS Nx16 (`5`), CRAM 3.1.
    RansNx16,
    /// Adaptive arithmetic coding (`6`), CRAM 3.1.
    AdaptiveArithmeticCoding,
    /// fqzcomp quality scores (`7`), CRAM 3.1.
    Fqzcomp,
    /// Read name tokenizer (`8`), CRAM 3.1.
    NameTokenizer,
    /// libbsc (`9`), reserved.
    Bsc,
    /// Zstandard (`10`), reserved.
    Zstd,
    /// A registered external codec.
    External(u8),
}

impl From<u8> for CompressionMethod {
    fn from(n: u8) -> Self {
        match n {
            0 => Self::None,
            1 => Self::Gzip,
            2 => Self::Bzip2,
            3 => Self::Lzma,
            4 => Self::Rans4x8,
            5 => Self::RansNx16,
            6 => Self::AdaptiveArithmeticCoding,
            7 => Self::Fqzcomp,
            8 => Self::NameTokenizer,
            9 => Self::Bsc,
            10 => Self::Zstd,
            _ => Self::External(n),
        }
    }
}

impl From<CompressionMethod> for u8 {
    fn from(compression_method: CompressionMethod) -> Self {
        match compression_method {
            CompressionMethod::None => 0,
            CompressionMethod::Gzip => 1,
            CompressionMethod::Bzip2 => 2,
            CompressionMethod::Lzma => 3,
            CompressionMethod::Rans4x8 => 4,
            CompressionMethod::RansNx16 => 5,
            CompressionMethod::AdaptiveArithmeticCoding => 6,
            CompressionMethod::Fqzcomp => 7,
            CompressionMethod::NameTokenizer => 8,
            CompressionMethod::Bsc => 9,
            CompressionMethod::Zstd => 10,
            CompressionMethod::External(n) => n,
        }
    }
}

impl CompressionMethod {
    /// Validates that an external method byte does not shadow a built-in one.
    pub(crate) fn validate_external(n: u8) -> io::Result<u8> {
        match Self::from(n) {
            Self::External(n) => Ok(n),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("method byte {n} is reserved"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        for n in 0..=u8::MAX {
            let method = CompressionMethod::from(n);
            assert_eq!(u8::from(method), n);
        }

        assert_eq!(CompressionMethod::from(4), CompressionMethod::Rans4x8);
        assert_eq!(CompressionMethod::from(10), CompressionMethod::Zstd);
        assert_eq!(CompressionMethod::from(42), CompressionMethod::External(42));
    }

    #[test]
    fn test_validate_external() {
        assert!(CompressionMethod::validate_external(0).is_err());
        assert!(CompressionMethod::validate_external(10).is_err());
        assert!(CompressionMethod::validate_external(200).is_ok());
    }
}
