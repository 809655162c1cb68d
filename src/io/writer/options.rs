use crate::{
    file_definition::Version,
    metrics::{Method, MethodSet},
};

const DEFAULT_COMPRESSION_LEVEL: u8 = 5;

/// Quality score binning applied by the record encoder before data reaches
/// the block layer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Binning {
    /// Qualities pass through unchanged.
    #[default]
    None,
    /// Qualities collapse onto the Illumina 8-level bin table.
    Illumina,
}

/// Writer options controlling block compression.
///
/// The codec flags compose into the candidate [`MethodSet`] handed to the
/// block driver; methods a file version cannot carry are excluded even when
/// their flag is set.
#[derive(Clone, Debug)]
pub struct Options {
    pub version: Version,
    /// Compression level, 0-9. 0 stores everything raw.
    pub compression_level: u8,
    pub use_bzip2: bool,
    pub use_lzma: bool,
    /// rANS 4x8, on by default for CRAM 3.0+.
    pub use_rans_4x8: bool,
    pub use_rans_nx16: bool,
    pub use_adaptive_arithmetic_coding: bool,
    pub use_fqzcomp: bool,
    pub use_name_tokenizer: bool,
    pub use_zstd: bool,
    pub use_bsc: bool,
    pub binning: Binning,
    /// Skips block CRC32 verification on read.
    pub ignore_crc32: bool,
}

impl Options {
    /// Composes the candidate method set for the block driver.
    pub fn method_set(&self) -> MethodSet {
        let mut set = MethodSet::empty();

        set.insert(Method::Raw);
        set.insert(Method::Gzip);
        set.insert(Method::Gzip1);

        if self.use_bzip2 {
            set.insert(Method::Bzip2);
        }

        if self.use_lzma {
            set.insert(Method::Lzma);
        }

        if self.use_rans_4x8 && self.version.has_rans_4x8() {
            set.insert(Method::Rans4x8O0);
            set.insert(Method::Rans4x8O1);
        }

        if self.version.has_cram_3_1_codecs() {
            if self.use_rans_nx16 {
                set.insert(Method::RansNx16O0);
                set.insert(Method::RansNx16O1);
                set.insert(Method::RansNx16Rle0);
                set.insert(Method::RansNx16Rle1);
                set.insert(Method::RansNx16Pack0);
                set.insert(Method::RansNx16Pack1);
                set.insert(Method::RansNx16PackRle0);
                set.insert(Method::RansNx16PackRle1);
            }

            if self.use_adaptive_arithmetic_coding {
                set.insert(Method::ArithO0);
                set.insert(Method::ArithO1);
                set.insert(Method::ArithRle0);
                set.insert(Method::ArithRle1);
                set.insert(Method::ArithPack0);
                set.insert(Method::ArithPack1);
                set.insert(Method::ArithPackRle0);
                set.insert(Method::ArithPackRle1);
            }

            if self.use_fqzcomp {
                set.insert(Method::Fqzcomp);
            }

            if self.use_name_tokenizer {
                set.insert(Method::NameTokenizer);
            }
        }

        if self.use_zstd {
            set.insert(Method::Zstd);
            set.insert(Method::Zstd1);
        }

        if self.use_bsc {
            set.insert(Method::Bsc);
        }

        set
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            version: Version::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            use_bzip2: false,
            use_lzma: false,
            use_rans_4x8: true,
            use_rans_nx16: false,
            use_adaptive_arithmetic_coding: false,
            use_fqzcomp: false,
            use_name_tokenizer: false,
            use_zstd: false,
            use_bsc: false,
            binning: Binning::default(),
            ignore_crc32: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_method_set() {
        let options = Options::default();
        let set = options.method_set();

        assert!(set.contains(Method::Raw));
        assert!(set.contains(Method::Gzip));
        assert!(set.contains(Method::Rans4x8O0));
        assert!(!set.contains(Method::RansNx16O0));
        assert!(!set.contains(Method::Bzip2));
    }

    #[test]
    fn test_cram_3_1_codecs_require_version_3_1() {
        let options = Options {
            use_rans_nx16: true,
            use_fqzcomp: true,
            ..Default::default()
        };

        // version 3.0: flags are set but the codecs are unavailable
        assert!(!options.method_set().contains(Method::RansNx16O0));
        assert!(!options.method_set().contains(Method::Fqzcomp));

        let options = Options {
            version: Version::V3_1,
            ..options
        };

        assert!(options.method_set().contains(Method::RansNx16O0));
        assert!(options.method_set().contains(Method::Fqzcomp));
    }

    #[test]
    fn test_rans_4x8_requires_version_3_0() {
        let options = Options {
            version: Version::V2_1,
            ..Default::default()
        };

        assert!(!options.method_set().contains(Method::Rans4x8O0));
    }
}
