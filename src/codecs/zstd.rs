//! Zstandard wrapper.

use std::io;

/// Compresses `src` as a zstd frame.
pub fn encode(compression_level: i32, src: &[u8]) -> io::Result<Vec<u8>> {
    zstd::stream::encode_all(src, compression_level)
}

/// Decompresses a zstd frame.
pub fn decode(src: &[u8]) -> io::Result<Vec<u8>> {
    zstd::stream::decode_all(src)
}

/// Maps the CRAM 0-9 compression level onto a zstd level.
pub(crate) fn compression_level_from(level: u8) -> i32 {
    const LEVELS: [i32; 10] = [1, 1, 5, 6, 7, 7, 9, 13, 16, 19];

    LEVELS[usize::from(level.min(9))]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self() -> io::Result<()> {
        let src = b"noodles-cram";

        let compressed = encode(compression_level_from(5), src)?;
        let uncompressed = decode(&compressed)?;

        assert_eq!(uncompressed, src);

        Ok(())
    }

    #[test]
    fn test_compression_level_from() {
        assert_eq!(compression_level_from(1), 1);
        assert_eq!(compression_level_from(5), 7);
        assert_eq!(compression_level_from(9), 19);
        assert_eq!(compression_level_from(200), 19);
    }
}
