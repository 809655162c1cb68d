//! Gzip wrapper.

use std::io::{self, Read, Write};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};

/// Compresses `src` as a gzip stream.
pub fn encode(compression_level: Compression, src: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), compression_level);
    encoder.write_all(src)?;
    encoder.finish()
}

/// Decompresses a gzip stream into `dst`, which must be sized to the
/// uncompressed length.
pub fn decode(src: &[u8], dst: &mut [u8]) -> io::Result<()> {
    let mut decoder = GzDecoder::new(src);
    decoder.read_exact(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self() -> io::Result<()> {
        let src = b"noodles-cram";

        let compressed = encode(Compression::default(), src)?;

        let mut uncompressed = vec![0; src.len()];
        decode(&compressed, &mut uncompressed)?;

        assert_eq!(uncompressed, src);

        Ok(())
    }

    #[test]
    fn test_self_level_1() -> io::Result<()> {
        let src = vec![0x55; 8192];

        let compressed = encode(Compression::new(1), &src)?;
        assert!(compressed.len() < src.len());

        let mut uncompressed = vec![0; src.len()];
        decode(&compressed, &mut uncompressed)?;

        assert_eq!(uncompressed, src);

        Ok(())
    }
}
