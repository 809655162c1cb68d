//! Bzip2 wrapper.

use std::io::{self, Read, Write};

use bzip2::{Compression, read::BzDecoder, write::BzEncoder};

/// Compresses `src` as a bzip2 stream.
pub fn encode(compression_level: Compression, src: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::new(), compression_level);
    encoder.write_all(src)?;
    encoder.finish()
}

/// Decompresses a bzip2 stream into `dst`, which must be sized to the
/// uncompressed length.
pub fn decode(src: &[u8], dst: &mut [u8]) -> io::Result<()> {
    let mut decoder = BzDecoder::new(src);
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
}
