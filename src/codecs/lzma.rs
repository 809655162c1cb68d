//! LZMA (xz container) wrapper.

use std::io::{self, Read, Write};

use lzma_rust2::{XzOptions, XzReader, XzWriter};

/// Compresses `src` as an xz container.
pub fn encode(compression_level: u32, src: &[u8]) -> io::Result<Vec<u8>> {
    let options = XzOptions::with_preset(compression_level);

    let mut writer = XzWriter::new(Vec::new(), options)?;
    writer.write_all(src)?;
    writer.finish()
}

/// Decompresses an xz container into `dst`, which must be sized to the
/// uncompressed length.
pub fn decode(src: &[u8], dst: &mut [u8]) -> io::Result<()> {
    let mut reader = XzReader::new(src, false);
    reader.read_exact(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self() -> io::Result<()> {
        let src = b"noodles-cram";

        let compressed = encode(6, src)?;

        let mut uncompressed = vec![0; src.len()];
        decode(&compressed, &mut uncompressed)?;

        assert_eq!(uncompressed, src);

        Ok(())
    }
}
