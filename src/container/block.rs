//! The block: the atomic compressed unit of a CRAM container.

pub mod compression_method;
pub mod content_type;

pub use self::{compression_method::CompressionMethod, content_type::ContentType};

use std::io;

use crate::codecs;

/// A block content ID.
///
/// Names the column a block holds: a data series ID or an aux tag triplet
/// hash. Core and header blocks use 0.
pub type ContentId = i32;

/// A CRAM block.
///
/// `data` holds the compressed payload when the compression method is not
/// `None`, otherwise the uncompressed bytes. [`Block::uncompress`] converts a
/// compressed block to an uncompressed one in place.
pub struct Block {
    pub(crate) compression_method: CompressionMethod,
    pub(crate) content_type: ContentType,
    pub(crate) content_id: ContentId,
    pub(crate) uncompressed_size: usize,
    pub(crate) data: Vec<u8>,
    // (stored, computed) framing CRC pair; cleared after the first check.
    pub(crate) crc32: Option<(u32, u32)>,
}

impl Block {
    /// Creates an empty uncompressed block.
    pub fn new(content_type: ContentType, content_id: ContentId) -> Self {
        Self {
            compression_method: CompressionMethod::None,
            content_type,
            content_id,
            uncompressed_size: 0,
            data: Vec::new(),
            crc32: None,
        }
    }

    /// Returns the compression method in effect.
    pub fn compression_method(&self) -> CompressionMethod {
        self.compression_method
    }

    /// Returns the content type.
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Returns the content ID.
    pub fn content_id(&self) -> ContentId {
        self.content_id
    }

    /// Returns the uncompressed size in bytes.
    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_size
    }

    /// Returns the size of the payload as stored.
    ///
    /// This equals the uncompressed size for uncompressed blocks.
    pub fn compressed_size(&self) -> usize {
        self.data.len()
    }

    /// Returns the payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Appends bytes to an uncompressed block.
    ///
    /// The record encoder builds per-column blocks through this.
    ///
    /// # Panics
    ///
    /// Panics if the block is compressed.
    pub fn append(&mut self, src: &[u8]) {
        assert_eq!(self.compression_method, CompressionMethod::None);
        self.data.extend_from_slice(src);
        self.uncompressed_size = self.data.len();
    }

    /// Discards the stored framing checksum so it is never verified.
    pub fn ignore_crc32(&mut self) {
        self.crc32 = None;
    }

    /// Decompresses the block in place.
    ///
    /// The payload is replaced by its uncompressed form and the compression
    /// method set to `None`. The framing CRC, if still pending, is verified
    /// first; the check runs at most once per block.
    pub fn uncompress(&mut self) -> io::Result<()> {
        if self.compression_method == CompressionMethod::None {
            return Ok(());
        }

        if let Some((stored, computed)) = self.crc32.take()
            && stored != computed
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("block CRC32 mismatch: expected {stored:08x}, got {computed:08x}"),
            ));
        }

        let buf = codecs::decode(self.compression_method, &self.data, self.uncompressed_size)?;

        if buf.len() != self.uncompressed_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "block size mismatch: expected {} bytes, got {}",
                    self.uncompressed_size,
                    buf.len()
                ),
            ));
        }

        self.data = buf;
        self.compression_method = CompressionMethod::None;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let block = Block::new(ContentType::ExternalData, 5);
        assert_eq!(block.compression_method(), CompressionMethod::None);
        assert_eq!(block.content_id(), 5);
        assert_eq!(block.uncompressed_size(), 0);
        assert!(block.data().is_empty());
    }

    #[test]
    fn test_append() {
        let mut block = Block::new(ContentType::ExternalData, 0);
        block.append(b"nd");
        block.append(b"ls");
        assert_eq!(block.data(), b"ndls");
        assert_eq!(block.uncompressed_size(), 4);
    }

    #[test]
    fn test_uncompress_with_crc32_mismatch() {
        let mut block = Block::new(ContentType::ExternalData, 0);
        block.compression_method = CompressionMethod::Gzip;
        block.data = vec![0x00];
        block.uncompressed_size = 1;
        block.crc32 = Some((0xdeadbeef, 0x0badf00d));

        assert!(block.uncompress().is_err());
    }

    #[test]
    fn test_uncompress_with_ignored_crc32() -> io::Result<()> {
        let src = b"quality scores";
        let data = crate::codecs::gzip::encode(flate2::Compression::default(), src)?;

        let mut block = Block::new(ContentType::ExternalData, 0);
        block.compression_method = CompressionMethod::Gzip;
        block.uncompressed_size = src.len();
        block.data = data;
        block.crc32 = Some((0xdeadbeef, 0x0badf00d));

        block.ignore_crc32();
        block.uncompress()?;

        assert_eq!(block.compression_method(), CompressionMethod::None);
        assert_eq!(block.data(), src);

        Ok(())
    }
}
