use std::{
    io::{self, Write},
    mem,
};

use flate2::CrcWriter;

use super::num::{int_size_of, write_int, write_u8, write_u32_le};
use crate::{container::block::Block, file_definition::Version};

/// Writes a block, including its framing.
///
/// For CRAM 3.0+, the CRC32 over the header and payload bytes is appended.
pub fn write_block<W>(writer: &mut W, block: &Block, version: Version) -> io::Result<()>
where
    W: Write,
{
    if version.has_crc32() {
        let mut crc_writer = CrcWriter::new(writer);
        write_block_body(&mut crc_writer, block, version)?;
        let crc32 = crc_writer.crc().sum();
        write_u32_le(crc_writer.get_mut(), crc32)
    } else {
        write_block_body(writer, block, version)
    }
}

/// Returns the framed size of a block in bytes.
///
/// Container writers use this to compute landmarks.
pub fn block_size_of(block: &Block, version: Version) -> io::Result<usize> {
    let compressed_size = i32::try_from(block.compressed_size())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let uncompressed_size = i32::try_from(block.uncompressed_size())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut size = mem::size_of::<u8>() // method
        + mem::size_of::<u8>() // content type
        + int_size_of(version, block.content_id())
        + int_size_of(version, compressed_size)
        + int_size_of(version, uncompressed_size)
        + block.compressed_size();

    if version.has_crc32() {
        size += mem::size_of::<u32>();
    }

    Ok(size)
}

fn write_block_body<W>(writer: &mut W, block: &Block, version: Version) -> io::Result<()>
where
    W: Write,
{
    write_u8(writer, u8::from(block.compression_method()))?;
    write_u8(writer, u8::from(block.content_type()))?;

    write_int(writer, version, block.content_id())?;

    write_size(writer, block.compressed_size(), version)?;
    write_size(writer, block.uncompressed_size(), version)?;

    writer.write_all(block.data())?;

    Ok(())
}

fn write_size<W>(writer: &mut W, size: usize, version: Version) -> io::Result<()>
where
    W: Write,
{
    let n = i32::try_from(size).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_int(writer, version, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::block::ContentType;

    fn build_block() -> Block {
        let mut block = Block::new(ContentType::ExternalData, 1);
        block.append(b"ndls");
        block
    }

    #[test]
    fn test_write_block() -> io::Result<()> {
        let block = build_block();

        let mut buf = Vec::new();
        write_block(&mut buf, &block, Version::default())?;

        let expected = [
            0x00, // compression method = none
            0x04, // content type = external data
            0x01, // content ID = 1
            0x04, // compressed size = 4
            0x04, // uncompressed size = 4
            b'n', b'd', b'l', b's', // data
            0xd7, 0x12, 0x46, 0x3e, // CRC32 = 3e4612d7
        ];

        assert_eq!(buf, expected);
        assert_eq!(buf.len(), block_size_of(&block, Version::default())?);

        Ok(())
    }

    #[test]
    fn test_write_block_without_crc32() -> io::Result<()> {
        let block = build_block();

        let mut buf = Vec::new();
        write_block(&mut buf, &block, Version::V2_1)?;

        assert_eq!(buf.len(), 9);
        assert_eq!(buf.len(), block_size_of(&block, Version::V2_1)?);

        Ok(())
    }

    #[test]
    fn test_block_round_trip_is_stable() -> io::Result<()> {
        use crate::io::reader::read_block;

        let block = build_block();

        let mut buf = Vec::new();
        write_block(&mut buf, &block, Version::default())?;

        let decoded = read_block(&mut &buf[..], Version::default())?;

        let mut buf2 = Vec::new();
        write_block(&mut buf2, &decoded, Version::default())?;

        assert_eq!(buf, buf2);

        Ok(())
    }
}
