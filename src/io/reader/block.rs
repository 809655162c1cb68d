use std::io::{self, Read};

use flate2::CrcReader;

use super::num::{read_int, read_int_as, read_u8, read_u32_le};
use crate::{
    container::block::{Block, CompressionMethod, ContentType},
    file_definition::Version,
};

/// Reads a block, including its framing.
///
/// The running CRC is computed over the consumed bytes while reading; for
/// CRAM 3.0+, the stored checksum is kept alongside it on the block and
/// verified on first decompression.
pub fn read_block<R>(reader: &mut R, version: Version) -> io::Result<Block>
where
    R: Read,
{
    let mut crc_reader = CrcReader::new(reader);

    let compression_method = read_u8(&mut crc_reader).map(CompressionMethod::from)?;
    let content_type = read_u8(&mut crc_reader).and_then(ContentType::try_from)?;

    let content_id = read_int(&mut crc_reader, version)?;
    let compressed_size: usize = read_int_as(&mut crc_reader, version)?;
    let uncompressed_size: usize = read_int_as(&mut crc_reader, version)?;

    if compression_method == CompressionMethod::None && compressed_size != uncompressed_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "raw block size mismatch: compressed {compressed_size} != uncompressed {uncompressed_size}"
            ),
        ));
    }

    let mut data = vec![0; compressed_size];
    crc_reader.read_exact(&mut data)?;

    let crc32 = if version.has_crc32() {
        let computed = crc_reader.crc().sum();
        let stored = read_u32_le(crc_reader.get_mut())?;
        Some((stored, computed))
    } else {
        None
    };

    Ok(Block {
        compression_method,
        content_type,
        content_id,
        uncompressed_size,
        data,
        crc32,
    })
}
