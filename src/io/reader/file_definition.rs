use std::io::{self, Read};

use crate::file_definition::{FileDefinition, MAGIC_NUMBER, Version};

/// Reads the 26-byte CRAM file definition.
///
/// Fails if the magic number is wrong or the version is unsupported.
pub fn read_file_definition<R>(reader: &mut R) -> io::Result<FileDefinition>
where
    R: Read,
{
    let mut magic = [0; 4];
    reader.read_exact(&mut magic)?;

    if magic != MAGIC_NUMBER {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid CRAM magic number",
        ));
    }

    let mut version_buf = [0; 2];
    reader.read_exact(&mut version_buf)?;
    let version = Version::new(version_buf[0], version_buf[1]);
    version.validate()?;

    let mut file_id = [0; 20];
    reader.read_exact(&mut file_id)?;

    Ok(FileDefinition::new(version, file_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_file_definition() -> io::Result<()> {
        let mut src = Vec::new();
        src.extend_from_slice(b"CRAM");
        src.extend_from_slice(&[3, 0]);
        src.extend_from_slice(&[0x42; 20]);

        let file_definition = read_file_definition(&mut &src[..])?;

        assert_eq!(file_definition.version(), Version::new(3, 0));
        assert_eq!(file_definition.file_id(), &[0x42; 20]);

        Ok(())
    }

    #[test]
    fn test_read_file_definition_with_invalid_magic_number() {
        let src = b"BAM\x01\x03\x00";
        assert!(read_file_definition(&mut &src[..]).is_err());
    }

    #[test]
    fn test_read_file_definition_with_unsupported_version() {
        let mut src = Vec::new();
        src.extend_from_slice(b"CRAM");
        src.extend_from_slice(&[1, 0]);
        src.extend_from_slice(&[0x00; 20]);

        assert!(read_file_definition(&mut &src[..]).is_err());
    }
}
