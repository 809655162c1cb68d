use std::io::{self, Write};

use crate::file_definition::{FileDefinition, MAGIC_NUMBER};

/// Writes the 26-byte CRAM file definition.
pub fn write_file_definition<W>(
    writer: &mut W,
    file_definition: &FileDefinition,
) -> io::Result<()>
where
    W: Write,
{
    writer.write_all(&MAGIC_NUMBER)?;

    let version = file_definition.version();
    writer.write_all(&[version.major(), version.minor()])?;

    writer.write_all(file_definition.file_id())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_definition::Version;

    #[test]
    fn test_write_file_definition() -> io::Result<()> {
        let file_definition = FileDefinition::new(Version::new(3, 1), [0x05; 20]);

        let mut buf = Vec::new();
        write_file_definition(&mut buf, &file_definition)?;

        assert_eq!(buf.len(), 26);
        assert_eq!(&buf[0..4], b"CRAM");
        assert_eq!(&buf[4..6], &[3, 1]);
        assert_eq!(&buf[6..], &[0x05; 20]);

        Ok(())
    }

    #[test]
    fn test_file_definition_round_trip() -> io::Result<()> {
        use crate::io::reader::read_file_definition;

        let file_definition = FileDefinition::new(Version::new(3, 0), *b"alignments.sorted.cr");

        let mut buf = Vec::new();
        write_file_definition(&mut buf, &file_definition)?;

        assert_eq!(read_file_definition(&mut &buf[..])?, file_definition);

        Ok(())
    }
}
