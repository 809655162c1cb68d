use std::io;

/// A block content type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    /// The SAM header (`0`).
    FileHeader,
    /// A compression header (`1`).
    CompressionHeader,
    /// A mapped slice header (`2`).
    MappedSliceHeader,
    /// An unmapped slice header (`3`).
    UnmappedSliceHeader,
    /// External data: one column's bytes (`4`).
    ExternalData,
    /// Core data: bit-packed per-record sub-streams (`5`).
    CoreData,
}

impl TryFrom<u8> for ContentType {
    type Error = io::Error;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            0 => Ok(Self::FileHeader),
            1 => Ok(Self::CompressionHeader),
            2 => Ok(Self::MappedSliceHeader),
            3 => Ok(Self::UnmappedSliceHeader),
            4 => Ok(Self::ExternalData),
            5 => Ok(Self::CoreData),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid content type: {n}"),
            )),
        }
    }
}

impl From<ContentType> for u8 {
    fn from(content_type: ContentType) -> Self {
        match content_type {
            ContentType::FileHeader => 0,
            ContentType::CompressionHeader => 1,
            ContentType::MappedSliceHeader => 2,
            ContentType::UnmappedSliceHeader => 3,
            ContentType::ExternalData => 4,
            ContentType::CoreData => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() -> io::Result<()> {
        for n in 0..=5 {
            assert_eq!(u8::from(ContentType::try_from(n)?), n);
        }

        assert!(ContentType::try_from(6).is_err());

        Ok(())
    }
}
