//! Variable-length integer readers.

mod itf8;
mod ltf8;
mod vlq;

use std::{
    io::{self, Read},
    mem,
};

pub use self::{
    itf8::{read_itf8, read_itf8_as},
    ltf8::{read_ltf8, read_ltf8_as},
    vlq::{read_sint7, read_sint7_64, read_uint7, read_uint7_64, read_uint7_as},
};

use crate::file_definition::Version;

/// Reads an unsigned variable-length integer as i32.
///
/// Uses ITF8 for CRAM 2.x/3.x, uint7 for CRAM 4.0. All block header fields
/// (content ID, sizes) go through this.
pub fn read_int<R>(reader: &mut R, version: Version) -> io::Result<i32>
where
    R: Read,
{
    if version.uses_vlq() {
        let n = read_uint7(reader)?;
        i32::try_from(n).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    } else {
        read_itf8(reader)
    }
}

/// Reads an unsigned variable-length integer, converting to type `N`.
pub fn read_int_as<R, N>(reader: &mut R, version: Version) -> io::Result<N>
where
    R: Read,
    N: TryFrom<u32> + TryFrom<i32>,
    <N as TryFrom<u32>>::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    <N as TryFrom<i32>>::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if version.uses_vlq() {
        let n = read_uint7(reader)?;
        N::try_from(n).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    } else {
        let n = read_itf8(reader)?;
        N::try_from(n).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Reads a variable-length long integer, converting to type `N`.
///
/// Uses LTF8 for CRAM 2.x/3.x, uint7_64 for CRAM 4.0.
pub fn read_long_as<R, N>(reader: &mut R, version: Version) -> io::Result<N>
where
    R: Read,
    N: TryFrom<i64, Error = std::num::TryFromIntError>,
{
    if version.uses_vlq() {
        let n = read_uint7_64(reader)?;
        let n = i64::try_from(n).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        n.try_into()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    } else {
        read_ltf8_as(reader)
    }
}

pub(crate) fn read_u8<R>(reader: &mut R) -> io::Result<u8>
where
    R: Read,
{
    let mut buf = [0; mem::size_of::<u8>()];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u16_le<R>(reader: &mut R) -> io::Result<u16>
where
    R: Read,
{
    let mut buf = [0; mem::size_of::<u16>()];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub(crate) fn read_u32_le<R>(reader: &mut R) -> io::Result<u32>
where
    R: Read,
{
    let mut buf = [0; mem::size_of::<u32>()];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
