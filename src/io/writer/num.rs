//! Variable-length integer writers.

mod itf8;
mod ltf8;
mod vlq;

use std::io::{self, Write};

pub use self::{
    itf8::{itf8_size_of, write_itf8},
    ltf8::write_ltf8,
    vlq::{uint7_size_of, write_sint7, write_sint7_64, write_uint7, write_uint7_64},
};

use crate::file_definition::Version;

/// Writes an unsigned variable-length integer (as i32).
///
/// Uses ITF8 for CRAM 2.x/3.x, uint7 for CRAM 4.0.
pub fn write_int<W>(writer: &mut W, version: Version, value: i32) -> io::Result<()>
where
    W: Write,
{
    if version.uses_vlq() {
        let n = u32::try_from(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        write_uint7(writer, n)
    } else {
        write_itf8(writer, value)
    }
}

/// Writes a variable-length long integer.
///
/// Uses LTF8 for CRAM 2.x/3.x, uint7_64 for CRAM 4.0.
pub fn write_long<W>(writer: &mut W, version: Version, value: i64) -> io::Result<()>
where
    W: Write,
{
    if version.uses_vlq() {
        let n = u64::try_from(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        write_uint7_64(writer, n)
    } else {
        write_ltf8(writer, value)
    }
}

/// Returns the encoded size of a variable-length integer for the given version.
///
/// Paired with `write_int` for sizing block header fields (`content_id`,
/// `compressed_size`, `uncompressed_size`), which are always non-negative.
pub fn int_size_of(version: Version, n: i32) -> usize {
    if version.uses_vlq() {
        uint7_size_of(n as u32)
    } else {
        itf8_size_of(n)
    }
}

pub(crate) fn write_u8<W>(writer: &mut W, n: u8) -> io::Result<()>
where
    W: Write,
{
    writer.write_all(&[n])
}

pub(crate) fn write_u16_le<W>(writer: &mut W, n: u16) -> io::Result<()>
where
    W: Write,
{
    writer.write_all(&n.to_le_bytes())
}

pub(crate) fn write_u32_le<W>(writer: &mut W, n: u32) -> io::Result<()>
where
    W: Write,
{
    writer.write_all(&n.to_le_bytes())
}
