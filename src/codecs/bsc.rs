//! libbsc method stub.
//!
//! The BSC method byte is reserved by the format, but no Rust implementation
//! of libbsc exists. Both directions report the method as unsupported; a
//! build of the original without libbsc linked behaves the same way.

use std::io;

/// Always fails: libbsc is unavailable.
pub fn encode(_compression_level: u32, _src: &[u8]) -> io::Result<Vec<u8>> {
    Err(unsupported())
}

/// Always fails: libbsc is unavailable.
pub fn decode(_src: &[u8], _dst: &mut [u8]) -> io::Result<()> {
    Err(unsupported())
}

fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "bsc is not supported")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported() {
        assert!(matches!(
            encode(5, b"ndls"),
            Err(e) if e.kind() == io::ErrorKind::Unsupported
        ));

        let mut dst = [0; 4];
        assert!(matches!(
            decode(b"ndls", &mut dst),
            Err(e) if e.kind() == io::ErrorKind::Unsupported
        ));
    }
}
